//! # Entrant Gateway ACSM
//!
//! [`RosterStore`](entrant_gateway_core::RosterStore) backed by a
//! championship JSON file of the championship manager.
//!
//! - [`Championship`]: the document and its roster view
//! - [`ChampionshipFile`]: guarded, atomic load and commit
//!
//! ```rust,ignore
//! use entrant_gateway_acsm::ChampionshipFile;
//!
//! let store = ChampionshipFile::new("/srv/acsm/championships/winter.json").with_backup(true);
//! let snapshot = store.load().await?;
//! ```

pub mod championship;
pub mod store;

pub use championship::{Championship, TICKET_FIELD};
pub use store::{ChampionshipFile, StagedWrite};
