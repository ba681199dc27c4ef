//! Entrant gateway service.
//!
//! Keeps an Assetto Corsa Server Manager championship roster in line with
//! the paid tickets of one event on the ticketing platform. The binary wires
//! the library crates together; this crate only adds configuration loading.

pub mod config;

pub use config::{Config, ConfigError};
