//! Championship file as a [`RosterStore`].
//!
//! The championship manager owns the file and may rewrite it at any time, so
//! every commit is guarded by the file's modification time:
//!
//! 1. re-read the file and compare its mtime with the loaded revision
//! 2. write the new document to a temporary sibling file
//! 3. check the mtime again
//! 4. optionally copy the previous file to `<file>.backup_<unix-millis>`,
//!    suffixed with a counter if that name is taken
//! 5. rename the temporary file over the original
//!
//! The rename is the only step that changes what readers see, so a pass
//! abandoned at any earlier point leaves the original untouched.

use crate::championship::Championship;
use entrant_gateway_core::{Roster, RosterError, RosterRevision, RosterSnapshot, RosterStore};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Championship JSON file on disk.
#[derive(Debug, Clone)]
pub struct ChampionshipFile {
    path: PathBuf,
    keep_backup: bool,
}

impl ChampionshipFile {
    /// Use the championship file at `path`. Backups are kept by default.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            keep_backup: true,
        }
    }

    /// Whether to keep a copy of the previous file on every commit.
    #[must_use]
    pub const fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    /// Path of the championship file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn modified(&self) -> Result<SystemTime, RosterError> {
        tokio::fs::metadata(&self.path)
            .await
            .and_then(|metadata| metadata.modified())
            .map_err(|e| io_error("failed to stat championship file", &e))
    }

    /// Read and parse the file, failing if it changes while being read.
    async fn read(&self) -> Result<(Championship, SystemTime), RosterError> {
        let modified = self.modified().await?;
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| io_error("failed to read championship file", &e))?;
        let championship = Championship::parse(&text)?;

        if self.modified().await? != modified {
            warn!(path = %self.path.display(), "Championship file modified while reading");
            return Err(RosterError::ConcurrentModification);
        }
        Ok((championship, modified))
    }

    async fn ensure_unmodified(&self, expected: SystemTime, stage: &str) -> Result<(), RosterError> {
        if self.modified().await? == expected {
            Ok(())
        } else {
            warn!(path = %self.path.display(), stage, "Championship file modified by another writer");
            Err(RosterError::ConcurrentModification)
        }
    }

    /// First unused backup name for a file last modified at `modified`.
    async fn backup_path(&self, modified: SystemTime) -> Result<PathBuf, RosterError> {
        let millis = modified.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
        let stem = format!(".backup_{millis}");
        let mut candidate = sibling(&self.path, &stem);
        let mut counter = 1_u32;
        while tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| io_error("failed to check for existing backup", &e))?
        {
            candidate = sibling(&self.path, &format!("{stem}_{counter}"));
            counter += 1;
        }
        Ok(candidate)
    }
}

impl RosterStore for ChampionshipFile {
    async fn load(&self) -> Result<RosterSnapshot, RosterError> {
        let (championship, modified) = self.read().await?;
        Ok(RosterSnapshot {
            roster: championship.roster()?,
            revision: revision_of(modified),
        })
    }

    async fn commit(&self, base: RosterRevision, roster: &Roster) -> Result<RosterRevision, RosterError> {
        let (mut championship, modified) = self.read().await?;
        if revision_of(modified) != base {
            warn!(path = %self.path.display(), "Championship file changed since it was loaded");
            return Err(RosterError::ConcurrentModification);
        }

        let rewritten = championship.apply(roster)?;
        let staged = StagedWrite::create(&self.path, championship.to_json()?.as_bytes()).await?;
        debug!(temp = %staged.temp_path().display(), rewritten, "Staged championship file");

        self.ensure_unmodified(modified, "staging").await?;

        let backup = if self.keep_backup {
            let backup = self.backup_path(modified).await?;
            tokio::fs::copy(&self.path, &backup)
                .await
                .map_err(|e| io_error("failed to back up championship file", &e))?;
            Some(backup)
        } else {
            None
        };

        self.ensure_unmodified(modified, "backup").await?;
        staged.persist(&self.path).await?;

        let revision = revision_of(self.modified().await?);
        info!(
            path = %self.path.display(),
            backup = ?backup.as_deref().map(Path::display),
            rewritten,
            "Championship file updated"
        );
        Ok(revision)
    }
}

/// A temporary file holding the next version of a target file.
///
/// Dropping it without [`persist`](Self::persist) removes the temporary file.
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    persisted: bool,
}

impl StagedWrite {
    /// Write `contents` to a fresh temporary sibling of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Io`] if the temporary file cannot be written.
    pub async fn create(target: &Path, contents: &[u8]) -> Result<Self, RosterError> {
        let staged = Self {
            temp_path: sibling(target, &format!(".{}.tmp", Uuid::new_v4().simple())),
            persisted: false,
        };
        tokio::fs::write(&staged.temp_path, contents)
            .await
            .map_err(|e| io_error("failed to write temporary championship file", &e))?;
        Ok(staged)
    }

    /// Path of the temporary file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Move the temporary file over `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Io`] if the rename fails. The temporary file is
    /// removed in that case.
    pub async fn persist(mut self, target: &Path) -> Result<(), RosterError> {
        tokio::fs::rename(&self.temp_path, target)
            .await
            .map_err(|e| io_error("failed to replace championship file", &e))?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.persisted {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                warn!(temp = %self.temp_path.display(), error = %e, "Failed to remove temporary file");
            }
        }
    }
}

/// Revision token for a modification time.
fn revision_of(modified: SystemTime) -> RosterRevision {
    RosterRevision(modified.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos()))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn io_error(context: &str, error: &std::io::Error) -> RosterError {
    RosterError::Io(format!("{context}: {error}"))
}
