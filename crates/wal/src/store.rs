// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory of WAL segments

use crate::error::WalError;
use crate::segment::SegmentId;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// The directory holding every segment file
///
/// Files whose names are not segment names (lock files, editor droppings)
/// are ignored by every operation.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    dir: PathBuf,
}

impl SegmentStore {
    /// Open a store at the given directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, WalError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: SegmentId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    pub fn exists(&self, id: SegmentId) -> bool {
        self.path(id).is_file()
    }

    /// All segments present on disk, ascending by index
    pub fn list(&self) -> Result<Vec<SegmentId>, WalError> {
        let mut segments = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(SegmentId::parse) {
                Some(id) => segments.push(id),
                None => tracing::trace!(name = ?name, "ignoring non-segment file"),
            }
        }
        segments.sort_unstable();
        Ok(segments)
    }

    /// Segments with an index strictly greater than `after`, ascending
    pub fn list_after(&self, after: SegmentId) -> Result<Vec<SegmentId>, WalError> {
        Ok(self.list()?.into_iter().filter(|id| *id > after).collect())
    }

    /// Segments with an index strictly less than `before`, ascending
    pub fn list_before(&self, before: SegmentId) -> Result<Vec<SegmentId>, WalError> {
        Ok(self.list()?.into_iter().filter(|id| *id < before).collect())
    }

    /// Highest segment index present on disk
    pub fn max_segment(&self) -> Result<Option<SegmentId>, WalError> {
        Ok(self.list()?.last().copied())
    }

    /// Index for the next segment: one past the highest present, never a reused one
    pub fn next_segment(&self) -> Result<SegmentId, WalError> {
        Ok(self
            .max_segment()?
            .map(SegmentId::next)
            .unwrap_or_default())
    }

    /// Create a new, empty segment file. Fails if the segment already exists.
    ///
    /// The directory is synced before returning, so the new name survives a
    /// power loss along with any rows later synced into the file.
    pub fn create(&self, id: SegmentId) -> Result<File, WalError> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(self.path(id))?;
        self.sync_dir()?;
        Ok(file)
    }

    /// fsync the directory so created and removed names are durable
    pub fn sync_dir(&self) -> Result<(), WalError> {
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    /// Delete a segment file
    pub fn delete(&self, id: SegmentId) -> Result<(), WalError> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(WalError::SegmentNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
