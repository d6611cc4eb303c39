//! Offset index: dense run of 12-byte entries `[u32 BE rel offset][u64 BE position]`.
//!
//! The file is grown to its full capacity (`max_index_bytes`) and mapped on
//! open so reads and writes are plain memory accesses. `size` tracks the bytes
//! actually written; on close the file is cut back to exactly `size`.

use crate::config::Config;
use crate::consts::{ENT_WIDTH, OFF_WIDTH};
use crate::errors::{Result, SegError};
use crate::utils::nearest_multiple;
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct Index {
    path: PathBuf,
    file: File,
    mmap: Option<MmapMut>,
    size: u64,
}

impl Index {
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let on_disk = file.metadata()?.len();
        let size = nearest_multiple(on_disk, ENT_WIDTH as u64);
        if size != on_disk {
            warn!(path = %path.display(), on_disk, size, "dropping partial index entry");
        }

        let mut capacity = config.segment.max_index_bytes;
        if capacity < ENT_WIDTH as u64 {
            return Err(SegError::InvalidConfig(format!(
                "max_index_bytes {capacity} is smaller than one entry"
            )));
        }
        if size > capacity {
            // Limit lowered since the file was written; keep every entry.
            warn!(path = %path.display(), size, capacity, "index larger than configured capacity");
            capacity = size;
        }

        file.set_len(capacity)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            path,
            file,
            mmap: Some(mmap),
            size,
        })
    }

    /// Append `(off, pos)`. A full region yields `SegError::Eof`.
    pub fn write(&mut self, off: u32, pos: u64) -> Result<()> {
        let mmap = self.mmap.as_mut().ok_or(SegError::Eof)?;
        let start = self.size as usize;
        let end = start + ENT_WIDTH;
        if end > mmap.len() {
            return Err(SegError::Eof);
        }
        mmap[start..start + OFF_WIDTH].copy_from_slice(&off.to_be_bytes());
        mmap[start + OFF_WIDTH..end].copy_from_slice(&pos.to_be_bytes());
        self.size += ENT_WIDTH as u64;
        Ok(())
    }

    /// Entry at ordinal `idx`; `-1` means the last one written.
    ///
    /// An empty index answers `-1` with `SegError::Eof`; any other miss is
    /// `SegError::IndexOutOfRange`.
    pub fn read(&self, idx: i64) -> Result<(u32, u64)> {
        let entries = self.entries();
        let ord = match idx {
            -1 if entries == 0 => return Err(SegError::Eof),
            -1 => entries - 1,
            i if i >= 0 && (i as u64) < entries => i as u64,
            i => return Err(SegError::IndexOutOfRange(i)),
        };
        let mmap = self.mmap.as_ref().ok_or(SegError::Eof)?;
        let start = (ord as usize) * ENT_WIDTH;
        let off = u32::from_be_bytes(
            mmap[start..start + OFF_WIDTH]
                .try_into()
                .map_err(|_| SegError::Corrupt)?,
        );
        let pos = u64::from_be_bytes(
            mmap[start + OFF_WIDTH..start + ENT_WIDTH]
                .try_into()
                .map_err(|_| SegError::Corrupt)?,
        );
        Ok((off, pos))
    }

    pub fn size(&self) -> u64 { self.size }

    pub fn entries(&self) -> u64 { self.size / ENT_WIDTH as u64 }

    /// Bytes reserved for entries (the mapped length).
    pub fn capacity(&self) -> u64 {
        self.mmap.as_ref().map_or(self.size, |m| m.len() as u64)
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Sync the map, unmap, truncate the file to `size`, fsync.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mmap) = self.mmap.take() {
            mmap.flush()?;
            drop(mmap);
            self.file.set_len(self.size)?;
            self.file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if self.mmap.is_some() {
            if let Err(e) = self.shutdown() {
                warn!(path = %self.path.display(), "index not closed cleanly: {e}");
            }
        }
    }
}
