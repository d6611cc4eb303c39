//! Segment: one store file plus one index file under a shared base offset.
//!
//! Files live in the log directory as `<base>.store` and `<base>.index`,
//! `<base>` being the decimal, unpadded absolute offset of the first record.
//!
//! Append writes the store first, then the index. The two are not updated
//! atomically: a failure between them leaves an unindexed store entry behind,
//! which `verify` counts as orphaned.

use crate::config::Config;
use crate::consts::FileKind;
use crate::errors::{Result, SegError};
use crate::index::Index;
use crate::record::Record;
use crate::store::Store;
use crate::utils::fsync_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

pub fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
    segment_file(dir, base_offset, FileKind::Store)
}

pub fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
    segment_file(dir, base_offset, FileKind::Index)
}

fn segment_file(dir: &Path, base_offset: u64, kind: FileKind) -> PathBuf {
    dir.join(format!("{base_offset}.{}", kind.ext()))
}

/// `17.store` -> `(17, Store)`. Padded or non-numeric names are not segment files.
pub fn parse_base_offset(path: &Path) -> Option<(u64, FileKind)> {
    let kind = FileKind::from_ext(path.extension()?.to_str()?)?;
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if stem.len() > 1 && stem.starts_with('0') {
        return None;
    }
    stem.parse().ok().map(|base| (base, kind))
}

/// Base offsets of every segment file in `dir`, ascending, without duplicates.
pub fn list_base_offsets(dir: &Path) -> Result<Vec<u64>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some((base, _)) = parse_base_offset(&entry.path()) {
            out.push(base);
        }
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub base_offset: u64,
    pub next_offset: u64,
    pub store_bytes: u64,
    pub index_bytes: u64,
    pub index_capacity: u64,
    pub maxed: bool,
}

/// Store/index cross-check. See [`Segment::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Entries found by scanning the store.
    pub entries: u64,
    /// Entries in the index.
    pub indexed: u64,
    /// Store entries past the last indexed one.
    pub orphaned: u64,
    /// Index entries that are out of order or don't point at an entry start.
    pub bad_positions: u64,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned == 0 && self.bad_positions == 0
    }
}

pub struct Segment {
    store: Store,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: Config,
}

impl Segment {
    /// Open or create the segment at `base_offset` inside `dir`.
    ///
    /// `next_offset` is recovered from the last index entry, so a reopened
    /// segment continues where it stopped without scanning the store.
    pub fn open(dir: impl AsRef<Path>, base_offset: u64, config: Config) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref();
        let store_path = store_path(dir, base_offset);
        let index_path = index_path(dir, base_offset);
        let created = !store_path.exists() || !index_path.exists();

        let store = Store::open(&store_path)?;
        let index = Index::open(&index_path, &config)?;
        if created {
            let _ = fsync_dir(dir);
        }

        let next_offset = match index.read(-1) {
            Ok((off, _)) => base_offset
                .checked_add(u64::from(off))
                .and_then(|last| last.checked_add(1))
                .ok_or(SegError::Corrupt)?,
            Err(SegError::Eof) => base_offset,
            Err(e) => return Err(e),
        };
        debug!(
            base_offset,
            next_offset,
            store_bytes = store.size(),
            index_bytes = index.size(),
            created,
            "segment opened"
        );

        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config,
        })
    }

    /// Assign the next offset to `record`, persist it, return that offset.
    ///
    /// `next_offset` moves only once both the store and the index accepted
    /// the record. A full index surfaces as `SegError::Eof`. Appending is
    /// allowed past `is_maxed`; the caller decides when to roll.
    pub fn append(&mut self, record: &mut Record) -> Result<u64> {
        let cur = self.next_offset;
        record.offset = cur;
        let rel = u32::try_from(cur - self.base_offset).map_err(|_| SegError::Eof)?;
        // offset space exhausted
        let next = cur.checked_add(1).ok_or(SegError::Eof)?;
        let bytes = record.encode()?;

        let (_, pos) = self.store.append(&bytes)?;
        if let Err(e) = self.index.write(rel, pos) {
            if e.is_eof() {
                warn!(base_offset = self.base_offset, offset = cur, "segment index full");
            }
            return Err(e);
        }

        self.next_offset = next;
        trace!(offset = cur, position = pos, "record appended");
        Ok(cur)
    }

    /// Record at absolute `offset`, or `OffsetOutOfRange` outside `[base, next)`.
    pub fn read(&mut self, offset: u64) -> Result<Record> {
        if offset < self.base_offset || offset >= self.next_offset {
            return Err(SegError::OffsetOutOfRange(offset));
        }
        let rel = offset - self.base_offset;
        let (off, pos) = self.index.read(rel as i64).map_err(|e| match e {
            SegError::Eof | SegError::IndexOutOfRange(_) => SegError::OffsetOutOfRange(offset),
            e => e,
        })?;
        if u64::from(off) != rel {
            return Err(SegError::Corrupt);
        }

        let bytes = self.store.read(pos)?;
        let record = Record::decode(&bytes)?;
        if record.offset != offset {
            return Err(SegError::Corrupt);
        }
        Ok(record)
    }

    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.segment.max_store_bytes
            || self.index.size() >= self.config.segment.max_index_bytes
    }

    pub fn base_offset(&self) -> u64 { self.base_offset }

    pub fn next_offset(&self) -> u64 { self.next_offset }

    pub fn config(&self) -> &Config { &self.config }

    pub fn stats(&self) -> SegmentStats {
        SegmentStats {
            base_offset: self.base_offset,
            next_offset: self.next_offset,
            store_bytes: self.store.size(),
            index_bytes: self.index.size(),
            index_capacity: self.index.capacity(),
            maxed: self.is_maxed(),
        }
    }

    /// Cross-check the index against a scan of the store. Read-only.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        let positions = self.store.scan()?;
        let mut report = VerifyReport {
            entries: positions.len() as u64,
            indexed: self.index.entries(),
            ..VerifyReport::default()
        };

        let mut last: Option<u64> = None;
        for i in 0..report.indexed {
            let (off, pos) = self.index.read(i as i64)?;
            let in_order = last.map_or(true, |prev| pos > prev);
            if u64::from(off) != i || !in_order || positions.binary_search(&pos).is_err() {
                report.bad_positions += 1;
                continue;
            }
            last = Some(pos);
        }
        report.orphaned = match last {
            Some(prev) => positions.iter().filter(|p| **p > prev).count() as u64,
            None => positions.len() as u64,
        };
        Ok(report)
    }

    /// Close, then delete both files.
    pub fn remove(self) -> Result<()> {
        let store_path = self.store.path().to_path_buf();
        let index_path = self.index.path().to_path_buf();
        let base_offset = self.base_offset;

        self.close()?;
        fs::remove_file(&index_path)?;
        fs::remove_file(&store_path)?;
        if let Some(dir) = store_path.parent() {
            let _ = fsync_dir(dir);
        }
        debug!(base_offset, "segment removed");
        Ok(())
    }

    /// Close the index (truncate to size, fsync), then the store (flush, fsync).
    ///
    /// Both are attempted; the first error is returned.
    pub fn close(self) -> Result<()> {
        let Segment {
            store,
            index,
            base_offset,
            next_offset,
            ..
        } = self;
        let index_res = index.close();
        let store_res = store.close();
        debug!(base_offset, next_offset, "segment closed");
        index_res.and(store_res)
    }
}
