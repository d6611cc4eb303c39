//! Append-only data file: `[u64 BE len][len bytes]` per entry, no header.

use crate::consts::LEN_WIDTH;
use crate::errors::{Result, SegError};
use crate::utils::{read_u64, write_u64};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct Store {
    path: PathBuf,
    buf: BufWriter<File>,
    size: u64,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            buf: BufWriter::new(file),
            size,
        })
    }

    /// Returns `(bytes_written, position)`; `position` is where the entry starts.
    pub fn append(&mut self, p: &[u8]) -> Result<(u64, u64)> {
        let pos = self.size;
        write_u64(&mut self.buf, p.len() as u64)?;
        self.buf.write_all(p)?;
        let written = (LEN_WIDTH + p.len()) as u64;
        self.size += written;
        Ok((written, pos))
    }

    /// Payload of the entry starting at `pos`.
    pub fn read(&mut self, pos: u64) -> Result<Vec<u8>> {
        self.buf.flush()?;
        let body = pos
            .checked_add(LEN_WIDTH as u64)
            .filter(|end| *end <= self.size)
            .ok_or(SegError::PositionOutOfRange(pos))?;

        let f = self.buf.get_mut();
        f.seek(SeekFrom::Start(pos))?;
        let len = read_u64(f)?;
        match body.checked_add(len) {
            Some(end) if end <= self.size => {}
            _ => return Err(SegError::Corrupt),
        }
        let len = usize::try_from(len).map_err(|_| SegError::Corrupt)?;
        let mut out = vec![0u8; len];
        f.read_exact(&mut out)?;
        Ok(out)
    }

    /// Raw read of up to `buf.len()` bytes at `off`. Returns how many were read.
    pub fn read_at(&mut self, buf: &mut [u8], off: u64) -> Result<usize> {
        self.buf.flush()?;
        if off >= self.size {
            return Err(SegError::PositionOutOfRange(off));
        }
        let n = (self.size - off).min(buf.len() as u64) as usize;
        let f = self.buf.get_mut();
        f.seek(SeekFrom::Start(off))?;
        f.read_exact(&mut buf[..n])?;
        Ok(n)
    }

    /// Start position of every entry, in file order. A torn trailing entry is `Corrupt`.
    pub fn scan(&mut self) -> Result<Vec<u64>> {
        let mut positions = Vec::new();
        let mut len_buf = [0u8; LEN_WIDTH];
        let mut pos = 0u64;
        while pos < self.size {
            if self.read_at(&mut len_buf, pos)? < LEN_WIDTH {
                return Err(SegError::Corrupt);
            }
            let len = u64::from_be_bytes(len_buf);
            let next = pos
                .checked_add(LEN_WIDTH as u64)
                .and_then(|p| p.checked_add(len))
                .filter(|next| *next <= self.size)
                .ok_or(SegError::Corrupt)?;
            positions.push(pos);
            pos = next;
        }
        Ok(positions)
    }

    pub fn size(&self) -> u64 { self.size }

    pub fn path(&self) -> &Path { &self.path }

    /// Flush buffered writes and fsync.
    pub fn close(mut self) -> Result<()> {
        self.buf.flush()?;
        self.buf.get_ref().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAYLOAD: &[u8] = b"hello world";
    const WIDTH: u64 = (LEN_WIDTH + PAYLOAD.len()) as u64;

    #[test]
    fn append_then_read() {
        let tmp = tempdir().unwrap();
        let mut s = Store::open(tmp.path().join("0.store")).unwrap();

        for i in 0..3u64 {
            let (n, pos) = s.append(PAYLOAD).unwrap();
            assert_eq!(n, WIDTH);
            assert_eq!(pos, i * WIDTH);
            assert_eq!(s.size(), (i + 1) * WIDTH);
        }
        for i in 0..3u64 {
            assert_eq!(s.read(i * WIDTH).unwrap(), PAYLOAD);
        }
    }

    #[test]
    fn read_at_sees_prefix_and_payload() {
        let tmp = tempdir().unwrap();
        let mut s = Store::open(tmp.path().join("0.store")).unwrap();
        s.append(PAYLOAD).unwrap();

        let mut len = [0u8; LEN_WIDTH];
        assert_eq!(s.read_at(&mut len, 0).unwrap(), LEN_WIDTH);
        assert_eq!(u64::from_be_bytes(len), PAYLOAD.len() as u64);

        let mut big = [0u8; 64];
        let n = s.read_at(&mut big, LEN_WIDTH as u64).unwrap();
        assert_eq!(&big[..n], PAYLOAD);
    }

    #[test]
    fn positions_outside_written_region() {
        let tmp = tempdir().unwrap();
        let mut s = Store::open(tmp.path().join("0.store")).unwrap();
        assert!(matches!(s.read(0), Err(SegError::PositionOutOfRange(0))));
        s.append(PAYLOAD).unwrap();
        assert!(matches!(
            s.read(WIDTH),
            Err(SegError::PositionOutOfRange(_))
        ));
        assert!(matches!(
            s.read(u64::MAX),
            Err(SegError::PositionOutOfRange(_))
        ));
        // lands inside the payload: the "length" it finds points past the end
        assert!(matches!(s.read(4), Err(SegError::Corrupt)));
    }

    #[test]
    fn reopen_keeps_size_and_data() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("0.store");
        let mut s = Store::open(&p).unwrap();
        s.append(PAYLOAD).unwrap();
        s.append(b"second").unwrap();
        s.close().unwrap();

        assert_eq!(std::fs::metadata(&p).unwrap().len(), WIDTH + LEN_WIDTH as u64 + 6);

        let mut s = Store::open(&p).unwrap();
        assert_eq!(s.size(), WIDTH + LEN_WIDTH as u64 + 6);
        assert_eq!(s.read(WIDTH).unwrap(), b"second");
        let (_, pos) = s.append(b"third").unwrap();
        assert_eq!(s.read(pos).unwrap(), b"third");
    }

    #[test]
    fn scan_lists_entries_and_flags_torn_tail() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("0.store");
        let mut s = Store::open(&p).unwrap();
        s.append(PAYLOAD).unwrap();
        s.append(b"").unwrap();
        s.append(PAYLOAD).unwrap();
        assert_eq!(
            s.scan().unwrap(),
            vec![0, WIDTH, WIDTH + LEN_WIDTH as u64]
        );
        s.close().unwrap();

        // half a length prefix
        let mut f = OpenOptions::new().append(true).open(&p).unwrap();
        f.write_all(&[0, 0, 0]).unwrap();
        drop(f);

        let mut s = Store::open(&p).unwrap();
        assert!(matches!(s.scan(), Err(SegError::Corrupt)));
    }
}
