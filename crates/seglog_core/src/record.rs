//! Record value and its on-store encoding.
//!
//! Version 1 layout (BE):
//!   version[1] = 1
//!   offset[8]
//!   len[4]     = value length
//!   value[len]
//!   crc[4]     = crc32 of everything above

use crate::consts::{RECORD_CRC_SIZE, RECORD_HEADER_SIZE, RECORD_VERSION};
use crate::errors::{Result, SegError};
use crate::utils::{crc32, read_u32, read_u64, write_u32, write_u64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub value: Vec<u8>,
    /// Absolute log offset. Assigned by the segment on append.
    pub offset: u64,
}

impl Record {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            offset: 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.value.len() + RECORD_CRC_SIZE
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = u32::try_from(self.value.len())
            .map_err(|_| SegError::RecordTooLarge(self.value.len()))?;
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(RECORD_VERSION);
        write_u64(&mut out, self.offset)?;
        write_u32(&mut out, len)?;
        out.extend_from_slice(&self.value);
        let crc = crc32(&out);
        write_u32(&mut out, crc)?;
        Ok(out)
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < RECORD_HEADER_SIZE + RECORD_CRC_SIZE {
            return Err(SegError::Corrupt);
        }
        if buf[0] != RECORD_VERSION {
            return Err(SegError::BadVersion(buf[0]));
        }
        let (body, tail) = buf.split_at(buf.len() - RECORD_CRC_SIZE);
        let want = u32::from_be_bytes(tail.try_into().map_err(|_| SegError::Corrupt)?);
        if crc32(body) != want {
            return Err(SegError::Corrupt);
        }
        let mut cur = &body[1..];
        let offset = read_u64(&mut cur)?;
        let len = read_u32(&mut cur)? as usize;
        if cur.len() != len {
            return Err(SegError::Corrupt);
        }
        Ok(Self {
            value: cur.to_vec(),
            offset,
        })
    }
}
