// crates/seglog_core/src/consts.rs

use core::mem::size_of;

/// Store entry length prefix.
pub const LEN_WIDTH: usize = size_of::<u64>();

/// Index entry: relative offset (u32) followed by store position (u64).
pub const OFF_WIDTH: usize = size_of::<u32>();
pub const POS_WIDTH: usize = size_of::<u64>();
pub const ENT_WIDTH: usize = OFF_WIDTH + POS_WIDTH;

pub const STORE_EXT: &str = "store";
pub const INDEX_EXT: &str = "index";

pub const RECORD_VERSION: u8 = 1;
pub const RECORD_HEADER_SIZE: usize = 1 + 8 + 4; // version, offset, value len
pub const RECORD_CRC_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FileKind {
    Store,
    Index,
}

impl FileKind {
    pub fn ext(self) -> &'static str {
        match self {
            FileKind::Store => STORE_EXT,
            FileKind::Index => INDEX_EXT,
        }
    }

    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext {
            STORE_EXT => Some(FileKind::Store),
            INDEX_EXT => Some(FileKind::Index),
            _ => None,
        }
    }
}

const _: () = { assert!(ENT_WIDTH == 12); };
