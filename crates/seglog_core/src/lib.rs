pub mod consts;
pub mod errors;
pub mod utils;
pub mod config;
pub mod record;
pub mod store;
pub mod index;
pub mod segment;

pub use config::{Config, SegmentConfig};
pub use consts::FileKind;
pub use errors::{Result, SegError};
pub use index::Index;
pub use record::Record;
pub use segment::{
    index_path, list_base_offsets, parse_base_offset, store_path, Segment, SegmentStats,
    VerifyReport,
};
pub use store::Store;
pub use utils::nearest_multiple;
