//! Segment size limits.
//!
//! Both limits are required; nothing here picks a default. JSON layout:
//!
//! ```json
//! { "segment": { "max_store_bytes": 1048576, "max_index_bytes": 1048576 } }
//! ```

use crate::consts::ENT_WIDTH;
use crate::errors::{Result, SegError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub max_store_bytes: u64,
    /// Also the size of the pre-allocated index region.
    pub max_index_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub segment: SegmentConfig,
}

impl Config {
    pub fn new(max_store_bytes: u64, max_index_bytes: u64) -> Self {
        Self {
            segment: SegmentConfig {
                max_store_bytes,
                max_index_bytes,
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let c: Config = serde_json::from_str(&s)?;
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<()> {
        if self.segment.max_store_bytes == 0 {
            return Err(SegError::InvalidConfig(
                "segment.max_store_bytes must be positive".into(),
            ));
        }
        if self.segment.max_index_bytes < ENT_WIDTH as u64 {
            return Err(SegError::InvalidConfig(format!(
                "segment.max_index_bytes must hold at least one {ENT_WIDTH}-byte entry"
            )));
        }
        Ok(())
    }
}
