use byteorder::{BigEndian as BE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::path::Path;

pub fn crc32(data: &[u8]) -> u32 { crc32fast::hash(data) }

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> { w.write_u64::<BE>(v) }
pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> { w.write_u32::<BE>(v) }
pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> { r.read_u64::<BE>() }
pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> { r.read_u32::<BE>() }

/// Rounds `value` down to a multiple of `step`. A zero step returns `value` as is.
pub fn nearest_multiple(value: u64, step: u64) -> u64 {
    if step == 0 {
        return value;
    }
    (value / step) * step
}

#[cfg(unix)]
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let f = std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(dir)?;
    f.sync_all()
}
#[cfg(not(unix))]
pub fn fsync_dir(_dir: &Path) -> io::Result<()> { Ok(()) }
