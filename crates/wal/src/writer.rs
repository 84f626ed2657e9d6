use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use sk_common::Lsn;

use crate::record::encode_header;

/// Durably append one record to its own `wal_<lsn>` file.
///
/// Returns only after the payload bytes have been flushed to the underlying
/// medium (fsync), matching the durability contract in §4.1: "the API does
/// not guarantee directory durability ... operators pair it with a durable
/// filesystem."
pub fn write_record(
    path: &Path,
    lsn: Lsn,
    payload: &[u8],
    is_compressed: bool,
) -> std::io::Result<()> {
    let header = encode_header(lsn, is_compressed, payload.len() as u32);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&header)?;
    file.write_all(payload)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}
