use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use sk_common::Lsn;

use crate::record::{probe, ProbeResult};

/// A record read back off disk: its payload and whether it was stored
/// compressed (the caller, typically the codec, decompresses if so).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub lsn: Lsn,
    pub payload: Vec<u8>,
    pub is_compressed: bool,
}

/// Read a single `wal_<lsn>` file, tolerating both the current and legacy
/// on-disk formats (§4.1).
pub fn read_record(path: &Path) -> std::io::Result<ReadRecord> {
    let mut file = File::open(path)?;

    let mut lsn_buf = [0u8; 8];
    file.read_exact(&mut lsn_buf)?;
    let lsn = u64::from_le_bytes(lsn_buf);

    let mut tail = [0u8; 5];
    file.read_exact(&mut tail)?;

    let (is_compressed, payload_len, leading_byte) = match probe(&tail) {
        ProbeResult::Current { is_compressed, payload_len } => (is_compressed, payload_len, None),
        ProbeResult::Legacy { payload_len, extra_byte } => {
            if payload_len == 0 {
                // `extra_byte` belongs to whatever follows (there is none,
                // since one record occupies the whole file); rewind it.
                file.seek(SeekFrom::Current(-1))?;
                (false, 0, None)
            } else {
                (false, payload_len, Some(extra_byte))
            }
        }
    };

    let mut payload = Vec::with_capacity(payload_len as usize);
    if let Some(b) = leading_byte {
        payload.push(b);
    }
    let remaining = payload_len as usize - payload.len();
    if remaining > 0 {
        let mut buf = vec![0u8; remaining];
        file.read_exact(&mut buf)?;
        payload.extend_from_slice(&buf);
    }

    Ok(ReadRecord { lsn, payload, is_compressed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_record;
    use tempfile::NamedTempFile;

    #[test]
    fn roundtrips_current_format() {
        let tmp = NamedTempFile::new().unwrap();
        write_record(tmp.path(), 100, b"hello", false).unwrap();
        let rec = read_record(tmp.path()).unwrap();
        assert_eq!(rec.lsn, 100);
        assert_eq!(rec.payload, b"hello");
        assert!(!rec.is_compressed);
    }

    #[test]
    fn roundtrips_compressed_flag() {
        let tmp = NamedTempFile::new().unwrap();
        write_record(tmp.path(), 7, b"zzz", true).unwrap();
        let rec = read_record(tmp.path()).unwrap();
        assert!(rec.is_compressed);
    }

    #[test]
    fn reads_legacy_format_without_flag_byte() {
        let tmp = NamedTempFile::new().unwrap();
        // [lsn u64][len u32][payload] — no compression_flag byte at all.
        let payload = b"uncompressed-bytes";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&42u64.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        std::fs::write(tmp.path(), &bytes).unwrap();

        let rec = read_record(tmp.path()).unwrap();
        assert_eq!(rec.lsn, 42);
        assert_eq!(rec.payload, payload);
        assert!(!rec.is_compressed);
    }

    #[test]
    fn reads_legacy_zero_length_payload() {
        let tmp = NamedTempFile::new().unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u64.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        std::fs::write(tmp.path(), &bytes).unwrap();

        let rec = read_record(tmp.path()).unwrap();
        assert_eq!(rec.lsn, 5);
        assert!(rec.payload.is_empty());
    }
}
