use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sk_common::Lsn;

use crate::reader::read_record;
use crate::writer::write_record;

fn segment_path(dir: &Path, lsn: Lsn) -> PathBuf {
    dir.join(format!("wal_{lsn}"))
}

/// Durable append-only WAL store, one file per LSN under `dir`
/// (§4.1). Writes are serialized through a single mutex to avoid torn
/// files (§5); reads are unsynchronized once a file exists, matching the
/// OS-level file I/O safety assumption documented there.
pub struct WalLogStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl WalLogStore {
    /// Open (creating if necessary) the WAL directory and scan it to
    /// recover the maximum durable LSN.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<(Self, Lsn)> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let store = Self {
            dir,
            write_lock: Mutex::new(()),
        };
        let latest = store.recover_latest_lsn()?;
        Ok((store, latest))
    }

    /// §4.1 `append`: create/overwrite `wal_<lsn>` and fsync.
    pub fn append(&self, lsn: Lsn, payload: &[u8], is_compressed: bool) -> std::io::Result<()> {
        let _guard = self.write_lock.lock();
        let path = segment_path(&self.dir, lsn);
        write_record(&path, lsn, payload, is_compressed)
    }

    /// §4.1 `read`: returns `None` if the LSN is not stored locally.
    pub fn read(&self, lsn: Lsn) -> std::io::Result<Option<(Vec<u8>, bool)>> {
        let path = segment_path(&self.dir, lsn);
        if !path.exists() {
            return Ok(None);
        }
        let rec = read_record(&path)?;
        Ok(Some((rec.payload, rec.is_compressed)))
    }

    /// §4.1 `read_range`: all records with `start <= lsn <= end` that exist
    /// locally; gaps are tolerated (caller skips).
    pub fn read_range(&self, start: Lsn, end: Lsn) -> std::io::Result<Vec<(Lsn, Vec<u8>, bool)>> {
        let mut out = Vec::new();
        for lsn in start..=end {
            if let Some((payload, is_compressed)) = self.read(lsn)? {
                out.push((lsn, payload, is_compressed));
            }
        }
        Ok(out)
    }

    /// §4.1 `recover_latest_lsn`: scan the directory for the maximum
    /// parseable `wal_<lsn>` filename.
    pub fn recover_latest_lsn(&self) -> std::io::Result<Lsn> {
        let mut max_lsn = 0u64;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(suffix) = name.strip_prefix("wal_") else { continue };
            if let Ok(lsn) = suffix.parse::<u64>() {
                max_lsn = max_lsn.max(lsn);
            }
        }
        Ok(max_lsn)
    }

    /// Number of WAL records currently stored locally, used for the
    /// `/metrics` surface.
    pub fn count(&self) -> std::io::Result<u64> {
        let mut n = 0u64;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with("wal_") {
                n += 1;
            }
        }
        Ok(n)
    }
}
