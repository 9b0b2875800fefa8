//! Content-addressed storage for encoded sequences.
//!
//! Objects live at `<root>/<first 2 hex chars>/<remaining 62>` and are named by
//! the SHA-256 of their bytes.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::compression::{CandleSequence, TickSequence};
use crate::error::{CodecError, Result};

const ID_LEN: usize = 64;

fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn check_id(id: &str) -> Result<()> {
    let valid = id.len() == ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !valid {
        return Err(CodecError::invalid(
            "object_id",
            format!("`{id}` is not a lowercase SHA-256 hex digest"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        ObjectStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &str) -> PathBuf {
        let (prefix, fname) = id.split_at(2);
        self.root.join(prefix).join(fname)
    }

    /// Writes `data` and returns its id. An intact copy already on disk is
    /// kept; a damaged one is overwritten.
    pub fn put(&self, data: &[u8]) -> Result<String> {
        let id = hash_bytes(data);
        let path = self.object_path(&id);
        if path.is_file() {
            if hash_bytes(&fs::read(&path)?) == id {
                debug!(%id, "object already stored");
                return Ok(id);
            }
            warn!(%id, "stored object is corrupt, rewriting");
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, data)?;
        info!(%id, bytes = data.len(), "stored object");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Vec<u8>> {
        check_id(id)?;
        let data = fs::read(self.object_path(id))?;
        if hash_bytes(&data) != id {
            return Err(CodecError::DigestMismatch { id: id.to_string() });
        }
        Ok(data)
    }

    pub fn contains(&self, id: &str) -> bool {
        check_id(id).is_ok() && self.object_path(id).is_file()
    }

    pub fn put_ticks(&self, seq: &TickSequence) -> Result<String> {
        self.put(&seq.to_bytes()?)
    }

    pub fn get_ticks(&self, id: &str) -> Result<TickSequence> {
        TickSequence::from_bytes(&self.get(id)?)
    }

    pub fn put_candles(&self, seq: &CandleSequence) -> Result<String> {
        self.put(&seq.to_bytes()?)
    }

    pub fn get_candles(&self, id: &str) -> Result<CandleSequence> {
        CandleSequence::from_bytes(&self.get(id)?)
    }
}
