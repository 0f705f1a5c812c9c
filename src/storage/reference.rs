//! Directory-backed and in-memory reference stores.
//! Directory layout: `<dir>/<sanitised identity>-<sha256 prefix>.json`, written atomically.

use super::ReferenceStore;
use crate::error::{Error, Result};
use crate::session::FramedSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReference {
    pub identity: String,
    pub enrolled_at: DateTime<Utc>,
    pub reference: FramedSession,
}

pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `identity`. The hash suffix keeps distinct identities that sanitise alike apart.
    pub fn path_for(&self, identity: &str) -> PathBuf {
        let safe: String = identity
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .take(64)
            .collect();
        let digest = Sha256::digest(identity.as_bytes());
        let suffix: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}-{}.json", safe, suffix))
    }

    fn read(&self, identity: &str) -> Result<StoredReference> {
        let path = self.path_for(identity);
        let data = match std::fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingReference {
                    identity: identity.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredReference =
            serde_json::from_slice(&data).map_err(|e| Error::InvalidReference {
                identity: identity.to_string(),
                reason: e.to_string(),
            })?;
        if stored.identity != identity {
            return Err(Error::InvalidReference {
                identity: identity.to_string(),
                reason: format!("file belongs to `{}`", stored.identity),
            });
        }
        Ok(stored)
    }
}

impl ReferenceStore for DirectoryStore {
    fn load(&self, identity: &str) -> Result<FramedSession> {
        Ok(self.read(identity)?.reference)
    }

    fn save(&self, identity: &str, reference: &FramedSession) -> Result<()> {
        let stored = StoredReference {
            identity: identity.to_string(),
            enrolled_at: Utc::now(),
            reference: reference.clone(),
        };
        let path = self.path_for(identity);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(&stored)?)?;
        std::fs::rename(&tmp, &path)?;
        tracing::info!(identity, path = %path.display(), "reference enrolled");
        Ok(())
    }

    fn contains(&self, identity: &str) -> bool {
        self.path_for(identity).is_file()
    }
}

/// Process-local store; used by tests and embedders that manage persistence themselves.
#[derive(Default)]
pub struct MemoryStore {
    refs: RwLock<HashMap<String, FramedSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceStore for MemoryStore {
    fn load(&self, identity: &str) -> Result<FramedSession> {
        let refs = self
            .refs
            .read()
            .map_err(|_| Error::Config("reference store lock poisoned".into()))?;
        refs.get(identity).cloned().ok_or_else(|| Error::MissingReference {
            identity: identity.to_string(),
        })
    }

    fn save(&self, identity: &str, reference: &FramedSession) -> Result<()> {
        let mut refs = self
            .refs
            .write()
            .map_err(|_| Error::Config("reference store lock poisoned".into()))?;
        refs.insert(identity.to_string(), reference.clone());
        Ok(())
    }

    fn contains(&self, identity: &str) -> bool {
        self.refs
            .read()
            .map(|r| r.contains_key(identity))
            .unwrap_or(false)
    }
}
