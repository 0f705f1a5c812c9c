//! Enrollment store: one reference session per identity.

mod reference;

pub use reference::{DirectoryStore, MemoryStore, StoredReference};

use crate::error::Result;
use crate::session::FramedSession;

/// Read by the verifier, written by enrollment. Implementations must be safe to share across
/// concurrent verifications.
pub trait ReferenceStore: Send + Sync {
    /// `MissingReference` when nothing is enrolled for `identity`.
    fn load(&self, identity: &str) -> Result<FramedSession>;

    /// Replace any existing reference for `identity`.
    fn save(&self, identity: &str, reference: &FramedSession) -> Result<()>;

    fn contains(&self, identity: &str) -> bool;
}
