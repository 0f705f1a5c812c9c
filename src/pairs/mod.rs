//! Genuine/impostor pair construction for contrastive supervision.

mod sampler;

pub use sampler::{PairSampler, SampleReport};

use crate::session::{FramedSession, SessionKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairLabel {
    /// Both sessions from the same user
    Genuine,
    /// Sessions from two different users
    Impostor,
}

impl PairLabel {
    /// Binary training target: 1 for genuine, 0 for impostor.
    pub fn target(self) -> f32 {
        match self {
            PairLabel::Genuine => 1.0,
            PairLabel::Impostor => 0.0,
        }
    }

    pub fn is_genuine(self) -> bool {
        self == PairLabel::Genuine
    }
}

/// What to do when a genuine draw lands on a user with a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfPairPolicy {
    /// Skip the draw. Genuine pairs always join two distinct sessions.
    #[default]
    Disallow,
    /// Pair a single-session user's session with itself.
    Singletons,
    /// Every genuine pair is a session paired with itself.
    Always,
}

/// Two framed sessions and their label. Borrows from the session pool; never persisted.
#[derive(Debug, Clone, Copy)]
pub struct Pair<'a> {
    pub left_key: &'a SessionKey,
    pub left: &'a FramedSession,
    pub right_key: &'a SessionKey,
    pub right: &'a FramedSession,
    pub label: PairLabel,
}

impl<'a> Pair<'a> {
    pub fn is_self_pair(&self) -> bool {
        self.left_key == self.right_key
    }
}
