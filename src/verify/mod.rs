//! Inference-time verification of a probe session against an enrolled reference.
//!
//! Returns a raw similarity only. Accept/reject and risk tiers are caller policy (see `risk`).

use crate::error::{Error, Result};
use crate::model::{euclidean, similarity, EmbeddingNetwork};
use crate::session::{Event, FramedSession, SessionFramer};
use crate::storage::ReferenceStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub distance: f32,
    /// `sigmoid(-distance)`, in (0, 0.5]
    pub similarity: f32,
}

/// Stateless over a read-only, fully loaded network; clone freely across threads.
#[derive(Clone)]
pub struct Verifier {
    network: Arc<EmbeddingNetwork>,
    framer: SessionFramer,
}

impl Verifier {
    pub fn new(network: Arc<EmbeddingNetwork>, framer: SessionFramer) -> Result<Self> {
        let input_dim = network.architecture().input_dim;
        if framer.feature_count() != input_dim {
            return Err(Error::shape(
                format!("{} features per event", input_dim),
                format!("{} configured feature columns", framer.feature_count()),
            ));
        }
        Ok(Self { network, framer })
    }

    pub fn framer(&self) -> &SessionFramer {
        &self.framer
    }

    pub fn network(&self) -> &EmbeddingNetwork {
        &self.network
    }

    /// Frame `probe`, embed both sessions with the same encoder and score them.
    pub fn verify(&self, reference: &FramedSession, probe: &[Event]) -> Result<Verification> {
        self.verify_labelled("<inline>", reference, probe)
    }

    /// Both sides already framed.
    pub fn verify_framed(&self, reference: &FramedSession, probe: &FramedSession) -> Result<Verification> {
        let ea = self.network.embed(reference)?;
        let eb = self.network.embed(probe)?;
        let distance = euclidean(&ea, &eb);
        Ok(Verification {
            distance,
            similarity: similarity(distance),
        })
    }

    /// Look up `identity` in `store` and verify. A missing reference is an error, never a low score.
    pub fn verify_enrolled(
        &self,
        store: &dyn ReferenceStore,
        identity: &str,
        probe: &[Event],
    ) -> Result<Verification> {
        let reference = store.load(identity)?;
        self.verify_labelled(identity, &reference, probe)
    }

    fn verify_labelled(&self, identity: &str, reference: &FramedSession, probe: &[Event]) -> Result<Verification> {
        if !self.framer.accepts(reference) {
            return Err(Error::InvalidReference {
                identity: identity.to_string(),
                reason: format!(
                    "shape {:?}, expected ({}, {})",
                    reference.shape(),
                    self.framer.sequence_length(),
                    self.framer.feature_count()
                ),
            });
        }
        let probe = self.framer.frame_events(probe)?;
        self.verify_framed(reference, &probe)
    }
}
