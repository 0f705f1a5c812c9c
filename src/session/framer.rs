//! Session framing: variable-length events → fixed-shape matrix.
//! Keeps the first `sequence_length` events and zero-pads at the end; no scaling.

use super::{Event, FramedSession, Session};
use crate::config::FramingConfig;
use crate::error::{Error, Result};
use ndarray::Array2;

/// Frame `events` into a `(sequence_length × feature_count)` matrix.
///
/// Every event must have exactly `feature_count` values, including those that
/// fall past the truncation point.
pub fn frame(events: &[Event], sequence_length: usize, feature_count: usize) -> Result<FramedSession> {
    if sequence_length == 0 || feature_count == 0 {
        return Err(Error::Config(format!(
            "frame shape must be positive, got {}x{}",
            sequence_length, feature_count
        )));
    }
    if let Some((idx, ev)) = events
        .iter()
        .enumerate()
        .find(|(_, e)| e.width() != feature_count)
    {
        return Err(Error::data(format!(
            "event {} has {} features, expected {}",
            idx,
            ev.width(),
            feature_count
        )));
    }
    if let Some(idx) = events
        .iter()
        .position(|e| e.values.iter().any(|v| !v.is_finite()))
    {
        return Err(Error::data(format!("event {} has a non-finite feature", idx)));
    }

    let kept = events.len().min(sequence_length);
    let mut data = Array2::<f32>::zeros((sequence_length, feature_count));
    for (t, ev) in events.iter().take(kept).enumerate() {
        for (j, v) in ev.values.iter().enumerate() {
            data[[t, j]] = *v;
        }
    }
    Ok(FramedSession::from_parts(data, kept))
}

/// Framer bound to one framing configuration.
#[derive(Debug, Clone)]
pub struct SessionFramer {
    sequence_length: usize,
    feature_count: usize,
}

impl SessionFramer {
    pub fn new(config: &FramingConfig) -> Self {
        Self {
            sequence_length: config.sequence_length,
            feature_count: config.feature_count(),
        }
    }

    pub fn with_shape(sequence_length: usize, feature_count: usize) -> Self {
        Self {
            sequence_length,
            feature_count,
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn frame_events(&self, events: &[Event]) -> Result<FramedSession> {
        frame(events, self.sequence_length, self.feature_count)
    }

    pub fn frame(&self, session: &Session) -> Result<FramedSession> {
        self.frame_events(&session.events).map_err(|e| match e {
            Error::DataFormat(msg) => Error::DataFormat(format!("session {}: {}", session.key, msg)),
            other => other,
        })
    }

    /// Check that an already framed session has this framer's shape.
    pub fn accepts(&self, framed: &FramedSession) -> bool {
        framed.shape() == (self.sequence_length, self.feature_count)
    }
}
