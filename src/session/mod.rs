//! Raw touch sessions and their fixed-shape framed form.

mod feed;
mod framer;

pub use feed::{
    frame_pool, load_feed, load_feed_dir, parse_feed, parse_probe, split_sessions, SessionPool,
};
pub use framer::{frame, SessionFramer};

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One captured input event: an ordered tuple of numeric features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    pub values: Vec<f32>,
}

impl Event {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }
}

impl From<Vec<f32>> for Event {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// (user, session) identity of a captured session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user: String,
    pub session: String,
}

impl SessionKey {
    pub fn new(user: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            session: session.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user, self.session)
    }
}

/// Variable-length, time-ordered events for one identity and episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub events: Vec<Event>,
}

impl Session {
    pub fn new(key: SessionKey, events: Vec<Event>) -> Self {
        Self { key, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Fixed `(sequence_length × feature_count)` matrix derived from a session.
///
/// Rows at index `len` and beyond are exactly zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramedSession {
    data: Array2<f32>,
    len: usize,
}

impl FramedSession {
    /// Wrap an already framed matrix. `len` is the number of leading real rows.
    pub fn from_parts(data: Array2<f32>, len: usize) -> Self {
        let len = len.min(data.nrows());
        Self { data, len }
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn row(&self, t: usize) -> ArrayView1<'_, f32> {
        self.data.row(t)
    }

    pub fn sequence_length(&self) -> usize {
        self.data.nrows()
    }

    pub fn feature_count(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.data.nrows(), self.data.ncols())
    }

    /// Number of rows that came from real events.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` for real rows, `false` for padding.
    pub fn mask(&self) -> Array1<bool> {
        Array1::from_shape_fn(self.data.nrows(), |t| t < self.len)
    }
}
