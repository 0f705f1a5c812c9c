//! Siamese session encoder: LSTM → last hidden state → dense → ReLU.
//!
//! One instance serves both branches of a pair. Weight sharing is explicit: there is no
//! way to embed the two sides of a pair with different weights.

use super::distance;
use super::lstm::{self, LstmWeights, Trace};
use crate::error::{Error, Result};
use crate::session::FramedSession;
use ndarray::linalg::general_mat_mul;
use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-length session embedding.
pub type Embedding = Array1<f32>;

/// Shape-defining parameters of the encoder; part of every persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub input_dim: usize,
    pub lstm_units: usize,
    pub embedding_dim: usize,
    #[serde(default)]
    pub mask_padding: bool,
}

impl Architecture {
    pub fn new(input_dim: usize, lstm_units: usize, embedding_dim: usize) -> Self {
        Self {
            input_dim,
            lstm_units,
            embedding_dim,
            mask_padding: false,
        }
    }

    pub fn from_config(input_dim: usize, config: &crate::config::ModelConfig) -> Self {
        Self {
            input_dim,
            lstm_units: config.lstm_units,
            embedding_dim: config.embedding_dim,
            mask_padding: config.mask_padding,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input_dim={} lstm_units={} embedding_dim={} mask_padding={}",
            self.input_dim, self.lstm_units, self.embedding_dim, self.mask_padding
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseWeights {
    /// `[E, H]`
    pub w: Array2<f32>,
    pub b: Array1<f32>,
}

/// Every trainable tensor of the encoder. Also used as the gradient and Adam moment container.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderWeights {
    pub lstm: LstmWeights,
    pub projection: DenseWeights,
}

/// Stable tensor names, in the order of [`EncoderWeights::tensors`].
pub const TENSOR_NAMES: [&str; 6] = [
    "lstm.w_ih",
    "lstm.w_hh",
    "lstm.b_ih",
    "lstm.b_hh",
    "projection.w",
    "projection.b",
];

impl EncoderWeights {
    pub fn init<R: Rng + ?Sized>(arch: &Architecture, rng: &mut R) -> Self {
        let lstm = LstmWeights::init(arch.input_dim, arch.lstm_units, rng);
        let k = 1.0 / (arch.lstm_units as f32).sqrt();
        let dist = Uniform::new_inclusive(-k, k);
        let projection = DenseWeights {
            w: Array2::from_shape_fn((arch.embedding_dim, arch.lstm_units), |_| dist.sample(rng)),
            b: Array1::from_shape_fn(arch.embedding_dim, |_| dist.sample(rng)),
        };
        Self { lstm, projection }
    }

    pub fn zeros(arch: &Architecture) -> Self {
        Self {
            lstm: LstmWeights::zeros(arch.input_dim, arch.lstm_units),
            projection: DenseWeights {
                w: Array2::zeros((arch.embedding_dim, arch.lstm_units)),
                b: Array1::zeros(arch.embedding_dim),
            },
        }
    }

    /// Expected tensor shapes for an architecture, in [`TENSOR_NAMES`] order.
    pub fn expected_shapes(arch: &Architecture) -> [Vec<usize>; 6] {
        let (d, h, e) = (arch.input_dim, arch.lstm_units, arch.embedding_dim);
        [
            vec![4 * h, d],
            vec![4 * h, h],
            vec![4 * h],
            vec![4 * h],
            vec![e, h],
            vec![e],
        ]
    }

    pub fn tensors(&self) -> [ArrayViewD<'_, f32>; 6] {
        [
            self.lstm.w_ih.view().into_dyn(),
            self.lstm.w_hh.view().into_dyn(),
            self.lstm.b_ih.view().into_dyn(),
            self.lstm.b_hh.view().into_dyn(),
            self.projection.w.view().into_dyn(),
            self.projection.b.view().into_dyn(),
        ]
    }

    pub fn tensors_mut(&mut self) -> [ArrayViewMutD<'_, f32>; 6] {
        [
            self.lstm.w_ih.view_mut().into_dyn(),
            self.lstm.w_hh.view_mut().into_dyn(),
            self.lstm.b_ih.view_mut().into_dyn(),
            self.lstm.b_hh.view_mut().into_dyn(),
            self.projection.w.view_mut().into_dyn(),
            self.projection.b.view_mut().into_dyn(),
        ]
    }

    /// Fail with `ShapeMismatch` unless every tensor matches `arch`.
    pub fn check_shapes(&self, arch: &Architecture) -> Result<()> {
        let expected = Self::expected_shapes(arch);
        for ((name, t), want) in TENSOR_NAMES.iter().zip(self.tensors()).zip(expected) {
            if t.shape() != want.as_slice() {
                return Err(Error::shape(
                    format!("{} {:?}", name, want),
                    format!("{} {:?}", name, t.shape()),
                ));
            }
        }
        Ok(())
    }

    pub fn norm_sq(&self) -> f32 {
        self.tensors()
            .iter()
            .map(|t| t.iter().map(|v| v * v).sum::<f32>())
            .sum()
    }

    pub fn scale(&mut self, factor: f32) {
        for mut t in self.tensors_mut() {
            t.mapv_inplace(|v| v * factor);
        }
    }
}

/// Activations of one embedding pass, kept for backprop.
pub(crate) struct Forward {
    trace: Trace,
    hidden: Array1<f32>,
    pre: Array1<f32>,
    pub(crate) embedding: Embedding,
}

pub struct EmbeddingNetwork {
    arch: Architecture,
    weights: EncoderWeights,
}

impl EmbeddingNetwork {
    pub fn new<R: Rng + ?Sized>(arch: Architecture, rng: &mut R) -> Self {
        Self {
            weights: EncoderWeights::init(&arch, rng),
            arch,
        }
    }

    pub fn seeded(arch: Architecture, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(arch, &mut rng)
    }

    pub fn from_weights(arch: Architecture, weights: EncoderWeights) -> Result<Self> {
        weights.check_shapes(&arch)?;
        Ok(Self { arch, weights })
    }

    pub fn architecture(&self) -> &Architecture {
        &self.arch
    }

    pub fn weights(&self) -> &EncoderWeights {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut EncoderWeights {
        &mut self.weights
    }

    pub(crate) fn set_weights(&mut self, weights: EncoderWeights) {
        self.weights = weights;
    }

    fn steps(&self, framed: &FramedSession) -> usize {
        if self.arch.mask_padding {
            framed.len()
        } else {
            framed.sequence_length()
        }
    }

    fn check_input(&self, framed: &FramedSession) -> Result<()> {
        if framed.feature_count() != self.arch.input_dim {
            return Err(Error::data(format!(
                "framed session has {} features, encoder expects {}",
                framed.feature_count(),
                self.arch.input_dim
            )));
        }
        Ok(())
    }

    fn project(&self, hidden: &Array1<f32>) -> Array1<f32> {
        self.weights.projection.w.dot(hidden) + &self.weights.projection.b
    }

    /// Embed one framed session. Pure: identical weights and input give identical bits.
    pub fn embed(&self, framed: &FramedSession) -> Result<Embedding> {
        self.check_input(framed)?;
        let hidden = lstm::run(&self.weights.lstm, framed.data().view(), self.steps(framed));
        Ok(self.project(&hidden).mapv(|v| v.max(0.0)))
    }

    /// Euclidean distance between the embeddings of `a` and `b` under these weights.
    pub fn distance(&self, a: &FramedSession, b: &FramedSession) -> Result<f32> {
        let ea = self.embed(a)?;
        let eb = self.embed(b)?;
        Ok(distance::euclidean(&ea, &eb))
    }

    pub(crate) fn forward(&self, framed: &FramedSession) -> Result<Forward> {
        self.check_input(framed)?;
        let trace = lstm::forward(&self.weights.lstm, framed.data().view(), self.steps(framed));
        let hidden = trace.last_hidden();
        let pre = self.project(&hidden);
        let embedding = pre.mapv(|v| v.max(0.0));
        Ok(Forward {
            trace,
            hidden,
            pre,
            embedding,
        })
    }

    /// Accumulate dL/dθ into `grads` given dL/d(embedding) for one forward pass.
    pub(crate) fn backward(&self, fwd: &Forward, d_embedding: &Array1<f32>, grads: &mut EncoderWeights) {
        let d_pre = Array1::from_shape_fn(d_embedding.len(), |k| {
            if fwd.pre[k] > 0.0 {
                d_embedding[k]
            } else {
                0.0
            }
        });
        general_mat_mul(
            1.0,
            &d_pre.view().insert_axis(Axis(1)),
            &fwd.hidden.view().insert_axis(Axis(0)),
            1.0,
            &mut grads.projection.w,
        );
        grads.projection.b += &d_pre;
        let d_hidden = self.weights.projection.w.t().dot(&d_pre);
        lstm::backward(&self.weights.lstm, &fwd.trace, &d_hidden, &mut grads.lstm);
    }
}
