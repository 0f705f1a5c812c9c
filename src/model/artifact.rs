//! Persisted encoder weights: JSON header plus base64 little-endian f32 tensor blobs.
//! SHA-256 over the raw tensor bytes guards against truncated or edited files.

use super::network::{Architecture, EmbeddingNetwork, EncoderWeights, TENSOR_NAMES};
use crate::error::{Error, Result};
use crate::train::Objective;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

/// Everything besides the weights that a verifier needs to reproduce training-time framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub objective: Objective,
    pub sequence_length: usize,
    pub feature_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TensorBlob {
    name: String,
    shape: Vec<usize>,
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub architecture: Architecture,
    #[serde(flatten)]
    pub meta: ArtifactMeta,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
    tensors: Vec<TensorBlob>,
}

/// Loaded, shape-checked network plus the metadata it was saved with.
pub struct LoadedModel {
    pub network: EmbeddingNetwork,
    pub meta: ArtifactMeta,
    pub saved_at: DateTime<Utc>,
}

fn tensor_bytes(values: impl Iterator<Item = f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_floats(name: &str, data: &str, expected_len: usize) -> Result<Vec<f32>> {
    let raw = BASE64
        .decode(data)
        .map_err(|e| Error::Artifact(format!("tensor {}: {}", name, e)))?;
    if raw.len() != expected_len * 4 {
        return Err(Error::shape(
            format!("{} with {} values", name, expected_len),
            format!("{} bytes", raw.len()),
        ));
    }
    Ok(raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn array2(name: &str, shape: &[usize], values: Vec<f32>) -> Result<Array2<f32>> {
    Array2::from_shape_vec((shape[0], shape[1]), values)
        .map_err(|e| Error::shape(format!("{} {:?}", name, shape), e))
}

impl ModelArtifact {
    pub fn from_network(network: &EmbeddingNetwork, meta: ArtifactMeta) -> Self {
        let mut hasher = Sha256::new();
        let tensors = TENSOR_NAMES
            .iter()
            .zip(network.weights().tensors())
            .map(|(name, t)| {
                let bytes = tensor_bytes(t.iter().copied());
                hasher.update(&bytes);
                TensorBlob {
                    name: name.to_string(),
                    shape: t.shape().to_vec(),
                    data: BASE64.encode(&bytes),
                }
            })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            architecture: *network.architecture(),
            meta,
            saved_at: Utc::now(),
            checksum: format!("{:x}", hasher.finalize()),
            tensors,
        }
    }

    /// Write atomically: a reader never observes a partially written file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Parse an artifact without instantiating it.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let artifact: ModelArtifact = serde_json::from_slice(&data)
            .map_err(|e| Error::Artifact(format!("{}: {}", path.display(), e)))?;
        if artifact.format_version != FORMAT_VERSION {
            return Err(Error::Artifact(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }

    /// Rebuild the network. Fails with `ShapeMismatch` if the saved architecture is not `expected`
    /// or any tensor disagrees with it; nothing is partially loaded.
    pub fn into_network(self, expected: &Architecture) -> Result<LoadedModel> {
        if self.architecture != *expected {
            return Err(Error::shape(expected, self.architecture));
        }
        let shapes = EncoderWeights::expected_shapes(expected);
        if self.tensors.len() != TENSOR_NAMES.len() {
            return Err(Error::shape(
                format!("{} tensors", TENSOR_NAMES.len()),
                format!("{} tensors", self.tensors.len()),
            ));
        }

        let mut hasher = Sha256::new();
        let mut decoded = Vec::with_capacity(TENSOR_NAMES.len());
        for ((blob, name), shape) in self.tensors.iter().zip(TENSOR_NAMES).zip(shapes.iter()) {
            if blob.name != name {
                return Err(Error::Artifact(format!(
                    "tensor order: expected {}, found {}",
                    name, blob.name
                )));
            }
            if &blob.shape != shape {
                return Err(Error::shape(
                    format!("{} {:?}", name, shape),
                    format!("{} {:?}", name, blob.shape),
                ));
            }
            let values = decode_floats(name, &blob.data, shape.iter().product())?;
            hasher.update(tensor_bytes(values.iter().copied()));
            decoded.push(values);
        }
        let checksum = format!("{:x}", hasher.finalize());
        if checksum != self.checksum {
            return Err(Error::Artifact(format!(
                "checksum mismatch: header {}, tensors {}",
                self.checksum, checksum
            )));
        }

        let mut it = decoded.into_iter();
        let mut next = || it.next().unwrap_or_default();
        let mut weights = EncoderWeights::zeros(expected);
        weights.lstm.w_ih = array2(TENSOR_NAMES[0], &shapes[0], next())?;
        weights.lstm.w_hh = array2(TENSOR_NAMES[1], &shapes[1], next())?;
        weights.lstm.b_ih = Array1::from_vec(next());
        weights.lstm.b_hh = Array1::from_vec(next());
        weights.projection.w = array2(TENSOR_NAMES[4], &shapes[4], next())?;
        weights.projection.b = Array1::from_vec(next());

        Ok(LoadedModel {
            network: EmbeddingNetwork::from_weights(*expected, weights)?,
            meta: self.meta,
            saved_at: self.saved_at,
        })
    }
}

pub fn save_network(path: &Path, network: &EmbeddingNetwork, meta: ArtifactMeta) -> Result<()> {
    ModelArtifact::from_network(network, meta).save(path)
}

/// Read and instantiate in one go. A missing file is an I/O error, never an untrained fallback.
pub fn load_network(path: &Path, expected: &Architecture) -> Result<LoadedModel> {
    ModelArtifact::read(path)?.into_network(expected)
}
