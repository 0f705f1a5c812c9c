//! Siamese LSTM encoder, distance head and persisted artifact.

mod artifact;
pub mod distance;
mod lstm;
mod network;

pub use artifact::{load_network, save_network, ArtifactMeta, LoadedModel, ModelArtifact, FORMAT_VERSION};
pub use distance::{euclidean, similarity};
pub use lstm::LstmWeights;
pub use network::{Architecture, DenseWeights, Embedding, EmbeddingNetwork, EncoderWeights, TENSOR_NAMES};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{frame, Event};
    use ndarray::Array1;

    fn tiny_arch() -> Architecture {
        Architecture::new(3, 4, 3)
    }

    fn session(rows: &[[f32; 3]]) -> crate::session::FramedSession {
        let events: Vec<Event> = rows.iter().map(|r| Event::new(r.to_vec())).collect();
        frame(&events, 5, 3).unwrap()
    }

    /// Squared distance between the two embeddings: the genuine-pair contrastive loss.
    fn pair_loss(net: &EmbeddingNetwork, a: &crate::session::FramedSession, b: &crate::session::FramedSession) -> f32 {
        let d = net.distance(a, b).unwrap();
        d * d
    }

    fn analytic_grads(
        net: &EmbeddingNetwork,
        a: &crate::session::FramedSession,
        b: &crate::session::FramedSession,
    ) -> EncoderWeights {
        let fa = net.forward(a).unwrap();
        let fb = net.forward(b).unwrap();
        let diff: Array1<f32> = &fa.embedding - &fb.embedding;
        let de = diff.mapv(|v| 2.0 * v);
        let mut grads = EncoderWeights::zeros(net.architecture());
        net.backward(&fa, &de, &mut grads);
        net.backward(&fb, &de.mapv(|v| -v), &mut grads);
        grads
    }

    #[test]
    fn backprop_matches_finite_differences() {
        let arch = tiny_arch();
        let mut net = EmbeddingNetwork::seeded(arch, 11);
        // Keep every projection unit active so the loss is smooth around the probe points.
        net.weights_mut().projection.b.fill(3.0);

        let a = session(&[[0.2, 0.9, 0.1], [0.5, 0.3, 0.7], [0.8, 0.1, 0.4]]);
        let b = session(&[[0.9, 0.2, 0.6], [0.1, 0.4, 0.2], [0.3, 0.8, 0.9], [0.6, 0.6, 0.1]]);

        let grads = analytic_grads(&net, &a, &b);
        let eps = 5e-3f32;

        for (ti, probes) in [(0usize, [0usize, 5, 17]), (1, [1, 6, 12]), (2, [0, 7, 15]), (4, [0, 4, 9])] {
            for &k in &probes {
                let base = net.weights().clone();

                let mut plus = base.clone();
                plus.tensors_mut()[ti].as_slice_mut().unwrap()[k] += eps;
                net.set_weights(plus);
                let lp = pair_loss(&net, &a, &b);

                let mut minus = base.clone();
                minus.tensors_mut()[ti].as_slice_mut().unwrap()[k] -= eps;
                net.set_weights(minus);
                let lm = pair_loss(&net, &a, &b);

                net.set_weights(base);
                let numeric = (lp - lm) / (2.0 * eps);
                let analytic = grads.tensors()[ti].as_slice().unwrap()[k];
                assert!(
                    (numeric - analytic).abs() <= 2e-3 + 0.05 * analytic.abs(),
                    "{}[{}]: numeric {} vs analytic {}",
                    TENSOR_NAMES[ti],
                    k,
                    numeric,
                    analytic
                );
            }
        }
    }

    #[test]
    fn embed_and_forward_agree_bitwise() {
        let net = EmbeddingNetwork::seeded(tiny_arch(), 3);
        let a = session(&[[0.2, 0.9, 0.1], [0.5, 0.3, 0.7]]);
        let embedded = net.embed(&a).unwrap();
        let fwd = net.forward(&a).unwrap();
        assert_eq!(embedded, fwd.embedding);
    }

    #[test]
    fn masking_ignores_padding_rows() {
        let mut arch = tiny_arch();
        arch.mask_padding = true;
        let net = EmbeddingNetwork::seeded(arch, 5);
        let short = frame(&[Event::new(vec![0.4, 0.1, 0.9])], 5, 3).unwrap();
        let longer_frame = frame(&[Event::new(vec![0.4, 0.1, 0.9])], 9, 3).unwrap();
        assert_eq!(net.embed(&short).unwrap(), net.embed(&longer_frame).unwrap());
    }
}
