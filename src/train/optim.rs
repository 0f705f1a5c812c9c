//! Adam with bias-corrected moments.

use crate::model::EncoderWeights;
use ndarray::Zip;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPS: f32 = 1e-8;

pub struct Adam {
    lr: f32,
    t: i32,
    m: EncoderWeights,
    v: EncoderWeights,
}

impl Adam {
    pub fn new(lr: f32, params: &EncoderWeights) -> Self {
        let mut m = params.clone();
        m.scale(0.0);
        let v = m.clone();
        Self { lr, t: 0, m, v }
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    pub fn step(&mut self, params: &mut EncoderWeights, grads: &EncoderWeights) {
        self.t += 1;
        let bc1 = 1.0 - BETA1.powi(self.t);
        let bc2 = 1.0 - BETA2.powi(self.t);
        let lr = self.lr;

        for (((p, m), v), g) in params
            .tensors_mut()
            .into_iter()
            .zip(self.m.tensors_mut())
            .zip(self.v.tensors_mut())
            .zip(grads.tensors())
        {
            Zip::from(p).and(m).and(v).and(g).for_each(|p, m, v, &g| {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + EPS);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Architecture, EncoderWeights};

    #[test]
    fn first_step_moves_each_weight_by_lr_against_gradient_sign() {
        let arch = Architecture::new(2, 2, 2);
        let mut params = EncoderWeights::zeros(&arch);
        let mut grads = EncoderWeights::zeros(&arch);
        grads.projection.b[0] = 0.3;
        grads.projection.b[1] = -2.0;

        let mut adam = Adam::new(0.01, &params);
        adam.step(&mut params, &grads);

        assert_eq!(adam.steps(), 1);
        assert!((params.projection.b[0] + 0.01).abs() < 1e-6);
        assert!((params.projection.b[1] - 0.01).abs() < 1e-6);
        assert_eq!(params.lstm.w_ih[[0, 0]], 0.0);
    }
}
