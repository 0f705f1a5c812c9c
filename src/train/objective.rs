//! Pair objectives over embedding distance.

use crate::model::distance::sigmoid;
use serde::{Deserialize, Serialize};

/// Training objective. Stored in the model artifact: weights trained under one
/// convention are not calibrated for the other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Objective {
    /// `y·d² + (1−y)·max(margin − d, 0)²`
    Contrastive { margin: f32 },
    /// Binary cross-entropy with `−d` as the logit.
    Logistic,
}

impl Default for Objective {
    fn default() -> Self {
        Objective::Contrastive { margin: 1.0 }
    }
}

impl Objective {
    /// Loss for one pair at distance `d` with target `y` (1 genuine, 0 impostor).
    pub fn loss(&self, d: f32, y: f32) -> f32 {
        match *self {
            Objective::Contrastive { margin } => {
                let gap = (margin - d).max(0.0);
                y * d * d + (1.0 - y) * gap * gap
            }
            // max(z,0) − z·y + ln(1 + e^{−|z|}) with z = −d ≤ 0
            Objective::Logistic => d * y + (-d).exp().ln_1p(),
        }
    }

    /// dL/dd.
    pub fn grad(&self, d: f32, y: f32) -> f32 {
        match *self {
            Objective::Contrastive { margin } => {
                let gap = (margin - d).max(0.0);
                2.0 * y * d - 2.0 * (1.0 - y) * gap
            }
            Objective::Logistic => y - sigmoid(-d),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::Contrastive { .. } => "contrastive",
            Objective::Logistic => "logistic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrastive_penalises_close_impostors_only() {
        let obj = Objective::default();
        assert_eq!(obj.loss(0.0, 1.0), 0.0);
        assert_eq!(obj.loss(1.5, 0.0), 0.0);
        assert!((obj.loss(0.5, 0.0) - 0.25).abs() < 1e-6);
        assert!((obj.loss(0.5, 1.0) - 0.25).abs() < 1e-6);
        assert!(obj.grad(0.5, 0.0) < 0.0);
        assert!(obj.grad(0.5, 1.0) > 0.0);
    }

    #[test]
    fn logistic_matches_bce_with_logits() {
        let obj = Objective::Logistic;
        let d = 0.7f32;
        let p = sigmoid(-d);
        assert!((obj.loss(d, 1.0) + p.ln()).abs() < 1e-5);
        assert!((obj.loss(d, 0.0) + (1.0 - p).ln()).abs() < 1e-5);
    }

    #[test]
    fn gradients_match_finite_differences() {
        for obj in [Objective::default(), Objective::Logistic] {
            for &(d, y) in &[(0.3f32, 1.0f32), (0.3, 0.0), (1.7, 0.0), (1.7, 1.0)] {
                let eps = 1e-3;
                let numeric = (obj.loss(d + eps, y) - obj.loss(d - eps, y)) / (2.0 * eps);
                assert!((numeric - obj.grad(d, y)).abs() < 1e-2, "{:?} d={} y={}", obj, d, y);
            }
        }
    }
}
