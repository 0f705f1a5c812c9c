//! ROC/AUC and thresholded accuracy over scored pairs. Pure aggregation, no I/O.

use crate::error::Result;
use crate::model::{similarity, EmbeddingNetwork};
use crate::pairs::{Pair, PairLabel};
use serde::{Deserialize, Serialize};

/// Similarity assigned to one pair, with its true label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    pub similarity: f32,
    pub distance: f32,
    pub label: PairLabel,
}

impl ScoredPair {
    pub fn new(similarity: f32, label: PairLabel) -> Self {
        Self {
            similarity,
            distance: f32::NAN,
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Scores `>= threshold` are predicted genuine
    pub threshold: f32,
    pub fpr: f32,
    pub tpr: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Thresholds walk every distinct score from high to low, starting at `+inf` (0, 0).
    pub fn from_scores(scored: &[ScoredPair]) -> Self {
        let positives = scored.iter().filter(|s| s.label.is_genuine()).count() as f32;
        let negatives = scored.len() as f32 - positives;
        let rate = |n: usize, total: f32| if total > 0.0 { n as f32 / total } else { 0.0 };

        let mut sorted: Vec<&ScoredPair> = scored.iter().collect();
        sorted.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let mut points = vec![RocPoint {
            threshold: f32::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        }];
        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;
        while i < sorted.len() {
            let threshold = sorted[i].similarity;
            while i < sorted.len() && sorted[i].similarity.total_cmp(&threshold).is_eq() {
                if sorted[i].label.is_genuine() {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                threshold,
                fpr: rate(fp, negatives),
                tpr: rate(tp, positives),
            });
        }
        Self { points }
    }

    /// Trapezoidal area. Only meaningful when both classes were present.
    pub fn area(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| {
                let (a, b) = (w[0], w[1]);
                f64::from(b.fpr - a.fpr) * f64::from(b.tpr + a.tpr) / 2.0
            })
            .sum::<f64>() as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub pairs: usize,
    pub genuine: usize,
    pub impostor: usize,
    /// `None` unless both classes are present
    pub auc: Option<f32>,
    pub threshold: f32,
    /// Share of pairs whose `similarity >= threshold` agrees with the label; 0 for an empty set
    pub accuracy: f32,
    pub true_accepts: usize,
    pub false_accepts: usize,
    pub true_rejects: usize,
    pub false_rejects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_genuine_distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_impostor_distance: Option<f32>,
    #[serde(skip)]
    pub roc: RocCurve,
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, n) = values.fold((0.0f64, 0usize), |(s, n), v| (s + f64::from(v), n + 1));
    (n > 0).then(|| (sum / n as f64) as f32)
}

pub struct Evaluator {
    threshold: f32,
}

impl Evaluator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score pairs with a loaded network. Both sides go through the same encoder instance.
    pub fn score(network: &EmbeddingNetwork, pairs: &[Pair<'_>]) -> Result<Vec<ScoredPair>> {
        pairs
            .iter()
            .map(|p| {
                let d = network.distance(p.left, p.right)?;
                Ok(ScoredPair {
                    similarity: similarity(d),
                    distance: d,
                    label: p.label,
                })
            })
            .collect()
    }

    pub fn evaluate(&self, scored: &[ScoredPair]) -> EvaluationReport {
        let genuine = scored.iter().filter(|s| s.label.is_genuine()).count();
        let impostor = scored.len() - genuine;
        let roc = RocCurve::from_scores(scored);
        let auc = (genuine > 0 && impostor > 0).then(|| roc.area());

        let (mut ta, mut fa, mut tr, mut fr) = (0, 0, 0, 0);
        for s in scored {
            match (s.similarity >= self.threshold, s.label.is_genuine()) {
                (true, true) => ta += 1,
                (true, false) => fa += 1,
                (false, false) => tr += 1,
                (false, true) => fr += 1,
            }
        }
        let accuracy = if scored.is_empty() {
            0.0
        } else {
            (ta + tr) as f32 / scored.len() as f32
        };

        let finite = |label: PairLabel| {
            scored
                .iter()
                .filter(move |s| s.label == label && s.distance.is_finite())
                .map(|s| s.distance)
        };

        EvaluationReport {
            pairs: scored.len(),
            genuine,
            impostor,
            auc,
            threshold: self.threshold,
            accuracy,
            true_accepts: ta,
            false_accepts: fa,
            true_rejects: tr,
            false_rejects: fr,
            mean_genuine_distance: mean(finite(PairLabel::Genuine)),
            mean_impostor_distance: mean(finite(PairLabel::Impostor)),
            roc,
        }
    }
}
