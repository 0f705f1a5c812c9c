//! Parameter-free distance/similarity head.

use ndarray::Array1;

/// L2 norm of `a - b`. Exactly 0.0 for identical embeddings, symmetric in its arguments.
pub fn euclidean(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `sigmoid(-distance)`: 0.5 at distance 0, decreasing towards 0 as distance grows.
/// 1.0 is never reached.
pub fn similarity(distance: f32) -> f32 {
    sigmoid(-distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn zero_distance_is_half_similarity() {
        assert_eq!(similarity(0.0), 0.5);
    }

    #[test]
    fn similarity_decreases_with_distance() {
        assert!(similarity(0.1) < 0.5);
        assert!(similarity(2.0) < similarity(1.0));
        assert!(similarity(10.0) > 0.0);
    }

    #[test]
    fn euclidean_matches_hand_computed() {
        let a = array![0.0, 3.0];
        let b = array![4.0, 0.0];
        assert_eq!(euclidean(&a, &b), 5.0);
        assert_eq!(euclidean(&b, &a), 5.0);
        assert_eq!(euclidean(&a, &a), 0.0);
    }
}
