use pairgraph_core::DescriptorMatrix;

/// One ranked nearest-neighbor candidate for a query feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub train_idx: u32,
    pub distance: f32,
}

/// Matcher capability consumed by the pair scheduler.
///
/// For every row of `query`, return its `k` nearest rows of `train`,
/// closest first. A train set with fewer than `k` rows yields an empty
/// result, since no candidate list could be ranked meaningfully.
pub trait Matcher: Sync {
    fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> Vec<Vec<Neighbor>>;
}

/// Baseline exhaustive L2 matcher. Quadratic per pair, but exact and
/// dependency-free; a FLANN-style index can be plugged in through the
/// `Matcher` trait instead.
#[derive(Debug, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    pub fn new() -> Self {
        Self
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

impl Matcher for BruteForceMatcher {
    fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> Vec<Vec<Neighbor>> {
        if k == 0 || train.rows() < k {
            return Vec::new();
        }

        (0..query.rows())
            .map(|qi| {
                let q = query.row(qi);
                let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
                for ti in 0..train.rows() {
                    let neighbor = Neighbor {
                        train_idx: ti as u32,
                        distance: l2_distance(q, train.row(ti)),
                    };
                    let pos = best
                        .iter()
                        .position(|n| neighbor.distance < n.distance)
                        .unwrap_or(best.len());
                    best.insert(pos, neighbor);
                    best.truncate(k);
                }
                best
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairgraph_core::DESCRIPTOR_WIDTH;

    fn create_descriptor(value: f32) -> Vec<f32> {
        vec![value; DESCRIPTOR_WIDTH]
    }

    fn create_matrix(values: &[f32]) -> DescriptorMatrix {
        let mut m = DescriptorMatrix::new();
        for &v in values {
            m.push_row(&create_descriptor(v));
        }
        m
    }

    #[test]
    fn test_two_nearest_are_ranked() {
        let query = create_matrix(&[0.0]);
        let train = create_matrix(&[10.0, 1.0, 5.0]);
        let knn = BruteForceMatcher::new().knn_match(&query, &train, 2);
        assert_eq!(knn.len(), 1);
        assert_eq!(knn[0].len(), 2);
        assert_eq!(knn[0][0].train_idx, 1);
        assert_eq!(knn[0][1].train_idx, 2);
        assert!(knn[0][0].distance <= knn[0][1].distance);
    }

    #[test]
    fn test_distance_is_l2() {
        let query = create_matrix(&[0.0]);
        let train = create_matrix(&[2.0, 3.0]);
        let knn = BruteForceMatcher::new().knn_match(&query, &train, 2);
        let expected = (DESCRIPTOR_WIDTH as f32).sqrt() * 2.0;
        assert!((knn[0][0].distance - expected).abs() < 1e-3);
    }

    #[test]
    fn test_train_smaller_than_k_yields_empty() {
        let query = create_matrix(&[0.0, 1.0]);
        let train = create_matrix(&[0.0]);
        let knn = BruteForceMatcher::new().knn_match(&query, &train, 2);
        assert!(knn.is_empty());
    }

    #[test]
    fn test_empty_query_yields_empty() {
        let query = DescriptorMatrix::new();
        let train = create_matrix(&[0.0, 1.0]);
        let knn = BruteForceMatcher::new().knn_match(&query, &train, 2);
        assert!(knn.is_empty());
    }

    #[test]
    fn test_equal_distances_keep_lowest_index_first() {
        let query = create_matrix(&[0.0]);
        let train = create_matrix(&[4.0, 4.0, 4.0]);
        let knn = BruteForceMatcher::new().knn_match(&query, &train, 2);
        assert_eq!(knn[0][0].train_idx, 0);
        assert_eq!(knn[0][1].train_idx, 1);
    }
}
