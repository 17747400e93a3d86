use pairgraph_core::CorrespondenceIndex;

use crate::matcher::Neighbor;

/// Lowe ratio test over raw 2-NN candidate lists. A candidate survives
/// only if its best distance is STRICTLY below `ratio` times the
/// second-best distance; equal distances are rejected.
pub fn ratio_filter(knn: &[Vec<Neighbor>], ratio: f32) -> Vec<CorrespondenceIndex> {
    let mut good = Vec::new();
    for (query_idx, candidates) in knn.iter().enumerate() {
        if let [best, second, ..] = candidates.as_slice() {
            if best.distance < ratio * second.distance {
                good.push((query_idx as u32, best.train_idx));
            }
        }
    }
    good
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_knn(pairs: &[(f32, f32)]) -> Vec<Vec<Neighbor>> {
        pairs
            .iter()
            .map(|&(best, second)| {
                vec![
                    Neighbor {
                        train_idx: 7,
                        distance: best,
                    },
                    Neighbor {
                        train_idx: 8,
                        distance: second,
                    },
                ]
            })
            .collect()
    }

    #[test]
    fn test_decisive_match_kept() {
        let good = ratio_filter(&create_knn(&[(1.0, 10.0)]), 0.7);
        assert_eq!(good, vec![(0, 7)]);
    }

    #[test]
    fn test_ambiguous_match_dropped() {
        let good = ratio_filter(&create_knn(&[(9.0, 10.0)]), 0.7);
        assert!(good.is_empty());
    }

    #[test]
    fn test_boundary_is_strict() {
        // best == ratio * second is rejected, not kept
        let good = ratio_filter(&create_knn(&[(7.0, 10.0)]), 0.7);
        assert!(good.is_empty());
        let good = ratio_filter(&create_knn(&[(6.999, 10.0)]), 0.7);
        assert_eq!(good.len(), 1);
    }

    #[test]
    fn test_equal_distances_rejected() {
        let good = ratio_filter(&create_knn(&[(5.0, 5.0)]), 0.7);
        assert!(good.is_empty());
    }

    #[test]
    fn test_query_indices_preserved() {
        let good = ratio_filter(&create_knn(&[(9.0, 10.0), (1.0, 10.0), (2.0, 10.0)]), 0.7);
        assert_eq!(good, vec![(1, 7), (2, 7)]);
    }

    #[test]
    fn test_single_candidate_list_dropped() {
        let knn = vec![vec![Neighbor {
            train_idx: 0,
            distance: 1.0,
        }]];
        assert!(ratio_filter(&knn, 0.7).is_empty());
    }
}
