use pairgraph_core::{
    PairwiseMatching, PipelineConfig, ProgressSink, TwoViewMatching, Viewport,
};
use rayon::prelude::*;

use crate::filter::ratio_filter;
use crate::matcher::Matcher;

/// All unordered index pairs `(i, j)` with `i < j`, in row-major order:
/// ascending `i`, then ascending `j`. This is the canonical task order
/// and the order of the resulting matching records.
pub fn pair_tasks(view_count: usize) -> Vec<(u32, u32)> {
    let mut tasks = Vec::with_capacity(view_count * view_count.saturating_sub(1) / 2);
    for i in 0..view_count {
        for j in i + 1..view_count {
            tasks.push((i as u32, j as u32));
        }
    }
    tasks
}

/// Matching phase: run every pair task on the Rayon pool, ratio-filter
/// the raw candidates, and keep only pairs with at least
/// `cfg.min_pair_matches` surviving correspondences.
///
/// Each task reads two immutable descriptor matrices and produces its
/// own result slot; collection iterates slots in task order, so output
/// never depends on worker completion order.
pub fn match_all_pairs<M: Matcher>(
    viewports: &[Viewport],
    matcher: &M,
    cfg: &PipelineConfig,
    progress: &dyn ProgressSink,
) -> PairwiseMatching {
    let tasks = pair_tasks(viewports.len());
    let per_pair: Vec<Option<TwoViewMatching>> = tasks
        .par_iter()
        .map(|&(i, j)| {
            let record = match_one_pair(viewports, i, j, matcher, cfg);
            progress.advance();
            record
        })
        .collect();

    let matching: PairwiseMatching = per_pair.into_iter().flatten().collect();
    log::debug!("{} of {} pairs retained", matching.len(), tasks.len());
    matching
}

fn match_one_pair<M: Matcher>(
    viewports: &[Viewport],
    i: u32,
    j: u32,
    matcher: &M,
    cfg: &PipelineConfig,
) -> Option<TwoViewMatching> {
    let query = &viewports[i as usize].descriptors;
    let train = &viewports[j as usize].descriptors;

    // A view with fewer than 2 features cannot support the ratio test;
    // such pairs yield no matches rather than an error.
    let good = if query.rows() < 2 || train.rows() < 2 {
        Vec::new()
    } else {
        ratio_filter(&matcher.knn_match(query, train, 2), cfg.ratio_threshold)
    };

    if good.len() >= cfg.min_pair_matches {
        Some(TwoViewMatching {
            view_1_id: i,
            view_2_id: j,
            matches: good,
        })
    } else {
        None
    }
}
