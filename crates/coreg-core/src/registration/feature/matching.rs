use rayon::prelude::*;

use super::descriptor::{euclidean_distance, hamming_distance, Descriptors};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    pub query: usize,
    pub train: usize,
    pub distance: f64,
}

/// Nearest-neighbour matching from `query` into `train` with Lowe's ratio
/// test: a match is kept when its distance is below `ratio` times the
/// distance to the second-best candidate. Mismatched descriptor kinds
/// produce no matches.
pub fn match_descriptors(query: &Descriptors, train: &Descriptors, ratio: f64) -> Vec<Match> {
    match (query, train) {
        (Descriptors::Binary(q), Descriptors::Binary(t)) => {
            ratio_matches(q, t, ratio, |a, b| hamming_distance(a, b) as f64)
        }
        (Descriptors::Patch(q), Descriptors::Patch(t)) => {
            ratio_matches(q, t, ratio, |a, b| euclidean_distance(a, b) as f64)
        }
        _ => Vec::new(),
    }
}

fn ratio_matches<D, F>(query: &[D], train: &[D], ratio: f64, distance: F) -> Vec<Match>
where
    D: Sync,
    F: Fn(&D, &D) -> f64 + Sync,
{
    query
        .par_iter()
        .enumerate()
        .filter_map(|(qi, q)| {
            let mut best = f64::INFINITY;
            let mut second = f64::INFINITY;
            let mut best_idx = 0;
            for (ti, t) in train.iter().enumerate() {
                let d = distance(q, t);
                if d < best {
                    second = best;
                    best = d;
                    best_idx = ti;
                } else if d < second {
                    second = d;
                }
            }
            (best.is_finite() && best < ratio * second).then_some(Match {
                query: qi,
                train: best_idx,
                distance: best,
            })
        })
        .collect()
}
