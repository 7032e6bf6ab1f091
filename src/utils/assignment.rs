use itertools::Itertools;
use nalgebra::DMatrix;
use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;

const F32_I64_MULT: f32 = 1_000_000.0;

/// Result of one association round over a tracks x detections similarity matrix
///
#[derive(Debug, Clone, Default)]
pub struct AssignmentOutcome {
    /// matched (row, column) pairs
    pub matches: Vec<(usize, usize)>,
    /// rows that did not receive a column
    pub unmatched_rows: Vec<usize>,
    /// columns that did not receive a row
    pub unmatched_cols: Vec<usize>,
}

/// Bipartite assignment strategy.
///
/// Rows are tracks, columns are detections, cells hold the IoU similarity.
/// Pairs with similarity below `threshold` must never be part of the result,
/// whatever the strategy would otherwise prefer.
///
pub trait Assigner: Send + Sync {
    fn assign(&self, similarity: &DMatrix<f32>, threshold: f32) -> AssignmentOutcome;
    fn kind(&self) -> AssignerKind;
}

/// Strategy selector.
///
/// Both strategies are always compiled in, so the selection happens once at
/// construction time rather than per call:
/// * `Hungarian` - exact optimum (Kuhn-Munkres), the default;
/// * `Greedy` - deterministic approximation, may diverge from the optimum in
///   dense scenes; kept as the documented fallback.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignerKind {
    #[default]
    Hungarian,
    Greedy,
}

impl AssignerKind {
    pub fn build(&self) -> Box<dyn Assigner> {
        match self {
            AssignerKind::Hungarian => Box::new(HungarianAssigner),
            AssignerKind::Greedy => Box::new(GreedyAssigner),
        }
    }
}

fn collect_unmatched(outcome: &mut AssignmentOutcome, rows: usize, cols: usize) {
    outcome.unmatched_rows = (0..rows)
        .filter(|i| !outcome.matches.iter().any(|(mi, _)| mi == i))
        .collect();
    outcome.unmatched_cols = (0..cols)
        .filter(|j| !outcome.matches.iter().any(|(_, mj)| mj == j))
        .collect();
}

/// Exact solver on an augmented square-ish matrix.
///
/// Each row gets a private sink column carrying the threshold weight, so a row
/// prefers staying unassigned over taking a below-threshold detection; the
/// construction mirrors the diagonal trick of the Hungarian voting engine in
/// SORT trackers.
///
pub struct HungarianAssigner;

impl Assigner for HungarianAssigner {
    fn assign(&self, similarity: &DMatrix<f32>, threshold: f32) -> AssignmentOutcome {
        let (rows, cols) = (similarity.nrows(), similarity.ncols());
        let mut outcome = AssignmentOutcome::default();

        if rows == 0 || cols == 0 {
            collect_unmatched(&mut outcome, rows, cols);
            return outcome;
        }

        let mut weights = Matrix::new(rows, cols + rows, 0i64);
        for i in 0..rows {
            for j in 0..cols {
                let sim = similarity[(i, j)];
                if sim >= threshold {
                    *weights.get_mut((i, j)).unwrap() = (sim * F32_I64_MULT) as i64;
                }
            }
            *weights.get_mut((i, cols + i)).unwrap() = (threshold * F32_I64_MULT) as i64;
        }

        let (_, solution) = kuhn_munkres(&weights);

        outcome.matches = solution
            .into_iter()
            .enumerate()
            .filter(|&(i, j)| j < cols && similarity[(i, j)] >= threshold)
            .collect();

        collect_unmatched(&mut outcome, rows, cols);
        outcome
    }

    fn kind(&self) -> AssignerKind {
        AssignerKind::Hungarian
    }
}

/// Deterministic greedy matcher: candidate pairs sorted by similarity
/// descending (ties broken by indices), rows and columns consumed first come
/// first served.
///
pub struct GreedyAssigner;

impl Assigner for GreedyAssigner {
    fn assign(&self, similarity: &DMatrix<f32>, threshold: f32) -> AssignmentOutcome {
        let (rows, cols) = (similarity.nrows(), similarity.ncols());
        let mut outcome = AssignmentOutcome::default();

        let candidates = (0..rows)
            .cartesian_product(0..cols)
            .filter(|&(i, j)| similarity[(i, j)] >= threshold)
            .sorted_by(|&(ai, aj), &(bi, bj)| {
                similarity[(bi, bj)]
                    .partial_cmp(&similarity[(ai, aj)])
                    .unwrap()
                    .then_with(|| ai.cmp(&bi))
                    .then_with(|| aj.cmp(&bj))
            })
            .collect::<Vec<_>>();

        let mut used_rows = vec![false; rows];
        let mut used_cols = vec![false; cols];
        for (i, j) in candidates {
            if !used_rows[i] && !used_cols[j] {
                used_rows[i] = true;
                used_cols[j] = true;
                outcome.matches.push((i, j));
            }
        }

        collect_unmatched(&mut outcome, rows, cols);
        outcome
    }

    fn kind(&self) -> AssignerKind {
        AssignerKind::Greedy
    }
}
