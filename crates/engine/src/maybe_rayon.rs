//! Per-index fan-out on rayon's global pool, or in order when the
//! `parallel` feature is off.

use crate::index::VegetationIndex;

/// Apply `f` to every index, preserving input order in the output.
///
/// Runs on rayon only when `parallel` is set and there is more than one index.
#[cfg(feature = "parallel")]
pub(crate) fn map_indices<R, F>(indices: &[VegetationIndex], parallel: bool, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(VegetationIndex) -> R + Sync + Send,
{
    use rayon::prelude::*;

    if parallel && indices.len() > 1 {
        indices.par_iter().map(|index| f(*index)).collect()
    } else {
        indices.iter().map(|index| f(*index)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indices<R, F>(indices: &[VegetationIndex], _parallel: bool, f: F) -> Vec<R>
where
    F: Fn(VegetationIndex) -> R,
{
    indices.iter().map(|index| f(*index)).collect()
}
