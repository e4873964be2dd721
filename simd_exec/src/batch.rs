//! Runs independent execution contexts over a long sample buffer.
//!
//! The buffer is cut into lane-count batches processed on rayon workers.
//! Each worker owns one [`SimdContext`] and reuses it for every batch it
//! picks up; tables and linked built-ins captured by the closure are only
//! read.

use rayon::prelude::*;
use tracing::debug;

use crate::context::SimdContext;
use crate::mask::LaneMask;

/// One lane-count window of the sample buffer.
#[derive(Debug)]
pub struct Batch<'a, T> {
    /// Position of `samples[0]` in the whole buffer.
    pub offset: usize,
    pub samples: &'a mut [T],
    /// `AllActive` for full batches; the trailing partial batch has only its
    /// occupied lanes active.
    pub mask: LaneMask,
}

/// Calls `f` once per batch of `lane_count` samples, in parallel.
pub fn for_each_batch<T, F>(samples: &mut [T], lane_count: usize, f: F)
where
    T: Send,
    F: Fn(&mut SimdContext, Batch<'_, T>) + Send + Sync,
{
    assert!(lane_count > 0, "lane count must be positive");
    debug!(
        samples = samples.len(),
        lane_count,
        batches = samples.len().div_ceil(lane_count),
        "running batches"
    );

    samples
        .par_chunks_mut(lane_count)
        .enumerate()
        .for_each_init(
            || SimdContext::new(lane_count),
            |ctx, (index, chunk)| {
                let mask = LaneMask::prefix(lane_count, chunk.len());
                f(
                    ctx,
                    Batch {
                        offset: index * lane_count,
                        samples: chunk,
                        mask,
                    },
                );
                debug_assert!(
                    ctx.stack().is_empty(),
                    "batch at {} left registers on the stack",
                    index * lane_count
                );
            },
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn partial_batch_gets_prefix_mask() {
        let mut samples: Vec<usize> = vec![0; 10];
        let partial = AtomicUsize::new(0);

        for_each_batch(&mut samples, 4, |ctx, batch| {
            assert_eq!(ctx.lane_count(), 4);
            if batch.samples.len() < 4 {
                partial.fetch_add(1, Ordering::Relaxed);
                assert_eq!(batch.mask, LaneMask::prefix(4, 2));
            } else {
                assert_eq!(batch.mask, LaneMask::AllActive);
            }
            for (i, sample) in batch.samples.iter_mut().enumerate() {
                *sample = batch.offset + i;
            }
        });

        assert_eq!(partial.load(Ordering::Relaxed), 1);
        assert_eq!(samples, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn empty_buffer_runs_nothing() {
        let mut samples: Vec<f32> = Vec::new();
        for_each_batch(&mut samples, 8, |_, _| panic!("no batches expected"));
    }
}
