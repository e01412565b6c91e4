//! Batch partitioning.
//!
//! Splits a work list into at most `chunk_count` contiguous chunks of
//! near-equal size. With `len = q * chunk_count + r`, the first `r` chunks
//! get `q + 1` items and the rest get `q`. Order is preserved and empty
//! chunks are dropped, so fewer orders than chunks simply yields fewer
//! sessions.

/// Partition `items` into at most `chunk_count` contiguous chunks.
///
/// # Panics
///
/// Panics if `chunk_count` is zero; [`crate::core::Config`] validation
/// rejects that before a run starts.
pub fn partition<T>(items: Vec<T>, chunk_count: usize) -> Vec<Vec<T>> {
    assert!(chunk_count > 0, "chunk_count must be at least 1");

    let len = items.len();
    if len == 0 {
        return Vec::new();
    }

    let base = len / chunk_count;
    let remainder = len % chunk_count;

    let mut chunks = Vec::with_capacity(chunk_count.min(len));
    let mut items = items.into_iter();
    for index in 0..chunk_count {
        let take = base + usize::from(index < remainder);
        if take == 0 {
            break;
        }
        chunks.push(items.by_ref().take(take).collect());
    }
    chunks
}
