//! Chunked fan-out for long inputs.
//!
//! Inputs larger than a provider's `max_char_buffer` are split into
//! overlapping spans and processed by a bounded pool of workers.
//! Results are merged in chunk-index order, so output ordering is
//! deterministic regardless of which worker finishes first.

use crate::{Error, Result};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Characters shared between adjacent chunks so relationships spanning
/// a boundary are seen by both sides.
pub const CHUNK_OVERLAP_CHARS: usize = 200;

/// Splits text into chunks of at most `max_chars` characters with
/// `overlap` characters shared between neighbors.
///
/// Splits are made on `char` boundaries. Text at or under the limit is
/// returned as a single chunk.
#[must_use]
pub fn split_into_chunks(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let char_count = text.chars().count();
    if max_chars == 0 || char_count <= max_chars {
        return vec![text.to_string()];
    }

    // Byte offset of every char boundary, plus the end of the text.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());

    let step = max_chars.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + max_chars).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }
    chunks
}

/// Runs `f` over every chunk with at most `max_workers` concurrent
/// workers, returning results in chunk-index order.
///
/// Workers pull the next unprocessed index from a shared counter, so
/// the pool stays busy even when chunk latencies vary.
pub fn map_chunks<T, F>(chunks: &[String], max_workers: usize, f: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(usize, &str) -> Result<T> + Sync,
{
    let workers = max_workers.max(1).min(chunks.len());
    if workers <= 1 {
        return chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| f(i, chunk))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<Result<T>>>> =
        Mutex::new((0..chunks.len()).map(|_| None).collect());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= chunks.len() {
                        break;
                    }
                    let result = f(index, &chunks[index]);
                    if let Ok(mut guard) = slots.lock() {
                        guard[index] = Some(result);
                    }
                }
            });
        }
    });

    slots
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .into_iter()
        .map(|slot| {
            slot.map_or_else(
                || {
                    Err(Error::Transport {
                        operation: "chunk_fanout".to_string(),
                        cause: "worker terminated before producing a result".to_string(),
                    })
                },
                |result| result,
            )
        })
        .collect()
}
