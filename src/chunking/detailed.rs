//! Detailed (level 1) chunking.
//!
//! Accumulates raw transcript segments into token-bounded chunks in a single
//! left-to-right pass, carrying a token-budgeted tail of whole segments into
//! the next chunk as overlap.

use super::{estimate_tokens, Chunk, ChunkLevel, DetailedChunkingConfig, VideoContext};
use crate::transcript::TranscriptSegment;

/// Chunk raw segments into detailed chunks.
///
/// Emits exactly one chunk for a single-segment transcript or when the whole
/// transcript fits under `min_tokens`; otherwise finalizes a chunk when it
/// reaches the target, runs out of segments, or would overflow the max bound
/// with the next segment appended.
pub fn chunk_segments(
    segments: &[TranscriptSegment],
    context: &VideoContext,
    config: &DetailedChunkingConfig,
) -> Vec<Chunk> {
    if segments.is_empty() {
        return Vec::new();
    }

    let total_tokens: usize = segments.iter().map(|s| estimate_tokens(&s.text)).sum();
    if segments.len() == 1 || total_tokens <= config.min_tokens {
        return vec![merge(&segments.iter().collect::<Vec<_>>(), 0, context)];
    }

    let overlap_budget =
        (config.target_tokens as f64 * config.overlap_percentage).floor() as usize;

    let mut chunks = Vec::new();
    let mut buffer: Vec<&TranscriptSegment> = Vec::new();
    let mut buffer_tokens = 0usize;

    for (i, seg) in segments.iter().enumerate() {
        buffer.push(seg);
        buffer_tokens += estimate_tokens(&seg.text);

        let is_last = i + 1 == segments.len();
        let next_tokens = segments
            .get(i + 1)
            .map(|s| estimate_tokens(&s.text))
            .unwrap_or(0);

        let finalize = buffer_tokens >= config.target_tokens
            || is_last
            || (buffer_tokens >= config.min_tokens
                && buffer_tokens + next_tokens > config.max_tokens);

        if finalize {
            chunks.push(merge(&buffer, chunks.len() as u32, context));

            if is_last {
                buffer.clear();
                buffer_tokens = 0;
            } else {
                let (overlap, overlap_tokens) = overlap_tail(&buffer, overlap_budget);
                buffer = overlap;
                buffer_tokens = overlap_tokens;
            }
        }
    }

    chunks
}

/// Collect whole segments from the end of a finalized buffer while their
/// cumulative estimated tokens stay within the overlap budget.
fn overlap_tail<'a>(
    buffer: &[&'a TranscriptSegment],
    budget: usize,
) -> (Vec<&'a TranscriptSegment>, usize) {
    let mut tail = Vec::new();
    let mut tokens = 0usize;

    for seg in buffer.iter().rev() {
        let seg_tokens = estimate_tokens(&seg.text);
        if tokens + seg_tokens > budget {
            break;
        }
        tail.push(*seg);
        tokens += seg_tokens;
    }

    tail.reverse();
    (tail, tokens)
}

fn merge(buffer: &[&TranscriptSegment], chunk_index: u32, context: &VideoContext) -> Chunk {
    let text = buffer
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let start = buffer.first().map(|s| s.start).unwrap_or(0.0);
    let end = buffer.last().map(|s| s.end()).unwrap_or(start);

    Chunk {
        text,
        start,
        end,
        duration: end - start,
        segment_count: buffer.len(),
        chunk_index,
        level: ChunkLevel::Detailed,
        user_id: context.user_id.clone(),
        video_id: context.video_id.clone(),
        video_title: context.video_title.clone(),
        language: context.language.clone(),
    }
}
