//! Thematic (level 2) chunking.
//!
//! Groups detailed chunks into minutes-scale chunks using duration windows
//! banded by total video length. Videos under fifteen minutes produce no
//! thematic chunks.

use super::{Chunk, ChunkLevel, VideoContext};

/// Minimum video duration for thematic chunking, in seconds.
pub const THEMATIC_MIN_VIDEO_SECONDS: f64 = 900.0;

/// Duration window for thematic grouping, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThematicWindow {
    /// Smallest intended group duration for this band.
    pub min_duration: f64,
    /// Hard ceiling a group may not grow past.
    pub max_duration: f64,
    /// Duration at which a group becomes eligible for early finalization.
    pub target_duration: f64,
}

/// Select the thematic window for a video's total duration.
///
/// Returns `None` for videos under fifteen minutes.
pub fn window_for_duration(video_seconds: f64) -> Option<ThematicWindow> {
    if video_seconds < THEMATIC_MIN_VIDEO_SECONDS {
        return None;
    }

    let window = if video_seconds < 1800.0 {
        ThematicWindow {
            min_duration: 120.0,
            max_duration: 240.0,
            target_duration: 180.0,
        }
    } else if video_seconds < 3600.0 {
        ThematicWindow {
            min_duration: 180.0,
            max_duration: 360.0,
            target_duration: 270.0,
        }
    } else if video_seconds < 7200.0 {
        ThematicWindow {
            min_duration: 300.0,
            max_duration: 600.0,
            target_duration: 450.0,
        }
    } else {
        ThematicWindow {
            min_duration: 600.0,
            max_duration: 1200.0,
            target_duration: 900.0,
        }
    };

    Some(window)
}

/// Group detailed chunks into thematic chunks.
///
/// Greedy left-to-right accumulation by duration: a group is finalized when it
/// holds the last detailed chunk, when adding the next chunk would exceed the
/// window's maximum, or when the group has reached the target duration and the
/// next chunk plus one peeked further would exceed the maximum. When no
/// further chunk exists the peek contributes zero. No overlap between groups.
pub fn chunk_detailed(
    detailed: &[Chunk],
    video_seconds: f64,
    context: &VideoContext,
) -> Vec<Chunk> {
    let Some(window) = window_for_duration(video_seconds) else {
        return Vec::new();
    };
    if detailed.is_empty() {
        return Vec::new();
    }

    let mut groups = Vec::new();
    let mut group: Vec<&Chunk> = Vec::new();

    for (i, chunk) in detailed.iter().enumerate() {
        group.push(chunk);

        let span = group_span(&group);
        let is_last = i + 1 == detailed.len();
        let next_duration = detailed.get(i + 1).map(|c| c.duration).unwrap_or(0.0);
        let peek_duration = detailed.get(i + 2).map(|c| c.duration).unwrap_or(0.0);

        let finalize = is_last
            || span + next_duration > window.max_duration
            || (span >= window.target_duration
                && span + next_duration + peek_duration > window.max_duration);

        if finalize {
            groups.push(merge_group(&group, groups.len() as u32, context));
            group.clear();
        }
    }

    groups
}

fn group_span(group: &[&Chunk]) -> f64 {
    match (group.first(), group.last()) {
        (Some(first), Some(last)) => last.end - first.start,
        _ => 0.0,
    }
}

fn merge_group(group: &[&Chunk], chunk_index: u32, context: &VideoContext) -> Chunk {
    let text = group
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let start = group.first().map(|c| c.start).unwrap_or(0.0);
    let end = group.last().map(|c| c.end).unwrap_or(start);

    Chunk {
        text,
        start,
        end,
        duration: end - start,
        segment_count: group.iter().map(|c| c.segment_count).sum(),
        chunk_index,
        level: ChunkLevel::Thematic,
        user_id: context.user_id.clone(),
        video_id: context.video_id.clone(),
        video_title: context.video_title.clone(),
        language: context.language.clone(),
    }
}
