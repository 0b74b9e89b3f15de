//! Story concatenator: joins an ordered list of clips into one story file.
//!
//! Every clip is normalized (when needed) and duration-reconciled into a
//! scratch directory before the join. The concat itself re-encodes rather
//! than stream-copies: even normalized clips can disagree on encoder details
//! such as keyframe placement, and stream-copy concat across such boundaries
//! produces desynchronized or unplayable output.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::info;

use crate::error::{StoryReelError, StoryReelResult};
use crate::ffmpeg::{ensure_parent_dir, ffmpeg_cmd, replace_file, run_tool};
use crate::{normalize, reconcile};

/// Normalize `clip` if needed, then reconcile its duration into
/// `processed_<index>.mp4` under `scratch`. The index preserves input order
/// and is the sole ordering key for the join.
pub fn normalize_and_reconcile(
    clip: &Path,
    index: usize,
    scratch: &Path,
) -> StoryReelResult<PathBuf> {
    let normalized = normalize::normalize(clip, &scratch.join(format!("fixed_{index}.mp4")))?;
    reconcile::reconcile(&normalized, &scratch.join(format!("processed_{index}.mp4")))
}

/// Concatenate `clips` in order into `out`.
///
/// A pre-existing `out` is deleted first: a re-run always produces a fresh
/// artifact, never appends. All scratch files are removed whether the join
/// succeeds or fails.
pub fn concatenate(clips: &[PathBuf], out: &Path) -> StoryReelResult<PathBuf> {
    if clips.is_empty() {
        return Err(StoryReelError::validation(
            "concatenation requires at least one clip",
        ));
    }
    // Catch unrendered scenes here, not as a confusing ffmpeg failure later.
    for clip in clips {
        if !clip.exists() {
            return Err(StoryReelError::asset_missing(format!(
                "clip not found: {}",
                clip.display()
            )));
        }
    }
    if out.exists() {
        std::fs::remove_file(out)
            .with_context(|| format!("failed to remove stale output '{}'", out.display()))?;
    }

    let scratch = tempfile::tempdir().context("failed to create concat scratch directory")?;
    info!(clips = clips.len(), out = %out.display(), "concatenating story");

    let mut processed = Vec::with_capacity(clips.len());
    for (index, clip) in clips.iter().enumerate() {
        processed.push(normalize_and_reconcile(clip, index, scratch.path())?);
    }

    let list_path = scratch.path().join("video_list.txt");
    std::fs::write(&list_path, reference_list(&processed))
        .with_context(|| format!("failed to write concat list '{}'", list_path.display()))?;

    let staged = scratch.path().join("story.mp4");
    let mut cmd = ffmpeg_cmd();
    cmd.args(["-f", "concat", "-safe", "0", "-i"]).arg(&list_path);
    cmd.args([
        "-c:v",
        "libx264",
        "-preset",
        "fast",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-movflags",
        "+faststart",
    ])
    .arg(&staged);
    run_tool(cmd, "ffmpeg concatenation")?;

    ensure_parent_dir(out)?;
    replace_file(&staged, out)?;
    Ok(out.to_path_buf())
}

/// One `file '<path>'` line per clip, in input order, with separators
/// normalized for ffmpeg's concat demuxer parser.
fn reference_list(clips: &[PathBuf]) -> String {
    let mut list = String::new();
    for clip in clips {
        let entry = clip.display().to_string().replace('\\', "/");
        list.push_str(&format!("file '{entry}'\n"));
    }
    list
}
