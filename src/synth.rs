//! Scene video synthesizer: one image (or an ordered frame sequence) plus a
//! narration track become a single playable clip.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{debug, info};

use crate::error::{StoryReelError, StoryReelResult};
use crate::ffmpeg::{ensure_parent_dir, ffmpeg_cmd, replace_file, run_assembly_script, run_tool};

/// One caller-supplied animation frame, as encoded raster bytes (PNG, JPEG,
/// anything the `image` crate decodes).
#[derive(Clone)]
pub struct FrameImage {
    pub bytes: Vec<u8>,
}

/// How a scene moves. A tagged variant rather than a pair of optional fields,
/// so callers cannot supply both an effect expression and a frame sequence.
#[derive(Clone)]
pub enum SceneMotion {
    /// Render the still image unmodified for the length of the narration.
    Still,
    /// Apply an ffmpeg video filtergraph expression to the looped still.
    Effect(String),
    /// Caller-driven multi-frame assembly: the frames and base assets are
    /// materialized into a scratch workspace and `script` runs there. The
    /// script must leave `<scene_id>_multiframe.mp4` in the workspace.
    FrameSequence {
        frames: Vec<FrameImage>,
        script: String,
    },
}

/// Synthesize a scene clip at `out`.
///
/// Still/effect clips end exactly when the narration ends (`-shortest`
/// against an infinitely looped image). True inter-stream length matching for
/// multi-clip stories happens later, in the duration reconciler.
pub fn synthesize(
    scene_id: &str,
    image: &Path,
    narration: &Path,
    motion: &SceneMotion,
    out: &Path,
) -> StoryReelResult<PathBuf> {
    if !image.exists() {
        return Err(StoryReelError::asset_missing(format!(
            "image file not found: {}",
            image.display()
        )));
    }
    if !narration.exists() {
        return Err(StoryReelError::asset_missing(format!(
            "narration file not found: {}",
            narration.display()
        )));
    }

    match motion {
        SceneMotion::Still => synthesize_still(scene_id, image, narration, None, out),
        SceneMotion::Effect(expr) => synthesize_still(scene_id, image, narration, Some(expr), out),
        SceneMotion::FrameSequence { frames, script } => {
            synthesize_multi_frame(scene_id, image, narration, frames, script, out)
        }
    }
}

fn synthesize_still(
    scene_id: &str,
    image: &Path,
    narration: &Path,
    effect: Option<&str>,
    out: &Path,
) -> StoryReelResult<PathBuf> {
    info!(scene_id, effect = effect.is_some(), "synthesizing still-image clip");

    let scratch = tempfile::tempdir().context("failed to create synth scratch workspace")?;
    let staged = scratch.path().join(format!("{scene_id}.mp4"));

    let mut cmd = ffmpeg_cmd();
    cmd.args(["-loop", "1", "-i"]).arg(image);
    cmd.arg("-i").arg(narration);
    if let Some(expr) = effect {
        cmd.args(["-vf", expr]);
    }
    cmd.args([
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-profile:v",
        "high",
        "-level",
        "4.0",
        "-pix_fmt",
        "yuv420p",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-shortest",
        "-movflags",
        "+faststart",
    ])
    .arg(&staged);
    run_tool(cmd, "ffmpeg clip synthesis")?;

    ensure_parent_dir(out)?;
    replace_file(&staged, out)?;
    Ok(out.to_path_buf())
}

fn synthesize_multi_frame(
    scene_id: &str,
    image: &Path,
    narration: &Path,
    frames: &[FrameImage],
    script: &str,
    out: &Path,
) -> StoryReelResult<PathBuf> {
    if frames.is_empty() {
        return Err(StoryReelError::validation(
            "multi-frame synthesis requires at least one frame image",
        ));
    }

    // The workspace and everything in it is removed on both exit paths when
    // the TempDir drops.
    let workspace = tempfile::tempdir().context("failed to create multi-frame workspace")?;
    info!(
        scene_id,
        frames = frames.len(),
        workspace = %workspace.path().display(),
        "synthesizing multi-frame clip"
    );

    for (idx, frame) in frames.iter().enumerate() {
        let n = idx + 1;
        let decoded = image::load_from_memory(&frame.bytes).map_err(|e| {
            StoryReelError::validation(format!("frame {n} could not be decoded: {e}"))
        })?;
        let frame_path = workspace.path().join(format!("frame_{scene_id}_{n}.png"));
        decoded
            .save(&frame_path)
            .with_context(|| format!("failed to write frame '{}'", frame_path.display()))?;
    }

    let base_image = workspace.path().join(format!("{scene_id}.png"));
    std::fs::copy(image, &base_image)
        .with_context(|| format!("failed to copy base image '{}'", image.display()))?;
    let base_audio = workspace.path().join(format!("{scene_id}.mp3"));
    std::fs::copy(narration, &base_audio)
        .with_context(|| format!("failed to copy narration '{}'", narration.display()))?;

    debug!(scene_id, "running assembly script");
    run_assembly_script(script, workspace.path())?;

    // The script's contract: leave the assembled clip under this exact name.
    // A violation is a caller/config error and is not retried.
    let artifact = workspace.path().join(format!("{scene_id}_multiframe.mp4"));
    if !artifact.exists() {
        return Err(StoryReelError::asset_missing(format!(
            "assembly script did not produce expected output '{}'",
            artifact.display()
        )));
    }

    ensure_parent_dir(out)?;
    replace_file(&artifact, out)?;
    Ok(out.to_path_buf())
}
