//! Stream compatibility normalizer.
//!
//! Concatenation by minimal re-encode requires uniform audio parameters
//! across clips that may originate from different synthesis paths. Clips
//! already at the target profile pass through untouched, avoiding a
//! generation of quality loss and an encode.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StoryReelResult;
use crate::ffmpeg::{ffmpeg_cmd, run_tool};
use crate::probe::{self, StreamProfile};

pub const TARGET_CODEC: &str = "aac";
pub const TARGET_CHANNELS: u32 = 2;
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// A clip conforms only when its first audio stream is AAC stereo at 48 kHz.
/// No audio stream at all counts as non-conforming.
pub fn conforms(profile: Option<&StreamProfile>) -> bool {
    match profile {
        Some(p) => {
            p.codec_name == TARGET_CODEC
                && p.channels == TARGET_CHANNELS
                && p.sample_rate == TARGET_SAMPLE_RATE
        }
        None => false,
    }
}

pub fn needs_normalization(clip: &Path) -> StoryReelResult<bool> {
    Ok(!conforms(probe::audio_profile(clip)?.as_ref()))
}

/// Re-encode `clip` to the target profile at `out`, or return `clip`
/// unchanged when it already conforms. Idempotent by construction.
pub fn normalize(clip: &Path, out: &Path) -> StoryReelResult<PathBuf> {
    if !needs_normalization(clip)? {
        debug!(clip = %clip.display(), "audio stream conforms, skipping normalization");
        return Ok(clip.to_path_buf());
    }

    info!(clip = %clip.display(), out = %out.display(), "normalizing clip streams");
    let mut cmd = ffmpeg_cmd();
    cmd.arg("-i").arg(clip);
    // crf 18 keeps the video near-lossless; the audio is forced onto the
    // target profile.
    cmd.args([
        "-c:v",
        "libx264",
        "-preset",
        "fast",
        "-crf",
        "18",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-ar",
        "48000",
        "-ac",
        "2",
    ])
    .arg(out);
    run_tool(cmd, "ffmpeg normalization")?;
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(codec: &str, channels: u32, sample_rate: u32) -> StreamProfile {
        StreamProfile {
            codec_name: codec.to_string(),
            channels,
            sample_rate,
        }
    }

    #[test]
    fn target_profile_conforms() {
        assert!(conforms(Some(&profile("aac", 2, 48_000))));
    }

    #[test]
    fn any_deviation_requires_normalization() {
        assert!(!conforms(Some(&profile("mp3", 2, 48_000))));
        assert!(!conforms(Some(&profile("aac", 1, 48_000))));
        assert!(!conforms(Some(&profile("aac", 2, 44_100))));
        assert!(!conforms(Some(&profile("mp3", 1, 44_100))));
    }

    #[test]
    fn missing_audio_stream_requires_normalization() {
        assert!(!conforms(None));
    }
}
