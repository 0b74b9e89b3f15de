//! Duration reconciler: re-render a clip to the longer of its video and
//! audio stream durations, so a short video loop never cuts off narration
//! and a long video never outlives its audio in the concatenated story.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::StoryReelResult;
use crate::ffmpeg::{ffmpeg_cmd, run_tool};
use crate::probe::{self, StreamDurations};

/// The effective playable duration: max of the two streams, with an absent
/// stream contributing zero.
pub fn target_duration(durations: StreamDurations) -> f64 {
    durations.video_sec.max(durations.audio_sec)
}

/// Re-render `clip` at `out`, truncated/bounded to exactly the target
/// duration. Both streams are re-encoded.
pub fn reconcile(clip: &Path, out: &Path) -> StoryReelResult<PathBuf> {
    let durations = probe::stream_durations(clip)?;
    let target = target_duration(durations);
    info!(
        clip = %clip.display(),
        video_sec = durations.video_sec,
        audio_sec = durations.audio_sec,
        target_sec = target,
        "reconciling clip duration"
    );

    let mut cmd = ffmpeg_cmd();
    cmd.arg("-i").arg(clip);
    cmd.args(["-c:v", "libx264", "-preset", "fast", "-c:a", "aac", "-t"])
        .arg(format!("{target}"))
        .arg(out);
    run_tool(cmd, "ffmpeg duration reconciliation")?;
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_longer_than_video_wins() {
        let d = StreamDurations {
            video_sec: 3.0,
            audio_sec: 7.0,
        };
        assert_eq!(target_duration(d), 7.0);
    }

    #[test]
    fn video_longer_than_audio_wins() {
        let d = StreamDurations {
            video_sec: 10.0,
            audio_sec: 4.0,
        };
        assert_eq!(target_duration(d), 10.0);
    }

    #[test]
    fn absent_streams_contribute_zero() {
        let d = StreamDurations {
            video_sec: 0.0,
            audio_sec: 5.5,
        };
        assert_eq!(target_duration(d), 5.5);
        assert_eq!(target_duration(StreamDurations::default()), 0.0);
    }
}
