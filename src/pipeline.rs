//! High-level pipeline operations over a [`StoryLayout`].
//!
//! Each operation is a sequence of blocking external-process calls with no
//! internal parallelism; a clip travels synthesizer, normalizer, reconciler,
//! concatenator strictly in order. Independent stories or scenes may be
//! processed concurrently by the caller, but the path keyed by
//! (story, scene) is shared mutable state with no built-in mutual
//! exclusion: callers must serialize work per key (a keyed lock or
//! single-flight), and must impose their own timeouts around an invocation
//! when they need them.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{StoryReelError, StoryReelResult};
use crate::layout::StoryLayout;
use crate::mix::{MixOptions, OverlayTrackConfig};
use crate::synth::SceneMotion;
use crate::{concat, mix, synth};

pub use crate::concat::normalize_and_reconcile;

/// Render the clip for one scene from its stored image and narration.
pub fn synthesize_scene_clip(
    layout: &StoryLayout,
    scene_id: &str,
    motion: &SceneMotion,
) -> StoryReelResult<PathBuf> {
    synth::synthesize(
        scene_id,
        &layout.image_path(scene_id),
        &layout.narration_path(scene_id),
        motion,
        &layout.clip_path(scene_id),
    )
}

/// Concatenate the rendered clips for `scene_ids`, in exactly that order,
/// into the story artifact.
pub fn concatenate_story(layout: &StoryLayout, scene_ids: &[String]) -> StoryReelResult<PathBuf> {
    if scene_ids.is_empty() {
        return Err(StoryReelError::validation(
            "story timeline must name at least one scene",
        ));
    }
    let mut clips = Vec::with_capacity(scene_ids.len());
    for scene_id in scene_ids {
        let clip = layout.clip_path(scene_id);
        if !clip.exists() {
            return Err(StoryReelError::asset_missing(format!(
                "no rendered clip for scene '{scene_id}'"
            )));
        }
        clips.push(clip);
    }
    info!(scenes = scene_ids.len(), "accumulating story");
    concat::concatenate(&clips, &layout.story_path())
}

/// Mix overlay tracks onto a scene's narration. The result lands at the
/// distinct mixed-take path; promoting it over the canonical narration is
/// the caller's explicit accept step ([`StoryLayout::accept_mixed_narration`]).
pub fn mix_audio_tracks(
    layout: &StoryLayout,
    scene_id: &str,
    overlays: &[(PathBuf, OverlayTrackConfig)],
    options: &MixOptions,
) -> StoryReelResult<PathBuf> {
    let base = layout.narration_path(scene_id);
    let out = layout.mixed_narration_path(scene_id, options.format.extension());
    mix::mix(&base, overlays, &out, options)
}

/// Convenience passthrough for callers holding bare paths rather than a
/// story layout.
pub fn concatenate_clips(clips: &[PathBuf], out: &Path) -> StoryReelResult<PathBuf> {
    concat::concatenate(clips, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_timeline_is_a_validation_error() {
        let root = tempfile::tempdir().unwrap();
        let layout = StoryLayout::new(root.path(), "s1");
        let err = concatenate_story(&layout, &[]).unwrap_err();
        assert!(matches!(err, StoryReelError::Validation(_)));
    }

    #[test]
    fn unrendered_scene_is_reported_by_id() {
        let root = tempfile::tempdir().unwrap();
        let layout = StoryLayout::new(root.path(), "s1");
        layout.init().unwrap();
        std::fs::write(layout.clip_path("a"), b"x").unwrap();

        let err = concatenate_story(&layout, &["a".into(), "ghost".into()]).unwrap_err();
        match err {
            StoryReelError::AssetMissing(msg) => assert!(msg.contains("ghost"), "{msg}"),
            other => panic!("expected AssetMissing, got {other}"),
        }
    }

    #[test]
    fn mix_targets_the_distinct_mixed_path() {
        let root = tempfile::tempdir().unwrap();
        let layout = StoryLayout::new(root.path(), "s1");
        layout.init().unwrap();
        // No narration on disk: the mixer refuses before writing anything.
        let err = mix_audio_tracks(&layout, "a", &[], &MixOptions::default()).unwrap_err();
        assert!(matches!(err, StoryReelError::AssetMissing(_)));
        assert!(!layout.mixed_narration_path("a", "mp3").exists());
        assert!(!layout.narration_path("a").exists());
    }
}
