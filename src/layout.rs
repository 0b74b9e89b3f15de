//! Persisted on-disk layout: one directory per story with `images/`,
//! `audios/` and `videos/` subdirectories, each file named by scene id.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::error::{StoryReelError, StoryReelResult};

pub const IMAGES_DIR: &str = "images";
pub const AUDIOS_DIR: &str = "audios";
pub const VIDEOS_DIR: &str = "videos";
pub const STORY_FILE: &str = "story.mp4";

/// Path conventions for a single story's artifacts.
///
/// The layout itself carries no locking: the path keyed by (story, scene) is
/// shared mutable state, and concurrent work on the same key must be
/// serialized by the caller.
#[derive(Clone, Debug)]
pub struct StoryLayout {
    root: PathBuf,
}

impl StoryLayout {
    pub fn new(data_root: impl Into<PathBuf>, story_id: &str) -> Self {
        Self {
            root: data_root.into().join(story_id),
        }
    }

    /// Create the story directory tree. Idempotent.
    pub fn init(&self) -> StoryReelResult<()> {
        for dir in [IMAGES_DIR, AUDIOS_DIR, VIDEOS_DIR] {
            std::fs::create_dir_all(self.root.join(dir)).with_context(|| {
                format!(
                    "failed to create story directory '{}'",
                    self.root.join(dir).display()
                )
            })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_path(&self, scene_id: &str) -> PathBuf {
        self.root.join(IMAGES_DIR).join(format!("{scene_id}.png"))
    }

    pub fn narration_path(&self, scene_id: &str) -> PathBuf {
        self.root.join(AUDIOS_DIR).join(format!("{scene_id}.mp3"))
    }

    pub fn clip_path(&self, scene_id: &str) -> PathBuf {
        self.root.join(VIDEOS_DIR).join(format!("{scene_id}.mp4"))
    }

    /// Mixed narration takes are written next to the accepted narration under
    /// a distinct name, so a rejected mix can be discarded without touching
    /// the canonical track.
    pub fn mixed_narration_path(&self, scene_id: &str, extension: &str) -> PathBuf {
        self.root
            .join(AUDIOS_DIR)
            .join(format!("{scene_id}_mixed.{extension}"))
    }

    pub fn story_path(&self) -> PathBuf {
        self.root.join(STORY_FILE)
    }

    /// Promote the mixed narration take to the canonical narration track.
    ///
    /// This is the explicit accept step: until it runs, the mix result and
    /// the accepted narration coexist and the mix can be redone freely.
    pub fn accept_mixed_narration(&self, scene_id: &str) -> StoryReelResult<PathBuf> {
        let mixed = self.mixed_narration_path(scene_id, "mp3");
        if !mixed.exists() {
            return Err(StoryReelError::asset_missing(format!(
                "no mixed narration take for scene '{scene_id}' at '{}'",
                mixed.display()
            )));
        }
        let narration = self.narration_path(scene_id);
        if narration.exists() {
            std::fs::remove_file(&narration).with_context(|| {
                format!("failed to remove narration '{}'", narration.display())
            })?;
        }
        std::fs::rename(&mixed, &narration).with_context(|| {
            format!(
                "failed to promote '{}' to '{}'",
                mixed.display(),
                narration.display()
            )
        })?;
        Ok(narration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_the_directory_tree_idempotently() {
        let root = tempfile::tempdir().unwrap();
        let layout = StoryLayout::new(root.path(), "s1");
        layout.init().unwrap();
        layout.init().unwrap();
        assert!(root.path().join("s1").join(IMAGES_DIR).is_dir());
        assert!(root.path().join("s1").join(AUDIOS_DIR).is_dir());
        assert!(root.path().join("s1").join(VIDEOS_DIR).is_dir());
    }

    #[test]
    fn paths_are_keyed_by_scene_id() {
        let layout = StoryLayout::new("/data", "story-9");
        assert!(layout.image_path("intro").ends_with("story-9/images/intro.png"));
        assert!(layout.narration_path("intro").ends_with("story-9/audios/intro.mp3"));
        assert!(layout.clip_path("intro").ends_with("story-9/videos/intro.mp4"));
        assert!(
            layout
                .mixed_narration_path("intro", "mp3")
                .ends_with("story-9/audios/intro_mixed.mp3")
        );
        assert!(layout.story_path().ends_with("story-9/story.mp4"));
    }

    #[test]
    fn accept_replaces_the_canonical_narration() {
        let root = tempfile::tempdir().unwrap();
        let layout = StoryLayout::new(root.path(), "s1");
        layout.init().unwrap();
        std::fs::write(layout.narration_path("a"), b"old").unwrap();
        std::fs::write(layout.mixed_narration_path("a", "mp3"), b"new").unwrap();

        let promoted = layout.accept_mixed_narration("a").unwrap();
        assert_eq!(std::fs::read(&promoted).unwrap(), b"new");
        assert!(!layout.mixed_narration_path("a", "mp3").exists());
    }

    #[test]
    fn accept_without_a_mixed_take_is_asset_missing() {
        let root = tempfile::tempdir().unwrap();
        let layout = StoryLayout::new(root.path(), "s1");
        layout.init().unwrap();
        let err = layout.accept_mixed_narration("a").unwrap_err();
        assert!(matches!(err, StoryReelError::AssetMissing(_)));
    }
}
