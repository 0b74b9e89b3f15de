//! Storyreel assembles short narrated scenes into per-scene video clips,
//! concatenates an ordered sequence of clips into one story-length video,
//! and mixes supplementary audio tracks onto a narration.
//!
//! The pipeline coordinates the system `ffmpeg`/`ffprobe` binaries; it does
//! no codec work of its own beyond what is needed to guarantee safe
//! concatenation (uniform stream parameters, reconciled durations) and safe
//! mixing (non-destructive takes, staged artifact handoff).
//!
//! Speech synthesis and scene image generation are external collaborators:
//! their outputs reach this crate as opaque files on disk.
#![forbid(unsafe_code)]

pub mod concat;
pub mod enhance;
pub mod error;
pub mod ffmpeg;
pub mod layout;
pub mod mix;
pub mod normalize;
pub mod pipeline;
pub mod probe;
pub mod reconcile;
pub mod synth;

pub use error::{StoryReelError, StoryReelResult};
pub use layout::StoryLayout;
pub use mix::{AudioFormat, MixOptions, OverlayTrackConfig};
pub use probe::{StreamDurations, StreamProfile};
pub use synth::{FrameImage, SceneMotion};
