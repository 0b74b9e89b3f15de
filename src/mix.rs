//! Audio track mixer: overlays secondary tracks onto a base narration.
//!
//! All processing happens on interleaved stereo `f32` PCM at 48 kHz, decoded
//! and re-encoded by ffmpeg. Per overlay the operations apply in a fixed
//! order: loop, fade-in, fade-out, volume. Composition is a plain additive
//! sum starting at the overlay's configured offset; the base track's length
//! is authoritative and overlay samples past its end are dropped.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{StoryReelError, StoryReelResult};
use crate::ffmpeg::{ensure_parent_dir, ffmpeg_cmd, replace_file, run_tool, run_tool_capture};

pub const MIX_SAMPLE_RATE: u32 = 48_000;
pub const MIX_CHANNELS: usize = 2;

/// Peak normalization target: -0.1 dBFS of headroom.
const NORMALIZE_HEADROOM_DB: f64 = 0.1;

/// Per-overlay configuration, index-correlated with its audio file.
///
/// `volume` is a legacy alias for `volume_db`; when both are present the
/// primary wins. (A serde alias would reject payloads carrying both keys, so
/// the two fields are modeled separately.)
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OverlayTrackConfig {
    pub start_time_ms: u64,
    pub volume_db: Option<f64>,
    pub volume: Option<f64>,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    #[serde(rename = "loop")]
    pub loop_track: bool,
}

impl OverlayTrackConfig {
    /// Effective decibel delta: primary field, then the legacy alias, then 0.
    pub fn gain_db(&self) -> f64 {
        self.volume_db.or(self.volume).unwrap_or(0.0)
    }
}

/// Output container/codec for the mixed result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::M4a => "m4a",
        }
    }

    fn codec_args(self) -> &'static [&'static str] {
        match self {
            Self::Mp3 => &["-c:a", "libmp3lame", "-b:a", "192k"],
            Self::Wav => &["-c:a", "pcm_s16le"],
            Self::M4a => &["-c:a", "aac", "-b:a", "192k"],
        }
    }
}

#[derive(Clone, Debug)]
pub struct MixOptions {
    /// Peak-normalize the final mix.
    pub normalize: bool,
    pub format: AudioFormat,
}

impl Default for MixOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            format: AudioFormat::Mp3,
        }
    }
}

/// Mix `overlays` onto `base` and export to `out`.
///
/// Any failure (unreadable overlay, decode error, encoder failure) aborts
/// before anything is written to `out`; the export is staged in scratch and
/// moved into place only when complete.
pub fn mix(
    base: &Path,
    overlays: &[(PathBuf, OverlayTrackConfig)],
    out: &Path,
    options: &MixOptions,
) -> StoryReelResult<PathBuf> {
    if !base.exists() {
        return Err(StoryReelError::asset_missing(format!(
            "base track not found: {}",
            base.display()
        )));
    }
    let mut mixed = decode_stereo_f32(base)?;
    if mixed.is_empty() {
        return Err(StoryReelError::validation(format!(
            "base track '{}' contains no audio",
            base.display()
        )));
    }
    let base_frames = mixed.len() / MIX_CHANNELS;
    info!(
        base = %base.display(),
        base_sec = base_frames as f64 / f64::from(MIX_SAMPLE_RATE),
        overlays = overlays.len(),
        "mixing audio tracks"
    );

    for (index, (path, config)) in overlays.iter().enumerate() {
        if !path.exists() {
            return Err(StoryReelError::asset_missing(format!(
                "overlay track {index} not found: {}",
                path.display()
            )));
        }
        let mut overlay = decode_stereo_f32(path)?;
        if overlay.is_empty() {
            return Err(StoryReelError::validation(format!(
                "overlay track '{}' contains no audio",
                path.display()
            )));
        }

        if config.loop_track {
            let reps = loop_repetitions(base_frames, overlay.len() / MIX_CHANNELS);
            overlay = repeat_pcm(&overlay, reps);
            debug!(
                index,
                reps,
                looped_sec = (overlay.len() / MIX_CHANNELS) as f64 / f64::from(MIX_SAMPLE_RATE),
                "looped overlay to cover base"
            );
        }
        apply_fade_in(&mut overlay, config.fade_in_ms);
        apply_fade_out(&mut overlay, config.fade_out_ms);
        let gain_db = config.gain_db();
        if gain_db != 0.0 {
            apply_gain(&mut overlay, db_to_gain(gain_db));
        }
        overlay_onto(&mut mixed, &overlay, config.start_time_ms);
        debug!(index, start_time_ms = config.start_time_ms, "composed overlay");
    }

    if options.normalize {
        peak_normalize(&mut mixed);
    }
    for s in &mut mixed {
        *s = s.clamp(-1.0, 1.0);
    }

    export_pcm(&mixed, out, options.format)
}

/// Decode any audio file to interleaved stereo f32 at the mix rate.
pub(crate) fn decode_stereo_f32(path: &Path) -> StoryReelResult<Vec<f32>> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"]).arg(path).args([
        "-vn",
        "-f",
        "f32le",
        "-acodec",
        "pcm_f32le",
        "-ac",
        "2",
        "-ar",
        &MIX_SAMPLE_RATE.to_string(),
        "pipe:1",
    ]);
    let bytes = run_tool_capture(cmd, "ffmpeg audio decode")?;
    if !bytes.len().is_multiple_of(4) {
        return Err(StoryReelError::process(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(pcm)
}

/// Repetitions needed for a looped overlay to reach or exceed the base
/// duration: `ceil(base / overlay)`.
pub(crate) fn loop_repetitions(base_frames: usize, overlay_frames: usize) -> usize {
    if overlay_frames == 0 {
        return 0;
    }
    base_frames.div_ceil(overlay_frames)
}

fn repeat_pcm(pcm: &[f32], reps: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(pcm.len() * reps);
    for _ in 0..reps {
        out.extend_from_slice(pcm);
    }
    out
}

pub(crate) fn apply_fade_in(pcm: &mut [f32], fade_ms: u64) {
    let frames = pcm.len() / MIX_CHANNELS;
    let fade_frames = (ms_to_frames(fade_ms)).min(frames);
    if fade_frames == 0 {
        return;
    }
    for i in 0..fade_frames {
        let gain = i as f32 / fade_frames as f32;
        pcm[i * MIX_CHANNELS] *= gain;
        pcm[i * MIX_CHANNELS + 1] *= gain;
    }
}

pub(crate) fn apply_fade_out(pcm: &mut [f32], fade_ms: u64) {
    let frames = pcm.len() / MIX_CHANNELS;
    let fade_frames = (ms_to_frames(fade_ms)).min(frames);
    if fade_frames == 0 {
        return;
    }
    for i in 0..fade_frames {
        let gain = i as f32 / fade_frames as f32;
        let frame = frames - 1 - i;
        pcm[frame * MIX_CHANNELS] *= gain;
        pcm[frame * MIX_CHANNELS + 1] *= gain;
    }
}

pub(crate) fn db_to_gain(db: f64) -> f32 {
    10f64.powf(db / 20.0) as f32
}

pub(crate) fn apply_gain(pcm: &mut [f32], gain: f32) {
    for s in pcm {
        *s *= gain;
    }
}

/// Additive composition at `start_ms`; samples past the base end are
/// dropped.
fn overlay_onto(base: &mut [f32], overlay: &[f32], start_ms: u64) {
    let base_frames = base.len() / MIX_CHANNELS;
    let start_frame = ms_to_frames(start_ms);
    let overlay_frames = overlay.len() / MIX_CHANNELS;
    for f in 0..overlay_frames {
        let dst = start_frame + f;
        if dst >= base_frames {
            break;
        }
        base[dst * MIX_CHANNELS] += overlay[f * MIX_CHANNELS];
        base[dst * MIX_CHANNELS + 1] += overlay[f * MIX_CHANNELS + 1];
    }
}

/// Scale so the peak sits at the normalization headroom below full scale.
/// Quiet material is boosted, hot material attenuated.
pub(crate) fn peak_normalize(pcm: &mut [f32]) {
    let peak = pcm.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= 0.0 {
        return;
    }
    let target = db_to_gain(-NORMALIZE_HEADROOM_DB);
    apply_gain(pcm, target / peak);
}

fn ms_to_frames(ms: u64) -> usize {
    (ms as u128 * u128::from(MIX_SAMPLE_RATE) / 1000) as usize
}

/// Encode interleaved stereo f32 PCM to `out` in the requested format,
/// staged through a scratch directory.
pub(crate) fn export_pcm(pcm: &[f32], out: &Path, format: AudioFormat) -> StoryReelResult<PathBuf> {
    let scratch = tempfile::tempdir().context("failed to create mix scratch directory")?;
    let raw = scratch.path().join("mix.f32le");
    let mut bytes = Vec::<u8>::with_capacity(pcm.len() * 4);
    for &sample in pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(&raw, bytes)
        .with_context(|| format!("failed to write PCM intermediate '{}'", raw.display()))?;

    let staged = scratch.path().join(format!("mix.{}", format.extension()));
    let mut cmd = ffmpeg_cmd();
    cmd.args(["-f", "f32le", "-ar", &MIX_SAMPLE_RATE.to_string(), "-ac", "2", "-i"])
        .arg(&raw)
        .args(format.codec_args())
        .arg(&staged);
    run_tool(cmd, "ffmpeg audio export")?;

    ensure_parent_dir(out)?;
    replace_file(&staged, out)?;
    Ok(out.to_path_buf())
}
