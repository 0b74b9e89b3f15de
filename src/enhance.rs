//! Narration enhancement: gain, normalization, fades and an assembled
//! ffmpeg filter chain (EQ, denoise, gate, compression, reverb, echo,
//! stereo widening) over a single audio file.
//!
//! The simple amplitude operations run on decoded PCM with the mixer's
//! helpers; everything that needs a real DSP implementation is delegated to
//! ffmpeg's audio filters.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tracing::info;

use crate::error::{StoryReelError, StoryReelResult};
use crate::ffmpeg::{ensure_parent_dir, ffmpeg_cmd, replace_file, run_tool};
use crate::mix::{self, MIX_SAMPLE_RATE, apply_fade_in, apply_fade_out, apply_gain, db_to_gain};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EnhanceSettings {
    pub volume_db: f64,
    pub normalize: bool,
    pub compress: bool,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    pub bass_boost_db: f64,
    pub mid_boost_db: f64,
    pub treble_boost_db: f64,
    pub noise_reduction: bool,
    pub noise_gate: bool,
    pub gate_threshold_db: f64,
    pub reverb: bool,
    pub reverb_amount: f64,
    pub echo: bool,
    pub echo_delay_ms: u64,
    pub echo_decay: f64,
    pub stereo_widen: bool,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            volume_db: 0.0,
            normalize: false,
            compress: false,
            fade_in_ms: 0,
            fade_out_ms: 0,
            bass_boost_db: 0.0,
            mid_boost_db: 0.0,
            treble_boost_db: 0.0,
            noise_reduction: false,
            noise_gate: false,
            gate_threshold_db: -40.0,
            reverb: false,
            reverb_amount: 0.2,
            echo: false,
            echo_delay_ms: 500,
            echo_decay: 0.3,
            stereo_widen: false,
        }
    }
}

/// Assemble the `-af` filter chain for the enabled effects. Empty when only
/// amplitude operations are requested.
fn filter_chain(settings: &EnhanceSettings) -> Vec<String> {
    let mut filters = Vec::new();

    if settings.compress {
        // pydub's compress_dynamic_range defaults, expressed as acompressor.
        filters.push("acompressor=threshold=-20dB:ratio=4:attack=5:release=50".to_string());
    }
    if settings.bass_boost_db != 0.0
        || settings.mid_boost_db != 0.0
        || settings.treble_boost_db != 0.0
    {
        filters.push(format!(
            "equalizer=f=100:width_type=o:width=2:g={},\
             equalizer=f=1000:width_type=o:width=2:g={},\
             equalizer=f=10000:width_type=o:width=2:g={}",
            settings.bass_boost_db, settings.mid_boost_db, settings.treble_boost_db
        ));
    }
    if settings.noise_reduction {
        filters.push("afftdn=nf=-25".to_string());
    }
    if settings.noise_gate {
        filters.push(format!(
            "agate=threshold={}dB:ratio=2:attack=3:release=8",
            settings.gate_threshold_db
        ));
    }
    if settings.reverb {
        filters.push(format!(
            "aecho=0.8:0.9:{}:{}",
            (50.0 * settings.reverb_amount) as i64,
            settings.reverb_amount
        ));
    }
    if settings.echo {
        filters.push(format!(
            "aecho={}:0.9:{}:{}",
            settings.echo_decay, settings.echo_delay_ms, settings.echo_decay
        ));
    }
    if settings.stereo_widen {
        filters.push("extrastereo=m=2.5:c=false".to_string());
    }
    filters
}

/// Enhance `input` into an mp3 at `out`. Non-destructive: the input file is
/// never modified and the output is staged before moving into place.
pub fn enhance(input: &Path, out: &Path, settings: &EnhanceSettings) -> StoryReelResult<PathBuf> {
    if !input.exists() {
        return Err(StoryReelError::asset_missing(format!(
            "audio file not found: {}",
            input.display()
        )));
    }

    let mut pcm = mix::decode_stereo_f32(input)?;
    if pcm.is_empty() {
        return Err(StoryReelError::validation(format!(
            "audio file '{}' contains no audio",
            input.display()
        )));
    }
    info!(input = %input.display(), "enhancing audio");

    if settings.volume_db != 0.0 {
        apply_gain(&mut pcm, db_to_gain(settings.volume_db));
    }
    if settings.normalize {
        mix::peak_normalize(&mut pcm);
    }
    apply_fade_in(&mut pcm, settings.fade_in_ms);
    apply_fade_out(&mut pcm, settings.fade_out_ms);
    for s in &mut pcm {
        *s = s.clamp(-1.0, 1.0);
    }

    let scratch = tempfile::tempdir().context("failed to create enhance scratch directory")?;
    let raw = scratch.path().join("enhance.f32le");
    let mut bytes = Vec::<u8>::with_capacity(pcm.len() * 4);
    for &sample in &pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(&raw, bytes)
        .with_context(|| format!("failed to write PCM intermediate '{}'", raw.display()))?;

    let staged = scratch.path().join("enhanced.mp3");
    let mut cmd = ffmpeg_cmd();
    cmd.args(["-f", "f32le", "-ar", &MIX_SAMPLE_RATE.to_string(), "-ac", "2", "-i"])
        .arg(&raw);
    let filters = filter_chain(settings);
    if !filters.is_empty() {
        cmd.args(["-af", &filters.join(",")]);
    }
    cmd.args(["-c:a", "libmp3lame", "-b:a", "192k", "-ar", "44100"])
        .arg(&staged);
    run_tool(cmd, "ffmpeg audio enhancement")?;

    ensure_parent_dir(out)?;
    replace_file(&staged, out)?;
    Ok(out.to_path_buf())
}

/// Cut a short mp3 preview (`preview_<stem>.mp3` next to the input) for
/// quick audition before committing to a full enhancement pass.
pub fn audio_preview(input: &Path, start_ms: u64, duration_ms: u64) -> StoryReelResult<PathBuf> {
    if !input.exists() {
        return Err(StoryReelError::asset_missing(format!(
            "audio file not found: {}",
            input.display()
        )));
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let out = input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("preview_{stem}.mp3"));

    let scratch = tempfile::tempdir().context("failed to create preview scratch directory")?;
    let staged = scratch.path().join("preview.mp3");
    let mut cmd = ffmpeg_cmd();
    cmd.args(["-ss", &format_seconds(start_ms), "-t", &format_seconds(duration_ms), "-i"])
        .arg(input)
        .args(["-c:a", "libmp3lame", "-b:a", "128k"])
        .arg(&staged);
    run_tool(cmd, "ffmpeg preview cut")?;

    replace_file(&staged, &out)?;
    Ok(out)
}

fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}
