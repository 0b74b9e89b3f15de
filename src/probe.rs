//! Stream prober: read-only inspection of media files via `ffprobe`.
//!
//! Absence of a requested stream is a valid, non-error result: it maps to
//! `None` for profiles and `0.0` for durations. Only process or parse
//! failures are errors.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{StoryReelError, StoryReelResult};
use crate::ffmpeg::run_tool_capture;

/// Audio stream descriptor used by the compatibility normalizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamProfile {
    pub codec_name: String,
    pub channels: u32,
    pub sample_rate: u32,
}

/// Per-stream playable durations; an absent stream contributes `0.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StreamDurations {
    pub video_sec: f64,
    pub audio_sec: f64,
}

// ffprobe reports most numeric fields as JSON strings; `channels` is the
// exception.
#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe the first audio stream's profile; `Ok(None)` when the file has no
/// audio stream.
pub fn audio_profile(path: &Path) -> StoryReelResult<Option<StreamProfile>> {
    let parsed = probe(path, Some("a:0"), "stream=codec_name,channels,sample_rate")?;
    let Some(stream) = parsed.streams.into_iter().next() else {
        return Ok(None);
    };
    // Missing fields read as non-conforming zero values rather than errors.
    Ok(Some(StreamProfile {
        codec_name: stream.codec_name.unwrap_or_default(),
        channels: stream.channels.unwrap_or(0),
        sample_rate: parse_f64(stream.sample_rate.as_deref()) as u32,
    }))
}

/// Probe video and audio stream durations independently.
pub fn stream_durations(path: &Path) -> StoryReelResult<StreamDurations> {
    Ok(StreamDurations {
        video_sec: stream_duration(path, "v:0")?,
        audio_sec: stream_duration(path, "a:0")?,
    })
}

fn stream_duration(path: &Path, selector: &str) -> StoryReelResult<f64> {
    let parsed = probe(path, Some(selector), "stream=duration")?;
    Ok(parsed
        .streams
        .first()
        .map(|s| parse_f64(s.duration.as_deref()))
        .unwrap_or(0.0))
}

/// Container-level duration in seconds (`format=duration`).
pub fn media_duration(path: &Path) -> StoryReelResult<f64> {
    let parsed = probe(path, None, "format=duration")?;
    Ok(parsed
        .format
        .map(|f| parse_f64(f.duration.as_deref()))
        .unwrap_or(0.0))
}

fn probe(path: &Path, selector: Option<&str>, entries: &str) -> StoryReelResult<ProbeOut> {
    let mut cmd = Command::new("ffprobe");
    cmd.args(["-v", "error"]);
    if let Some(selector) = selector {
        cmd.args(["-select_streams", selector]);
    }
    cmd.args(["-show_entries", entries, "-of", "json"]).arg(path);
    let stdout = run_tool_capture(cmd, "ffprobe")?;
    parse_probe_output(&stdout, path)
}

fn parse_probe_output(bytes: &[u8], path: &Path) -> StoryReelResult<ProbeOut> {
    serde_json::from_slice(bytes).map_err(|e| {
        StoryReelError::serde(format!(
            "ffprobe json parse failed for '{}': {e}",
            path.display()
        ))
    })
}

fn parse_f64(s: Option<&str>) -> f64 {
    s.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(json: &str) -> ProbeOut {
        parse_probe_output(json.as_bytes(), &PathBuf::from("x.mp4")).unwrap()
    }

    #[test]
    fn parses_audio_stream_fields() {
        let out = parse(
            r#"{"streams":[{"codec_name":"mp3","channels":1,"sample_rate":"44100"}]}"#,
        );
        let s = &out.streams[0];
        assert_eq!(s.codec_name.as_deref(), Some("mp3"));
        assert_eq!(s.channels, Some(1));
        assert_eq!(parse_f64(s.sample_rate.as_deref()) as u32, 44_100);
    }

    #[test]
    fn empty_probe_output_means_no_stream() {
        let out = parse(r#"{"programs":[]}"#);
        assert!(out.streams.is_empty());
    }

    #[test]
    fn stream_duration_string_parses() {
        let out = parse(r#"{"streams":[{"duration":"7.013000"}]}"#);
        let d = parse_f64(out.streams[0].duration.as_deref());
        assert!((d - 7.013).abs() < 1e-9);
    }

    #[test]
    fn format_duration_parses() {
        let out = parse(r#"{"format":{"duration":"12.5"}}"#);
        let d = parse_f64(out.format.unwrap().duration.as_deref());
        assert!((d - 12.5).abs() < 1e-9);
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        let err = parse_probe_output(b"not json", &PathBuf::from("x.mp4")).unwrap_err();
        assert!(matches!(err, StoryReelError::Serde(_)));
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let out = parse(r#"{"streams":[{}]}"#);
        let s = &out.streams[0];
        assert!(s.codec_name.is_none());
        assert_eq!(parse_f64(s.duration.as_deref()), 0.0);
    }
}
