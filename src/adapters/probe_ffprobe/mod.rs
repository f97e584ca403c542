//! FFprobe adapter for encoded stream probing
//!
//! This module reads stream geometry, frame rate and audio presence with `ffprobe`.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapters::exec_ffmpeg::{parent_dir, run_engine};
use crate::domain::errors::EngineError;
use crate::ports::*;

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    program: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parse ffprobe JSON into a stream probe
    pub fn parse(json: &[u8]) -> Result<StreamProbe, EngineError> {
        let output: ProbeOutput =
            serde_json::from_slice(json).map_err(|e| EngineError::Malformed(e.to_string()))?;

        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| EngineError::Malformed("no video stream".to_string()))?;

        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) => (w, h),
            _ => return Err(EngineError::Malformed("video stream has no size".to_string())),
        };

        let frame_rate = [&video.avg_frame_rate, &video.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|rate| parse_rational(rate))
            .ok_or_else(|| EngineError::Malformed("video stream has no frame rate".to_string()))?;

        let has_audio = output
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        let duration = output
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok());

        Ok(StreamProbe {
            width,
            height,
            frame_rate,
            has_audio,
            duration,
        })
    }
}

/// "30000/1001" -> 29.97; "0/0" and garbage -> None
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (value.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe_stream(&self, path: &Path) -> Result<StreamProbe, EngineError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "stream=codec_type,width,height,avg_frame_rate,r_frame_rate:format=duration".into(),
            "-of".into(),
            "json".into(),
            path.into(),
        ];
        let stdout = run_engine(&self.program, &args, parent_dir(path)).await?;
        Self::parse(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_only() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720,
                 "avg_frame_rate": "30/1", "r_frame_rate": "30/1"}
            ],
            "format": {"duration": "12.000000"}
        }"#;
        let probe = FfprobeAdapter::parse(json).unwrap();
        assert_eq!(probe.width, 1280);
        assert_eq!(probe.height, 720);
        assert_eq!(probe.frame_rate, 30.0);
        assert!(!probe.has_audio);
        assert_eq!(probe.duration, Some(12.0));
    }

    #[test]
    fn test_parse_detects_audio_and_falls_back_to_r_frame_rate() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 640, "height": 360,
                 "avg_frame_rate": "0/0", "r_frame_rate": "15/1"}
            ]
        }"#;
        let probe = FfprobeAdapter::parse(json).unwrap();
        assert!(probe.has_audio);
        assert_eq!(probe.frame_rate, 15.0);
        assert_eq!(probe.duration, None);
    }

    #[test]
    fn test_parse_rejects_missing_video() {
        let json = br#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(FfprobeAdapter::parse(json).is_err());
        assert!(FfprobeAdapter::parse(b"not json").is_err());
    }

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("60/1"), Some(60.0));
        assert!((parse_rational("30000/1001").unwrap() - 29.97).abs() < 0.001);
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("25"), Some(25.0));
    }
}
