//! FFmpeg execution adapter
//!
//! Drives the `ffmpeg` binary as the encoding and packaging engine.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::EngineError;
use crate::ports::*;
use crate::utils::stderr_tail;

const STDERR_TAIL_LINES: usize = 8;

/// Run `program` to completion, mapping spawn failures and non-zero exits
pub(crate) async fn run_engine(
    program: &str,
    args: &[OsString],
    cwd: Option<&Path>,
) -> Result<Vec<u8>, EngineError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!(
        "Running {} {}",
        program,
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = command.output().await.map_err(|e| EngineError::Spawn {
        program: program.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(EngineError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr, STDERR_TAIL_LINES),
        });
    }

    Ok(output.stdout)
}

/// Directory containing `path`, if it names one
pub(crate) fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Encoding engine backed by the ffmpeg CLI
pub struct FfmpegEncodingEngine {
    program: String,
}

impl FfmpegEncodingEngine {
    /// Create new adapter running `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line for one transcode
    pub fn build_args(request: &TranscodeRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            request.input.clone().into(),
        ];

        if !request.filters.is_empty() {
            args.push("-vf".into());
            args.push(request.filters.join(",").into());
        }
        if request.drop_audio {
            args.push("-an".into());
        }
        for (flag, value) in &request.codec_options {
            args.push(flag.into());
            args.push(value.into());
        }
        args.push("-f".into());
        args.push(request.format.clone().into());
        args.push(request.output.clone().into());
        args
    }
}

#[async_trait]
impl EncodingEngine for FfmpegEncodingEngine {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), EngineError> {
        let args = Self::build_args(request);
        // Pinned so the child never inherits a working directory switched by another job
        run_engine(&self.program, &args, parent_dir(&request.output))
            .await
            .map(|_| ())
    }
}

/// Packaging engine backed by the ffmpeg DASH muxer
///
/// The muxer numbers representations by input order, so `$RepresentationID$`
/// only matches the configured IDs when those are "0".."n-1".
pub struct FfmpegPackagingEngine {
    program: String,
}

impl FfmpegPackagingEngine {
    /// Create new adapter running `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line for one segmentation, paths relative to `request.cwd`
    pub fn build_args(request: &SegmentRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-nostdin".into(), "-y".into()];

        for input in &request.inputs {
            args.push("-i".into());
            args.push(input.clone().into());
        }
        for index in 0..request.inputs.len() {
            args.push("-map".into());
            args.push(format!("{}:v:0", index).into());
        }

        let options: [(&str, String); 10] = [
            ("-c", "copy".to_string()),
            ("-f", "dash".to_string()),
            ("-seg_duration", request.segment_duration.to_string()),
            ("-use_template", "1".to_string()),
            ("-use_timeline", "1".to_string()),
            ("-single_file", "0".to_string()),
            ("-adaptation_sets", "id=0,streams=v".to_string()),
            ("-init_seg_name", request.init_template.clone()),
            ("-media_seg_name", request.media_template.clone()),
            ("-dash_segment_type", "mp4".to_string()),
        ];
        for (flag, value) in options {
            args.push(flag.into());
            args.push(value.into());
        }

        args.push(request.manifest.clone().into());
        args
    }

    fn check_request(request: &SegmentRequest) -> Result<(), EngineError> {
        // dashenc always numbers media segments from 1
        if request.start_number != 1 {
            return Err(EngineError::Unsupported(format!(
                "ffmpeg numbers segments from 1, requested {}",
                request.start_number
            )));
        }
        for (index, id) in request.representation_ids.iter().enumerate() {
            if id.as_str() != index.to_string() {
                return Err(EngineError::Unsupported(format!(
                    "ffmpeg assigns positional representation IDs; expected '{}' at position {}, got '{}'",
                    index, index, id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PackagingEngine for FfmpegPackagingEngine {
    async fn segment(&self, request: &SegmentRequest) -> Result<(), EngineError> {
        Self::check_request(request)?;
        let args = Self::build_args(request);
        run_engine(&self.program, &args, Some(&request.cwd))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RepresentationId;
    use std::path::PathBuf;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    }

    fn segment_request(ids: &[&str]) -> SegmentRequest {
        SegmentRequest {
            inputs: ids
                .iter()
                .map(|id| PathBuf::from(format!("/work/{}.mp4", id)))
                .collect(),
            representation_ids: ids.iter().map(|id| RepresentationId::new(*id).unwrap()).collect(),
            manifest: "bunny.mpd".to_string(),
            segment_duration: 5.0,
            init_template: "$RepresentationID$/init.mp4".to_string(),
            media_template: "$RepresentationID$/chunk_$Number%05d$.m4s".to_string(),
            start_number: 1,
            cwd: PathBuf::from("/out/.bunny.staging-x"),
        }
    }

    #[test]
    fn test_encode_args() {
        let request = TranscodeRequest {
            input: PathBuf::from("/in/bunny.mp4"),
            output: PathBuf::from("/work/0.part.mp4"),
            filters: vec!["scale=640:360".to_string(), "fps=15".to_string()],
            codec_options: vec![("-c:v".to_string(), "libsvtav1".to_string())],
            drop_audio: true,
            format: "mp4".to_string(),
        };
        let args = strings(&FfmpegEncodingEngine::build_args(&request));

        assert_eq!(value_after(&args, "-i").as_deref(), Some("/in/bunny.mp4"));
        assert_eq!(value_after(&args, "-vf").as_deref(), Some("scale=640:360,fps=15"));
        assert_eq!(value_after(&args, "-c:v").as_deref(), Some("libsvtav1"));
        assert_eq!(value_after(&args, "-f").as_deref(), Some("mp4"));
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/work/0.part.mp4"));
    }

    #[test]
    fn test_package_args() {
        let args = strings(&FfmpegPackagingEngine::build_args(&segment_request(&["0", "1", "2"])));

        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 3);
        assert!(args.contains(&"2:v:0".to_string()));
        assert_eq!(value_after(&args, "-c").as_deref(), Some("copy"));
        assert_eq!(value_after(&args, "-f").as_deref(), Some("dash"));
        assert_eq!(value_after(&args, "-seg_duration").as_deref(), Some("5"));
        assert!(!args.contains(&"-start_number".to_string()));
        assert_eq!(
            value_after(&args, "-adaptation_sets").as_deref(),
            Some("id=0,streams=v")
        );
        assert_eq!(
            value_after(&args, "-media_seg_name").as_deref(),
            Some("$RepresentationID$/chunk_$Number%05d$.m4s")
        );
        assert_eq!(args.last().map(String::as_str), Some("bunny.mpd"));
    }

    #[test]
    fn test_unsupported_requests_are_rejected() {
        assert!(FfmpegPackagingEngine::check_request(&segment_request(&["0", "1"])).is_ok());
        let err =
            FfmpegPackagingEngine::check_request(&segment_request(&["sd", "hd"])).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));

        let mut request = segment_request(&["0"]);
        request.start_number = 0;
        assert!(FfmpegPackagingEngine::check_request(&request).is_err());
    }

    #[test]
    fn test_children_run_next_to_their_output() {
        assert_eq!(
            parent_dir(Path::new("/out/.bunny.encode-1/bunny_low.mp4")),
            Some(Path::new("/out/.bunny.encode-1"))
        );
        assert_eq!(parent_dir(Path::new("bunny_low.mp4")), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let engine = FfmpegEncodingEngine::new("dashpack-no-such-ffmpeg");
        let request = TranscodeRequest {
            input: PathBuf::from("/in/bunny.mp4"),
            output: PathBuf::from("/tmp/out.mp4"),
            filters: Vec::new(),
            codec_options: Vec::new(),
            drop_audio: true,
            format: "mp4".to_string(),
        };
        let err = engine.transcode(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
