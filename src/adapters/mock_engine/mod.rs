//! In-process engine adapters
//!
//! These implement the engine ports without spawning ffmpeg. Encoded streams are
//! small text files recording the filters they were produced with, which the mock
//! probe reads back; the packaging mock lays out segments by expanding the request
//! templates exactly like the real muxer.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::EngineError;
use crate::domain::model::Representation;
use crate::domain::rules::NamingContract;
use crate::ports::*;

const MOCK_PROGRAM: &str = "mock";

fn failed(message: impl Into<String>) -> EngineError {
    EngineError::Failed {
        program: MOCK_PROGRAM.to_string(),
        status: "exit status: 1".to_string(),
        stderr: message.into(),
    }
}

fn io_failed(err: std::io::Error) -> EngineError {
    failed(err.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Encoding engine that writes a text description of the requested stream
#[derive(Default)]
pub struct MockEncodingEngine {
    failing: Vec<Representation>,
    keep_audio: bool,
    calls: Mutex<Vec<TranscodeRequest>>,
}

impl MockEncodingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every transcode targeting `representation`, after writing partial output
    pub fn with_failure_for(mut self, representation: Representation) -> Self {
        self.failing.push(representation);
        self
    }

    /// Ignore `drop_audio`, producing streams that still carry audio
    pub fn with_audio_kept(mut self) -> Self {
        self.keep_audio = true;
        self
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<TranscodeRequest> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl EncodingEngine for MockEncodingEngine {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), EngineError> {
        lock(&self.calls).push(request.clone());

        if !request.input.is_file() {
            return Err(failed(format!(
                "{}: No such file or directory",
                request.input.display()
            )));
        }

        if self
            .failing
            .iter()
            .any(|rep| request.filters.contains(&rep.scale_filter()))
        {
            // Leave a truncated file behind like a crashed encoder would
            std::fs::write(&request.output, b"truncated").map_err(io_failed)?;
            return Err(failed("Error while encoding: injected failure"));
        }

        let has_audio = self.keep_audio || !request.drop_audio;
        let content = format!("filters={}\naudio={}\n", request.filters.join(","), has_audio);
        std::fs::write(&request.output, content).map_err(io_failed)
    }
}

/// Probe that reads back streams written by [`MockEncodingEngine`]
#[derive(Default)]
pub struct MockProbeAdapter;

impl MockProbeAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProbePort for MockProbeAdapter {
    async fn probe_stream(&self, path: &Path) -> Result<StreamProbe, EngineError> {
        let content = std::fs::read_to_string(path).map_err(io_failed)?;

        let mut width = None;
        let mut height = None;
        let mut frame_rate = None;
        let mut has_audio = false;

        for line in content.lines() {
            if let Some(filters) = line.strip_prefix("filters=") {
                for filter in filters.split(',') {
                    if let Some(size) = filter.strip_prefix("scale=") {
                        let (w, h) = size
                            .split_once(':')
                            .ok_or_else(|| EngineError::Malformed(size.to_string()))?;
                        width = w.parse().ok();
                        height = h.parse().ok();
                    } else if let Some(fps) = filter.strip_prefix("fps=") {
                        frame_rate = fps.parse().ok();
                    }
                }
            } else if let Some(audio) = line.strip_prefix("audio=") {
                has_audio = audio == "true";
            }
        }

        match (width, height, frame_rate) {
            (Some(width), Some(height), Some(frame_rate)) => Ok(StreamProbe {
                width,
                height,
                frame_rate,
                has_audio,
                duration: None,
            }),
            _ => Err(EngineError::Malformed(format!(
                "{} is not a mock stream",
                path.display()
            ))),
        }
    }
}

/// Packaging engine that writes a manifest and empty segment files
pub struct MockPackagingEngine {
    media_duration: f64,
    fail: bool,
    failing_manifests: Vec<String>,
    process_cwd: bool,
    calls: Mutex<Vec<SegmentRequest>>,
    observed_cwds: Mutex<Vec<PathBuf>>,
}

impl Default for MockPackagingEngine {
    fn default() -> Self {
        Self {
            media_duration: 12.0,
            fail: false,
            failing_manifests: Vec::new(),
            process_cwd: false,
            calls: Mutex::new(Vec::new()),
            observed_cwds: Mutex::new(Vec::new()),
        }
    }
}

impl MockPackagingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of every input stream, in seconds
    pub fn with_media_duration(mut self, seconds: f64) -> Self {
        self.media_duration = seconds;
        self
    }

    /// Fail midway, after the manifest and some segments were written
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Fail like [`failing`](Self::failing), only for the asset named `asset_name`
    pub fn failing_for(mut self, asset_name: &str) -> Self {
        self.failing_manifests
            .push(NamingContract::manifest_file_name(asset_name));
        self
    }

    /// Resolve relative paths against the process working directory
    pub fn with_process_cwd(mut self) -> Self {
        self.process_cwd = true;
        self
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<SegmentRequest> {
        lock(&self.calls).clone()
    }

    /// Process working directory seen by each call
    pub fn observed_cwds(&self) -> Vec<PathBuf> {
        lock(&self.observed_cwds).clone()
    }

    fn resolve(&self, request: &SegmentRequest, relative: &str) -> PathBuf {
        if self.process_cwd {
            PathBuf::from(relative)
        } else {
            request.cwd.join(relative)
        }
    }

    fn manifest(&self, request: &SegmentRequest) -> String {
        let timescale = 1000;
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str(&format!(
            "<MPD xmlns=\"urn:mpeg:dash:schema:mpd:2011\" type=\"static\" mediaPresentationDuration=\"PT{}S\" minBufferTime=\"PT{}S\">\n",
            self.media_duration, request.segment_duration
        ));
        xml.push_str("  <Period id=\"0\" start=\"PT0S\">\n");
        xml.push_str("    <AdaptationSet id=\"0\" contentType=\"video\" segmentAlignment=\"true\">\n");
        for id in &request.representation_ids {
            xml.push_str(&format!(
                "      <Representation id=\"{}\" mimeType=\"video/mp4\" codecs=\"av01\">\n",
                id
            ));
            xml.push_str(&format!(
                "        <SegmentTemplate timescale=\"{}\" duration=\"{}\" initialization=\"{}\" media=\"{}\" startNumber=\"{}\"/>\n",
                timescale,
                (request.segment_duration * timescale as f64) as u64,
                request.init_template,
                request.media_template,
                request.start_number
            ));
            xml.push_str("      </Representation>\n");
        }
        xml.push_str("    </AdaptationSet>\n  </Period>\n</MPD>\n");
        xml
    }
}

#[async_trait]
impl PackagingEngine for MockPackagingEngine {
    async fn segment(&self, request: &SegmentRequest) -> Result<(), EngineError> {
        lock(&self.calls).push(request.clone());
        if let Ok(cwd) = std::env::current_dir() {
            lock(&self.observed_cwds).push(cwd);
        }

        if request.inputs.len() != request.representation_ids.len() {
            return Err(failed("input and representation counts differ"));
        }
        for input in &request.inputs {
            if !input.is_file() {
                return Err(failed(format!("{}: No such file", input.display())));
            }
        }

        std::fs::write(self.resolve(request, &request.manifest), self.manifest(request))
            .map_err(io_failed)?;

        let count =
            NamingContract::expected_segment_count(self.media_duration, request.segment_duration);
        for id in &request.representation_ids {
            let init = NamingContract::expand_template(&request.init_template, id, None);
            std::fs::write(self.resolve(request, &init), b"init").map_err(io_failed)?;

            for offset in 0..count as u32 {
                let number = request.start_number + offset;
                let media = NamingContract::expand_template(&request.media_template, id, Some(number));
                std::fs::write(self.resolve(request, &media), b"media").map_err(io_failed)?;
            }

            if self.fail || self.failing_manifests.contains(&request.manifest) {
                return Err(failed("Conversion failed: injected packaging failure"));
            }
        }

        Ok(())
    }

    fn requires_process_cwd(&self) -> bool {
        self.process_cwd
    }
}
