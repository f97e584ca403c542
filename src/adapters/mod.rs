// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_local;
pub mod mock_engine;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::{FfmpegEncodingEngine, FfmpegPackagingEngine};
pub use fs_local::FsLocalAdapter;
pub use mock_engine::{MockEncodingEngine, MockPackagingEngine, MockProbeAdapter};
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::{LogLevel, TracingLogAdapter};
