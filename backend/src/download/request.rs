//! Download request types

use std::path::PathBuf;

/// What the downloader should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Video,
    Audio,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Preferred video container and codec pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    /// H264 video merged into MP4
    #[default]
    Mp4,
    /// VP9 video merged into WebM
    Webm,
}

impl Container {
    /// Map a UI label such as "WebM (VP9)" or "MP4 (H264)"
    pub fn from_label(label: &str) -> Self {
        if label.to_lowercase().contains("webm") {
            Self::Webm
        } else {
            Self::Mp4
        }
    }
}

/// Options shared by every URL of one batch
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub mode: Mode,

    /// Download the whole playlist into a subfolder named after it
    pub playlist: bool,

    /// Fetch English and original-language subtitles
    pub subtitles: bool,

    /// Output filename template; the extension placeholder is added if missing
    pub custom_template: Option<String>,

    /// Video quality tier label ("720", "4k", "best", ...)
    pub quality: String,

    pub container: Container,

    /// Descriptive audio label, e.g. "Opus - High Quality"
    pub audio_format: String,

    pub artist: Option<String>,
    pub album: Option<String>,

    /// yt-dlp executable
    pub ytdlp_path: PathBuf,

    /// ffmpeg executable; only passed along when it exists
    pub ffmpeg_path: Option<PathBuf>,

    /// Working directory of the downloader and base for relative output paths
    pub output_dir: PathBuf,

    /// Log and dump the rendered command line before running it
    pub debug: bool,
}

/// One URL plus the batch options
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    pub options: &'a DownloadOptions,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(url: &'a str, options: &'a DownloadOptions) -> Self {
        Self { url, options }
    }
}
