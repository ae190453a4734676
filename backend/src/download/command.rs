//! Argument vector construction for yt-dlp

use super::parse::{FIELD_DELIMITER, RECORD_SENTINEL};
use super::process;
use super::request::{Container, DownloadRequest, Mode};
use std::process::Stdio;
use tokio::process::Command;

/// Extension placeholder every output template must end with
pub const EXT_PLACEHOLDER: &str = ".%(ext)s";

const PLAYLIST_TEMPLATE: &str = "%(playlist_title)s/%(playlist_index)s - %(title)s.%(ext)s";
const DEFAULT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Quality tier label to maximum video height
const HEIGHTS: [(&str, u32); 7] = [
    ("144", 144),
    ("240", 240),
    ("360", 360),
    ("720", 720),
    ("1440", 1440),
    ("2k", 1440),
    ("4k", 2160),
];

/// Height used when the tier label is not recognised
const FALLBACK_HEIGHT: u32 = 720;

/// Keyword searched in the lowercased audio label to codec name, first hit wins
const AUDIO_CODECS: [(&str, &str); 5] = [
    ("opus", "opus"),
    ("aac", "aac"),
    ("m4a", "m4a"),
    ("vorbis", "vorbis"),
    ("wav", "wav"),
];
const DEFAULT_AUDIO_CODEC: &str = "mp3";

/// Keyword to yt-dlp `--audio-quality` value (0 is best, 10 is worst)
const AUDIO_QUALITIES: [(&str, &str); 2] = [("high", "0"), ("medium", "5")];
const LOWEST_AUDIO_QUALITY: &str = "10";

/// Upper bound on video height for a quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightLimit {
    Max(u32),
    Unbounded,
}

/// Resolve a quality tier label. Accepts "720" as well as "720p";
/// "best"/"Best Possible" is unbounded, anything unknown is 720.
pub fn height_limit(tier: &str) -> HeightLimit {
    let tier = tier.trim().to_lowercase();
    if tier.starts_with("best") {
        return HeightLimit::Unbounded;
    }

    let key = tier.strip_suffix('p').unwrap_or(&tier);
    let height = HEIGHTS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, h)| *h)
        .unwrap_or(FALLBACK_HEIGHT);

    HeightLimit::Max(height)
}

/// yt-dlp `-f` expression for a quality tier
pub fn format_expression(tier: &str) -> String {
    match height_limit(tier) {
        HeightLimit::Unbounded => "bv+ba/b".to_string(),
        HeightLimit::Max(h) => format!("bv*[height<={h}]+ba/b[height<={h}]"),
    }
}

/// Target codec for a descriptive audio label
pub fn audio_codec(label: &str) -> &'static str {
    let label = label.to_lowercase();
    AUDIO_CODECS
        .iter()
        .find(|(keyword, _)| label.contains(keyword))
        .map(|(_, codec)| *codec)
        .unwrap_or(DEFAULT_AUDIO_CODEC)
}

/// yt-dlp audio quality code for a descriptive audio label
pub fn audio_quality(label: &str) -> &'static str {
    let label = label.to_lowercase();
    AUDIO_QUALITIES
        .iter()
        .find(|(keyword, _)| label.contains(keyword))
        .map(|(_, code)| *code)
        .unwrap_or(LOWEST_AUDIO_QUALITY)
}

/// Append the extension placeholder unless the template already ends with it
pub fn ensure_extension(template: &str) -> String {
    if template.ends_with(EXT_PLACEHOLDER) {
        template.to_string()
    } else {
        format!("{template}{EXT_PLACEHOLDER}")
    }
}

/// The `--print` template whose output the runner parses back
pub fn print_template() -> String {
    let fields = [
        "%(filepath)s",
        "%(title)s",
        "%(duration_string)s",
        "%(filesize,filesize_approx)s",
    ];
    format!(
        "after_move:{}{}",
        RECORD_SENTINEL,
        fields.join(FIELD_DELIMITER)
    )
}

/// ffmpeg post-processor arguments setting artist and album tags.
/// Returns `None` when neither value is set.
pub fn metadata_args(artist: Option<&str>, album: Option<&str>) -> Option<String> {
    let tags: Vec<String> = [("artist", artist), ("album", album)]
        .into_iter()
        .filter_map(|(tag, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| format!("-metadata {tag}={}", quote(value)))
        })
        .collect();

    if tags.is_empty() {
        None
    } else {
        Some(format!("ffmpeg:{}", tags.join(" ")))
    }
}

/// Double-quote a value for yt-dlp's shell-style splitting of
/// post-processor arguments
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Build the full argument vector (without the program itself).
/// The URL is always last.
pub fn build_args(request: &DownloadRequest<'_>) -> Vec<String> {
    let opts = request.options;
    let mut args: Vec<String> = Vec::new();

    let custom = opts
        .custom_template
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let (template, playlist_flag) = if opts.playlist {
        (PLAYLIST_TEMPLATE.to_string(), "--yes-playlist")
    } else if let Some(template) = custom {
        (ensure_extension(template), "--no-playlist")
    } else {
        (DEFAULT_TEMPLATE.to_string(), "--no-playlist")
    };
    args.push("-o".to_string());
    args.push(template);
    args.push(playlist_flag.to_string());

    args.push("--print".to_string());
    args.push(print_template());

    if opts.subtitles {
        args.extend(["--write-subs", "--sub-langs", "en,.*"].map(String::from));
    }

    if let Some(ffmpeg) = opts.ffmpeg_path.as_ref() {
        if !ffmpeg.as_os_str().is_empty() && ffmpeg.exists() {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }
    }

    match opts.mode {
        Mode::Video => {
            args.push("-f".to_string());
            args.push(format_expression(&opts.quality));
            let (sort, container) = match opts.container {
                Container::Webm => ("vcodec:vp9", "webm"),
                Container::Mp4 => ("vcodec:h264", "mp4"),
            };
            args.extend(["-S", sort, "--merge-output-format", container].map(String::from));
        }
        Mode::Audio => {
            let codec = audio_codec(&opts.audio_format);
            let quality = audio_quality(&opts.audio_format);
            args.extend(
                ["-x", "--audio-format", codec, "--audio-quality", quality].map(String::from),
            );
            if let Some(meta) = metadata_args(opts.artist.as_deref(), opts.album.as_deref()) {
                args.push("--postprocessor-args".to_string());
                args.push(meta);
            }
        }
    }

    args.push(request.url.to_string());
    args
}

/// Build a ready-to-spawn process: working directory set to the output
/// directory, both output streams piped, stdin closed.
pub fn build_command(request: &DownloadRequest<'_>) -> Command {
    let mut cmd = process::command(&request.options.ytdlp_path);
    cmd.args(build_args(request))
        .current_dir(&request.options.output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Human readable rendering of a command line for debug output
pub fn render_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| {
            if part.is_empty() || part.contains(char::is_whitespace) {
                format!("\"{part}\"")
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadOptions;
    use std::path::PathBuf;

    fn options() -> DownloadOptions {
        DownloadOptions {
            quality: "720".into(),
            audio_format: "MP3".into(),
            ytdlp_path: PathBuf::from("/usr/bin/yt-dlp"),
            output_dir: PathBuf::from("/out"),
            ..Default::default()
        }
    }

    fn args_for(opts: &DownloadOptions) -> Vec<String> {
        build_args(&DownloadRequest::new("https://example.com/v", opts))
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        let pos = args.iter().position(|a| a == flag)?;
        args.get(pos + 1).cloned()
    }

    #[test]
    fn quality_tiers_map_to_heights() {
        let cases = [
            ("144", "144"),
            ("240", "240"),
            ("360", "360"),
            ("720", "720"),
            ("1440", "1440"),
            ("2k", "1440"),
            ("4k", "2160"),
        ];
        for (tier, height) in cases {
            assert_eq!(
                format_expression(tier),
                format!("bv*[height<={height}]+ba/b[height<={height}]"),
                "tier {tier}"
            );
        }
        assert_eq!(format_expression("best"), "bv+ba/b");
        assert_eq!(format_expression("Best Possible"), "bv+ba/b");
    }

    #[test]
    fn unknown_tier_falls_back_to_720() {
        assert_eq!(height_limit("1080"), HeightLimit::Max(720));
        assert_eq!(height_limit(""), HeightLimit::Max(720));
        assert_eq!(height_limit("4K"), HeightLimit::Max(2160));
        assert_eq!(height_limit("360p"), HeightLimit::Max(360));
    }

    #[test]
    fn audio_quality_codes() {
        assert_eq!(audio_quality("MP3 - High Quality"), "0");
        assert_eq!(audio_quality("Opus (medium)"), "5");
        assert_eq!(audio_quality("WAV"), "10");
        assert_eq!(audio_quality("Low"), "10");
    }

    #[test]
    fn audio_codec_fuzzy_match() {
        assert_eq!(audio_codec("Opus - Best Efficiency"), "opus");
        assert_eq!(audio_codec("AAC (High)"), "aac");
        assert_eq!(audio_codec("M4A"), "m4a");
        assert_eq!(audio_codec("Ogg Vorbis"), "vorbis");
        assert_eq!(audio_codec("WAV lossless"), "wav");
        assert_eq!(audio_codec("FLAC"), "mp3");
    }

    #[test]
    fn custom_template_gets_extension_once() {
        assert_eq!(ensure_extension("%(title)s"), "%(title)s.%(ext)s");
        assert_eq!(ensure_extension("%(title)s.%(ext)s"), "%(title)s.%(ext)s");

        let mut opts = options();
        opts.custom_template = Some("%(uploader)s - %(title)s".into());
        let args = args_for(&opts);
        assert_eq!(
            value_after(&args, "-o").as_deref(),
            Some("%(uploader)s - %(title)s.%(ext)s")
        );
        assert!(args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn playlist_wins_over_custom_template() {
        let mut opts = options();
        opts.playlist = true;
        opts.custom_template = Some("ignored".into());
        let args = args_for(&opts);
        assert_eq!(value_after(&args, "-o").as_deref(), Some(PLAYLIST_TEMPLATE));
        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(!args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn blank_custom_template_uses_default() {
        let mut opts = options();
        opts.custom_template = Some("   ".into());
        let args = args_for(&opts);
        assert_eq!(value_after(&args, "-o").as_deref(), Some(DEFAULT_TEMPLATE));
    }

    #[test]
    fn print_template_is_always_present() {
        let args = args_for(&options());
        assert_eq!(
            value_after(&args, "--print").as_deref(),
            Some("after_move:DATA::%(filepath)s::%(title)s::%(duration_string)s::%(filesize,filesize_approx)s")
        );
    }

    #[test]
    fn url_is_last() {
        let mut opts = options();
        opts.mode = Mode::Audio;
        opts.artist = Some("Someone".into());
        let args = args_for(&opts);
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/v"));
    }

    #[test]
    fn subtitles_flags() {
        let mut opts = options();
        opts.subtitles = true;
        let args = args_for(&opts);
        assert_eq!(value_after(&args, "--sub-langs").as_deref(), Some("en,.*"));
        assert!(args.contains(&"--write-subs".to_string()));
    }

    #[test]
    fn ffmpeg_location_only_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = dir.path().join("ffmpeg");
        std::fs::write(&ffmpeg, b"").unwrap();

        let mut opts = options();
        opts.ffmpeg_path = Some(dir.path().join("missing-ffmpeg"));
        assert!(!args_for(&opts).contains(&"--ffmpeg-location".to_string()));

        opts.ffmpeg_path = Some(ffmpeg.clone());
        assert_eq!(
            value_after(&args_for(&opts), "--ffmpeg-location"),
            Some(ffmpeg.to_string_lossy().into_owned())
        );
    }

    #[test]
    fn video_container_directives() {
        let mut opts = options();
        opts.container = Container::from_label("WebM (VP9)");
        let args = args_for(&opts);
        assert_eq!(value_after(&args, "-S").as_deref(), Some("vcodec:vp9"));
        assert_eq!(value_after(&args, "--merge-output-format").as_deref(), Some("webm"));

        opts.container = Container::from_label("MP4 (H264)");
        let args = args_for(&opts);
        assert_eq!(value_after(&args, "-S").as_deref(), Some("vcodec:h264"));
        assert_eq!(value_after(&args, "--merge-output-format").as_deref(), Some("mp4"));
    }

    #[test]
    fn audio_mode_arguments() {
        let mut opts = options();
        opts.mode = Mode::Audio;
        opts.audio_format = "Opus - Medium".into();
        let args = args_for(&opts);
        assert!(args.contains(&"-x".to_string()));
        assert_eq!(value_after(&args, "--audio-format").as_deref(), Some("opus"));
        assert_eq!(value_after(&args, "--audio-quality").as_deref(), Some("5"));
        assert!(!args.contains(&"-f".to_string()));
        assert!(!args.contains(&"--postprocessor-args".to_string()));
    }

    #[test]
    fn metadata_omits_empty_tags() {
        assert_eq!(metadata_args(None, None), None);
        assert_eq!(metadata_args(Some(""), Some("  ")), None);
        assert_eq!(
            metadata_args(Some("Daft Punk"), None).as_deref(),
            Some("ffmpeg:-metadata artist=\"Daft Punk\"")
        );
        assert_eq!(
            metadata_args(Some("A"), Some("B")).as_deref(),
            Some("ffmpeg:-metadata artist=\"A\" -metadata album=\"B\"")
        );
    }

    #[test]
    fn metadata_values_cannot_escape_quotes() {
        let meta = metadata_args(Some("The \"Best\" Band"), None).unwrap();
        assert_eq!(meta, "ffmpeg:-metadata artist=\"The \\\"Best\\\" Band\"");
    }

    #[test]
    fn metadata_stays_one_argument() {
        let mut opts = options();
        opts.mode = Mode::Audio;
        opts.artist = Some("A; rm -rf /".into());
        opts.album = Some("B".into());
        let args = args_for(&opts);
        let pos = args.iter().position(|a| a == "--postprocessor-args").unwrap();
        assert!(args[pos + 1].starts_with("ffmpeg:-metadata artist="));
        assert_eq!(args.len(), pos + 3);
    }

    #[test]
    fn render_quotes_whitespace() {
        let line = render_command_line(
            "yt-dlp",
            &["-o".into(), "%(title)s.%(ext)s".into(), "a b".into()],
        );
        assert_eq!(line, "yt-dlp -o %(title)s.%(ext)s \"a b\"");
    }
}
