//! Classification of downloader output lines

use crate::history::HistoryEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Prefix of the machine readable line requested via `--print`
pub const RECORD_SENTINEL: &str = "DATA::";
pub const FIELD_DELIMITER: &str = "::";
/// Sentinel, path, title, duration, size
const MIN_RECORD_FIELDS: usize = 5;

const PROGRESS_MARKER: &str = "[download]";

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)%").expect("percent pattern is valid"));

/// Download progress in percent, always within [0, 100]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent(f64);

impl ProgressEvent {
    pub fn new(percent: f64) -> Self {
        Self(percent.clamp(0.0, 100.0))
    }

    pub fn percent(&self) -> f64 {
        self.0
    }
}

/// A finished item as reported by the downloader
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Absolute path of the produced file
    pub path: PathBuf,
    pub title: String,
    pub duration: String,
    /// Raw size field as printed by the downloader
    pub size_bytes: String,
}

impl ResultRecord {
    pub fn size(&self) -> String {
        format_size(&self.size_bytes)
    }

    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            path: self.path.to_string_lossy().into_owned(),
            title: self.title.clone(),
            duration: self.duration.clone(),
            size: self.size(),
        }
    }
}

/// What a single output line means to the runner
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Progress(ProgressEvent),
    Record(ResultRecord),
    Info,
}

pub fn classify(line: &str, output_dir: &Path) -> LineKind {
    if let Some(record) = parse_record(line, output_dir) {
        return LineKind::Record(record);
    }
    match parse_progress(line) {
        Some(event) => LineKind::Progress(event),
        None => LineKind::Info,
    }
}

/// Parse a `[download]  45.5% of ...` line. The first number directly in
/// front of a `%` is taken and clamped.
pub fn parse_progress(line: &str) -> Option<ProgressEvent> {
    if !line.contains(PROGRESS_MARKER) || !line.contains('%') {
        return None;
    }

    let caps = PERCENT_RE.captures(line)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(ProgressEvent::new(percent))
}

/// Parse a `DATA::path::title::duration::size` line.
///
/// Path is the first field and size the last, so a title that itself
/// contains the delimiter survives intact.
pub fn parse_record(line: &str, output_dir: &Path) -> Option<ResultRecord> {
    if !line.starts_with(RECORD_SENTINEL) {
        return None;
    }

    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() < MIN_RECORD_FIELDS {
        return None;
    }

    let last = fields.len() - 1;
    let raw_path = fields[1].trim();
    if raw_path.is_empty() {
        return None;
    }

    Some(ResultRecord {
        path: absolute_path(output_dir, raw_path),
        title: fields[2..last - 1].join(FIELD_DELIMITER).trim().to_string(),
        duration: fields[last - 1].trim().to_string(),
        size_bytes: fields[last].trim().to_string(),
    })
}

/// Resolve `raw` against `base` when relative. Existing files are
/// canonicalized; otherwise the path is made absolute lexically.
pub fn absolute_path(base: &Path, raw: &str) -> PathBuf {
    let raw = Path::new(raw);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base.join(raw)
    };

    joined
        .canonicalize()
        .or_else(|_| std::path::absolute(&joined))
        .unwrap_or(joined)
}

/// Format a byte count as "1.5 KB" style text (1024 based, one decimal).
/// Anything that is not a finite number yields "N/A".
pub fn format_size(raw: &str) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let Ok(mut size) = raw.trim().parse::<f64>() else {
        return "N/A".to_string();
    };
    if !size.is_finite() {
        return "N/A".to_string();
    }

    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size("0"), "0.0 B");
        assert_eq!(format_size("1536"), "1.5 KB");
        assert_eq!(format_size("10485760"), "10.0 MB");
        assert_eq!(format_size("1073741824"), "1.0 GB");
        assert_eq!(format_size("5497558138880"), "5.0 TB");
        assert_eq!(format_size(" 2048.0\r"), "2.0 KB");
    }

    #[test]
    fn format_size_non_numeric() {
        assert_eq!(format_size("NA"), "N/A");
        assert_eq!(format_size(""), "N/A");
        assert_eq!(format_size("nan"), "N/A");
    }

    #[test]
    fn progress_line() {
        let event = parse_progress("[download]  45.5% of 10.00MiB at 1.00MiB/s ETA 00:05");
        assert_eq!(event.map(|e| e.percent()), Some(45.5));
    }

    #[test]
    fn progress_is_clamped() {
        let event = parse_progress("[download] 150% of ~3MiB");
        assert_eq!(event.map(|e| e.percent()), Some(100.0));
        assert_eq!(ProgressEvent::new(-3.0).percent(), 0.0);
    }

    #[test]
    fn progress_requires_marker_and_number() {
        assert_eq!(parse_progress("[info] 45.5% done"), None);
        assert_eq!(parse_progress("[download] Destination: a.mp4"), None);
        assert_eq!(parse_progress("[download] N/A% of ~"), None);
    }

    #[test]
    fn record_with_relative_path() {
        let record = parse_record(
            "DATA::video.mp4::My Title::00:03:21::10485760",
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(record.path, PathBuf::from("/out/video.mp4"));
        assert_eq!(record.title, "My Title");
        assert_eq!(record.duration, "00:03:21");
        assert_eq!(record.size(), "10.0 MB");

        let entry = record.to_history_entry();
        assert_eq!(entry.path, "/out/video.mp4");
        assert_eq!(entry.size, "10.0 MB");
    }

    #[test]
    fn record_with_absolute_path_is_kept() {
        let record =
            parse_record("DATA::/music/a.mp3::A::1:00::NA", Path::new("/out")).unwrap();
        assert_eq!(record.path, PathBuf::from("/music/a.mp3"));
        assert_eq!(record.size(), "N/A");
    }

    #[test]
    fn record_existing_file_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/clip.webm"), b"x").unwrap();

        let record = parse_record("DATA::sub/../sub/clip.webm::T::0:01::1", dir.path()).unwrap();
        assert_eq!(
            record.path,
            dir.path().join("sub/clip.webm").canonicalize().unwrap()
        );
    }

    #[test]
    fn truncated_record_is_ignored() {
        assert_eq!(parse_record("DATA::video.mp4::Title::00:01", Path::new("/out")), None);
        assert_eq!(parse_record("xDATA::a::b::c::d", Path::new("/out")), None);
    }

    #[test]
    fn title_containing_delimiter() {
        let record =
            parse_record("DATA::a.mp4::Part 1::Part 2::0:30::1024", Path::new("/out")).unwrap();
        assert_eq!(record.title, "Part 1::Part 2");
        assert_eq!(record.duration, "0:30");
        assert_eq!(record.size(), "1.0 KB");
    }

    #[test]
    fn classify_lines() {
        let out = Path::new("/out");
        assert!(matches!(
            classify("[download]  12.0% of 1MiB", out),
            LineKind::Progress(_)
        ));
        assert!(matches!(
            classify("DATA::a.mp4::t::1:00::100", out),
            LineKind::Record(_)
        ));
        assert_eq!(classify("[youtube] Extracting URL", out), LineKind::Info);
    }
}
