//! Target name derivation
//!
//! A group's new stem comes from the capture time of its primary file:
//! EXIF date tags first, then a timestamp embedded in the file name, then
//! (when enabled) the modification time. Groups without any usable time get
//! no name.

use crate::error::{Error, Result};
use crate::group::{FileGroup, NextName, SrcFile};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag};
use regex::Regex;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Where a capture time was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Exif,
    Filename,
    FileSystem,
}

/// Naming settings shared by every enrichment worker
#[derive(Debug, Clone)]
pub struct NamingOptions {
    pub name_format: String,
    pub mtime_fallback: bool,
}

/// Derive the target name of a renameable group
pub fn derive(group: &FileGroup, options: &NamingOptions) -> Option<NextName> {
    let (time, source) = candidates(group)
        .into_iter()
        .find_map(|file| capture_time(&file.absolute_path, options.mtime_fallback))?;

    let primary = group.primary()?;
    let next_stem = format_stem(&time, &options.name_format)?;
    debug!(key = %group.key(), ?source, %next_stem, "Derived target name");

    Some(NextName {
        key: group.key().clone(),
        next_path: primary.renamed_path(&next_stem),
        next_stem,
    })
}

/// Files whose metadata may name the group, best first
fn candidates(group: &FileGroup) -> Vec<&SrcFile> {
    match group {
        FileGroup::LiveImage { image, video, .. } => vec![image, video],
        other => other.primary().into_iter().collect(),
    }
}

/// Capture time of one file, trying every source in priority order
pub fn capture_time(path: &Path, mtime_fallback: bool) -> Option<(NaiveDateTime, TimeSource)> {
    match exif_time(path) {
        Ok(time) => return Some((time, TimeSource::Exif)),
        Err(e) => trace!(?path, error = %e, "No EXIF time"),
    }

    if let Some(time) = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(filename_time)
    {
        return Some((time, TimeSource::Filename));
    }

    if mtime_fallback {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        let local: DateTime<Local> = modified.into();
        return Some((local.naive_local(), TimeSource::FileSystem));
    }
    None
}

/// Format `time` with a strftime pattern; `None` for patterns chrono rejects
/// or that would leave the directory.
pub fn format_stem(time: &NaiveDateTime, format: &str) -> Option<String> {
    let mut stem = String::new();
    write!(stem, "{}", time.format(format)).ok()?;
    if stem.is_empty() || stem.contains(['/', '\\']) {
        return None;
    }
    Some(stem)
}

/// EXIF tags holding a capture date, most specific first
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

fn exif_time(path: &Path) -> Result<NaiveDateTime> {
    let file = File::open(path)?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .map_err(|e| Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    DATE_TAGS
        .iter()
        .filter_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .find_map(|field| parse_exif_datetime(&field.display_value().to_string()))
        .ok_or_else(|| Error::ExifRead {
            path: path.to_path_buf(),
            message: "no date tag".to_string(),
        })
}

/// EXIF dates print as `2024-01-15 14:30:00`; raw values use colons
fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_matches('"');
    ["%Y-%m-%d %H:%M:%S", "%Y:%m:%d %H:%M:%S", "%Y:%m:%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// `20240115_143000`, `IMG_20240115_143000`, `PXL_20240115_143000123`
fn compact_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4})(\d{2})(\d{2})[_\-T ]?(\d{2})(\d{2})(\d{2})").expect("valid regex")
    })
}

/// `2024-01-15_14-30-00`, `2024-01-15 14.30.00`, our own output format
fn separated_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4})[-_.](\d{2})[-_.](\d{2})[-_ T](\d{2})[-_.:](\d{2})[-_.:](\d{2})")
            .expect("valid regex")
    })
}

/// `IMG-20240115-WA0001`; the date carries no time of day
fn messenger_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:IMG|VID)-(\d{4})(\d{2})(\d{2})-WA\d+").expect("valid regex")
    })
}

/// Timestamp embedded in a file stem
pub fn filename_time(stem: &str) -> Option<NaiveDateTime> {
    for pattern in [separated_pattern(), compact_pattern()] {
        if let Some(caps) = pattern.captures(stem) {
            let parts: Vec<u32> = (1..=6)
                .filter_map(|i| caps.get(i)?.as_str().parse().ok())
                .collect();
            if let &[y, mo, d, h, mi, s] = parts.as_slice() {
                if let Some(time) = build_datetime(y, mo, d, h, mi, s) {
                    return Some(time);
                }
            }
        }
    }

    let caps = messenger_pattern().captures(stem)?;
    let y = caps.get(1)?.as_str().parse().ok()?;
    let mo = caps.get(2)?.as_str().parse().ok()?;
    let d = caps.get(3)?.as_str().parse().ok()?;
    build_datetime(y, mo, d, 0, 0, 0)
}

fn build_datetime(
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<NaiveDateTime> {
    if !(1990..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupKey;
    use crate::group::fixtures::src;
    use chrono::{Datelike, TimeZone, Timelike};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn options() -> NamingOptions {
        NamingOptions {
            name_format: "%Y-%m-%d_%H.%M.%S".to_string(),
            mtime_fallback: false,
        }
    }

    #[test]
    fn test_parse_exif_datetime() {
        assert_eq!(parse_exif_datetime("2024-01-15 14:30:00"), Some(at(2024, 1, 15, 14, 30, 0)));
        assert_eq!(
            parse_exif_datetime("\"2024:01:15 14:30:00\""),
            Some(at(2024, 1, 15, 14, 30, 0))
        );
        assert!(parse_exif_datetime("unknown").is_none());
    }

    #[test]
    fn test_filename_patterns() {
        let expected = at(2024, 1, 15, 14, 30, 0);
        for stem in [
            "20240115_143000",
            "IMG_20240115_143000",
            "VID_20240115-143000",
            "PXL_20240115_143000123",
            "2024-01-15_14-30-00",
            "2024-01-15_14.30.00",
            "Screenshot 2024-01-15 14.30.00",
        ] {
            assert_eq!(filename_time(stem), Some(expected), "{stem}");
        }

        let dt = filename_time("IMG-20240115-WA0001").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 1, 15, 0));
    }

    #[test]
    fn test_filename_without_time() {
        assert!(filename_time("holiday").is_none());
        assert!(filename_time("IMG_0001").is_none());
        assert!(filename_time("19800101_000000").is_none());
        assert!(filename_time("20241301_000000").is_none());
    }

    #[test]
    fn test_format_stem() {
        let time = at(2024, 1, 15, 14, 30, 5);
        assert_eq!(format_stem(&time, "%Y-%m-%d_%H.%M.%S").as_deref(), Some("2024-01-15_14.30.05"));
        assert_eq!(format_stem(&time, "%Y%m%d").as_deref(), Some("20240115"));
        assert!(format_stem(&time, "%Y/%m").is_none());
        assert!(format_stem(&time, "%Q").is_none());
    }

    #[test]
    fn test_derive_from_filename() {
        let group = FileGroup::Image {
            key: GroupKey::new("IMG_20240115_143000"),
            primary: src("IMG_20240115_143000.jpg"),
            sidecars: vec![],
        };
        let next = derive(&group, &options()).unwrap();
        assert_eq!(next.key, GroupKey::new("IMG_20240115_143000"));
        assert_eq!(next.next_stem, "2024-01-15_14.30.00");
        assert_eq!(next.next_path, PathBuf::from("/src/2024-01-15_14.30.00.jpg"));
    }

    #[test]
    fn test_live_image_falls_back_to_video_name() {
        let group = FileGroup::LiveImage {
            key: GroupKey::new("live"),
            image: src("live.heic"),
            video: src("VID_20230301_080910.mov"),
            sidecars: vec![],
        };
        let next = derive(&group, &options()).unwrap();
        assert_eq!(next.next_stem, "2023-03-01_08.09.10");
        assert_eq!(next.next_path, PathBuf::from("/src/2023-03-01_08.09.10.heic"));
    }

    #[test]
    fn test_no_time_means_no_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("holiday.jpg");
        fs::write(&path, b"not a jpeg").unwrap();
        let group = FileGroup::Image {
            key: GroupKey::new("holiday"),
            primary: SrcFile::new(&path, dir.path()),
            sidecars: vec![],
        };

        assert!(derive(&group, &options()).is_none());

        let with_mtime = NamingOptions {
            mtime_fallback: true,
            ..options()
        };
        let next = derive(&group, &with_mtime).unwrap();
        assert_eq!(next.next_path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_mtime_is_read_as_local_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        fs::write(&path, b"png").unwrap();

        let modified = Local
            .from_local_datetime(&at(2023, 6, 1, 8, 0, 0))
            .single()
            .unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(modified.into()))
            .unwrap();

        let (time, source) = capture_time(&path, true).unwrap();
        assert_eq!(source, TimeSource::FileSystem);
        assert_eq!(
            format_stem(&time, &options().name_format).as_deref(),
            Some("2023-06-01_08.00.00")
        );
        assert!(capture_time(&path, false).is_none());
    }
}
