//! Capture-date resolution with a three-tier fallback.
//!
//! Embedded capture time wins, then the file's modification time, then
//! today's date. A usable date is always produced; parse failures only
//! move resolution down one tier.

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use std::path::Path;

/// Where a resolved date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// Embedded capture-time metadata
    Embedded,
    /// Source file modification time
    Modified,
    /// Wall-clock date at processing time
    Today,
}

/// A calendar date used to group output names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

impl ResolvedDate {
    /// `YYYYMMDD` key used in output names.
    pub fn day_key(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

/// Resolves the capture date of a source image.
pub struct DateResolver;

impl DateResolver {
    /// Resolve a date from embedded capture time, falling back to the file's
    /// modification time and finally to today.
    pub fn resolve(captured_at: Option<&str>, source_path: &Path) -> ResolvedDate {
        if let Some(raw) = captured_at {
            match parse_capture_time(raw) {
                Some(date) => {
                    return ResolvedDate {
                        date,
                        source: DateSource::Embedded,
                    }
                }
                None => tracing::debug!("Unparseable capture time {raw:?} in {source_path:?}"),
            }
        }

        match modified_date(source_path) {
            Ok(date) => ResolvedDate {
                date,
                source: DateSource::Modified,
            },
            Err(e) => {
                tracing::debug!("No modification time for {source_path:?}: {e}");
                ResolvedDate {
                    date: Local::now().date_naive(),
                    source: DateSource::Today,
                }
            }
        }
    }
}

/// Parse an EXIF-style `YYYY:MM:DD HH:MM:SS` string, or any ISO-like
/// variant once the date-portion colons become dashes.
///
/// The time may be given to the hour, minute, second or fraction, separated
/// by a space or `T`, and may carry a `Z` or `±HH[:MM]` offset. The offset
/// does not shift the calendar date.
pub fn parse_capture_time(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let (head, rest) = (raw.get(..10)?, raw.get(10..)?);
    let date = NaiveDate::parse_from_str(&head.replace(':', "-"), "%Y-%m-%d").ok()?;
    if rest.is_empty() {
        return Some(date);
    }

    let time = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('T'))?;
    let (clock, offset) = split_offset(time);
    (parse_clock(clock) && offset.map_or(true, parse_offset)).then_some(date)
}

/// Split a trailing `Z` or `±offset` off a time of day.
fn split_offset(time: &str) -> (&str, Option<&str>) {
    if let Some(clock) = time.strip_suffix(['Z', 'z']) {
        return (clock, None);
    }
    match time.find(['+', '-']) {
        Some(at) => (&time[..at], Some(&time[at + 1..])),
        None => (time, None),
    }
}

fn parse_clock(clock: &str) -> bool {
    const CLOCK_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
    CLOCK_FORMATS
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(clock, fmt).is_ok())
        || is_hour(clock)
}

fn parse_offset(offset: &str) -> bool {
    ["%H:%M", "%H%M"]
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(offset, fmt).is_ok())
        || is_hour(offset)
}

fn is_hour(s: &str) -> bool {
    s.len() == 2 && s.parse::<u32>().is_ok_and(|h| h < 24)
}

fn modified_date(path: &Path) -> std::io::Result<NaiveDate> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs::File;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn set_mtime(path: &Path, date: NaiveDate) {
        let local = Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .single()
            .unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(local.into()).unwrap();
    }

    #[test]
    fn test_parse_exif_format() {
        assert_eq!(parse_capture_time("2023:07:04 10:00:00"), Some(ymd(2023, 7, 4)));
    }

    #[test]
    fn test_parse_iso_variants() {
        assert_eq!(parse_capture_time("2023-07-04 10:00:00"), Some(ymd(2023, 7, 4)));
        assert_eq!(parse_capture_time("2023:07:04T10:00:00"), Some(ymd(2023, 7, 4)));
        assert_eq!(
            parse_capture_time("2023:07:04 10:00:00.123"),
            Some(ymd(2023, 7, 4))
        );
        assert_eq!(parse_capture_time("2023:07:04"), Some(ymd(2023, 7, 4)));
    }

    #[test]
    fn test_parse_minute_and_hour_precision() {
        for raw in [
            "2023:07:04 10:00",
            "2023:07:04T10:00",
            "2023:07:04 10",
            "2023:07:04T10",
        ] {
            assert_eq!(parse_capture_time(raw), Some(ymd(2023, 7, 4)), "{raw}");
        }
    }

    #[test]
    fn test_parse_with_offsets() {
        for raw in [
            "2023:07:04 10:00:00+02:00",
            "2023:07:04T10:00:00Z",
            "2023-07-04T10:00-05:00",
            "2023:07:04 10:00:00.5+0530",
            "2023:07:04T23+01",
        ] {
            assert_eq!(parse_capture_time(raw), Some(ymd(2023, 7, 4)), "{raw}");
        }
    }

    #[test]
    fn test_parse_rejects_bad_time_part() {
        assert_eq!(parse_capture_time("2023:07:04 25:00"), None);
        assert_eq!(parse_capture_time("2023:07:04 10:00 later"), None);
        assert_eq!(parse_capture_time("2023:07:04X10:00:00"), None);
        assert_eq!(parse_capture_time("2023:07:04 10:00+99:00"), None);
        assert_eq!(parse_capture_time("2023:07:04 "), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_capture_time(""), None);
        assert_eq!(parse_capture_time("0000:00:00 00:00:00"), None);
        assert_eq!(parse_capture_time("yesterday"), None);
        assert_eq!(parse_capture_time("2023:13:40 10:00:00"), None);
    }

    #[test]
    fn test_resolve_prefers_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"x").unwrap();
        set_mtime(&path, ymd(2020, 5, 5));

        let resolved = DateResolver::resolve(Some("2023:07:04 10:00:00"), &path);
        assert_eq!(resolved.date, ymd(2023, 7, 4));
        assert_eq!(resolved.source, DateSource::Embedded);
        assert_eq!(resolved.day_key(), "20230704");
    }

    #[test]
    fn test_resolve_corrupt_embedded_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.png");
        std::fs::write(&path, b"x").unwrap();
        set_mtime(&path, ymd(2023, 1, 1));

        let resolved = DateResolver::resolve(Some("not a date"), &path);
        assert_eq!(resolved.date, ymd(2023, 1, 1));
        assert_eq!(resolved.source, DateSource::Modified);
    }

    #[test]
    fn test_resolve_missing_embedded_uses_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.png");
        std::fs::write(&path, b"x").unwrap();
        set_mtime(&path, ymd(2023, 1, 1));

        let resolved = DateResolver::resolve(None, &path);
        assert_eq!(resolved.day_key(), "20230101");
    }

    #[test]
    fn test_resolve_without_anything_is_today() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.jpg");

        let before = Local::now().date_naive();
        let resolved = DateResolver::resolve(None, &missing);
        let after = Local::now().date_naive();

        assert_eq!(resolved.source, DateSource::Today);
        assert!(resolved.date >= before - Duration::days(1));
        assert!(resolved.date <= after + Duration::days(1));
    }
}
