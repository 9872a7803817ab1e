use crate::error::DetectError;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Legacy screenshot names: "Screen Shot-2023-05-09..." or "SCR-20230509..."
static LEGACY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Screen Shot|SCR)-([0-9]{4}-[0-9]{2}-[0-9]{2}|[0-9]{8})")
        .expect("failed to compile screenshot name regex")
});

/// Media type sent to providers when magic bytes are inconclusive
const FALLBACK_MEDIA_TYPE: &str = "image/png";

/// A file selected for renaming, with the date taken from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Date exactly as it appears in the name
    pub raw_timestamp: String,
    /// Always YYYYMMDD
    pub date: String,
}

pub struct ScreenshotDetector;

impl ScreenshotDetector {
    /// Only these extensions are ever considered, case-insensitively
    pub fn is_supported_image(path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        matches!(extension.as_str(), "png" | "jpg" | "jpeg")
    }

    /// True when the name follows the legacy pattern, whether or not the
    /// embedded date is a real calendar date.
    pub fn matches_legacy_name(path: &Path) -> bool {
        Self::is_supported_image(path)
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| LEGACY_NAME_RE.is_match(name))
                .unwrap_or(false)
    }

    /// Returns `Ok(None)` for files that are simply not screenshots and an
    /// error only when the name matches but the hyphenated date is invalid.
    pub fn detect(path: &Path) -> Result<Option<Candidate>, DetectError> {
        if !Self::is_supported_image(path) {
            return Ok(None);
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };

        let Some(captures) = LEGACY_NAME_RE.captures(file_name) else {
            return Ok(None);
        };

        let raw = captures[1].to_string();
        let date = Self::normalize_date(&raw)?;

        log::debug!("Eligible: {} (date {})", file_name, date);

        Ok(Some(Candidate {
            path: path.to_path_buf(),
            raw_timestamp: raw,
            date,
        }))
    }

    /// Hyphenated dates are parsed as calendar dates; bare 8-digit dates are
    /// taken as written.
    fn normalize_date(raw: &str) -> Result<String, DetectError> {
        if !raw.contains('-') {
            return Ok(raw.to_string());
        }

        let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|source| {
            DetectError::InvalidDate {
                raw: raw.to_string(),
                source,
            }
        })?;

        Ok(parsed.format("%Y%m%d").to_string())
    }

    /// Media type of the image, from magic bytes
    pub fn media_type(bytes: &[u8]) -> &'static str {
        match infer::get(bytes) {
            Some(kind) if matches!(kind.matcher_type(), infer::MatcherType::Image) => {
                kind.mime_type()
            }
            _ => {
                log::debug!(
                    "Could not detect image type by magic bytes, assuming {}",
                    FALLBACK_MEDIA_TYPE
                );
                FALLBACK_MEDIA_TYPE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(name: &str) -> Option<Candidate> {
        ScreenshotDetector::detect(&PathBuf::from("/shots").join(name)).unwrap()
    }

    #[test]
    fn test_hyphenated_date_is_normalized() {
        let candidate = detect("Screen Shot-2023-05-09.png").unwrap();
        assert_eq!(candidate.date, "20230509");
        assert_eq!(candidate.raw_timestamp, "2023-05-09");
        assert_eq!(candidate.path, PathBuf::from("/shots/Screen Shot-2023-05-09.png"));
    }

    #[test]
    fn test_bare_date_is_kept() {
        let candidate = detect("SCR-20230509.png").unwrap();
        assert_eq!(candidate.date, "20230509");

        let candidate = detect("SCR-20230509-abcd at 10.11.12.JPEG").unwrap();
        assert_eq!(candidate.date, "20230509");
    }

    #[test]
    fn test_non_screenshots_are_excluded() {
        assert!(detect("vacation.png").is_none());
        assert!(detect("20230509-code_editor.png").is_none());
        assert!(detect("screen shot-2023-05-09.png").is_none());
        assert!(detect("Screen Shot 2023-05-09.png").is_none());
        assert!(detect("SCR-2023.png").is_none());
        assert!(detect("SCR-20230509.gif").is_none());
        assert!(detect("SCR-20230509").is_none());
    }

    #[test]
    fn test_invalid_calendar_date_is_an_error() {
        let path = PathBuf::from("Screen Shot-2023-13-45.png");
        assert!(ScreenshotDetector::matches_legacy_name(&path));

        let err = ScreenshotDetector::detect(&path).unwrap_err();
        assert!(matches!(err, DetectError::InvalidDate { ref raw, .. } if raw == "2023-13-45"));
    }

    #[test]
    fn test_extension_filter() {
        assert!(ScreenshotDetector::is_supported_image(&PathBuf::from("a.PNG")));
        assert!(ScreenshotDetector::is_supported_image(&PathBuf::from("a.jpeg")));
        assert!(ScreenshotDetector::is_supported_image(&PathBuf::from("a.Jpg")));
        assert!(!ScreenshotDetector::is_supported_image(&PathBuf::from("a.heic")));
        assert!(!ScreenshotDetector::is_supported_image(&PathBuf::from("png")));
    }

    #[test]
    fn test_media_type_sniffing() {
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(ScreenshotDetector::media_type(&png_header), "image/png");

        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0];
        assert_eq!(ScreenshotDetector::media_type(&jpeg_header), "image/jpeg");

        assert_eq!(ScreenshotDetector::media_type(b"not an image"), "image/png");
    }
}
