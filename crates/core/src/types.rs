use std::{fmt, path::PathBuf};

use serde::Serialize;

/// Output profile of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Short,
    Long,
}

impl Mode {
    /// Parse a `VIDEO_MODE` value. Anything other than "long" means short-form.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("long") => Mode::Long,
            _ => Mode::Short,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Short => "Short",
            Mode::Long => "Long",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A downloaded stock clip together with its probed properties.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipHandle {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

/// Finished video file ready for upload.
#[derive(Clone, Debug)]
pub struct OutputVideo {
    pub path: PathBuf,
    pub duration: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct VideoMetadata {
    pub snippet: Snippet,
    pub status: PrivacyStatus,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyStatus {
    pub privacy_status: String,
    pub self_declared_made_for_kids: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults_to_short() {
        assert_eq!(Mode::parse(None), Mode::Short);
        assert_eq!(Mode::parse(Some("Short")), Mode::Short);
        assert_eq!(Mode::parse(Some("vertical")), Mode::Short);
        assert_eq!(Mode::parse(Some("")), Mode::Short);
    }

    #[test]
    fn mode_recognizes_long() {
        assert_eq!(Mode::parse(Some("Long")), Mode::Long);
        assert_eq!(Mode::parse(Some(" long ")), Mode::Long);
    }

    #[test]
    fn metadata_serializes_in_camel_case() {
        let metadata = VideoMetadata {
            snippet: Snippet {
                title: "t".into(),
                description: "d".into(),
                tags: vec!["peace".into()],
                category_id: "27".into(),
            },
            status: PrivacyStatus {
                privacy_status: "public".into(),
                self_declared_made_for_kids: false,
            },
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["snippet"]["categoryId"], "27");
        assert_eq!(json["status"]["privacyStatus"], "public");
        assert_eq!(json["status"]["selfDeclaredMadeForKids"], false);
    }
}
