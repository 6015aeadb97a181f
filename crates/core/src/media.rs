use std::{path::Path, process::Stdio};

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{HomilyError, Result};

/// Properties of a decodable media file.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    /// Dimensions of the first video stream, absent for audio-only files.
    pub video: Option<(u32, u32)>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

fn parse_probe(stdout: &[u8]) -> serde_json::Result<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");
    let video = video_stream.and_then(|s| match (s.width, s.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    });

    let duration = probe
        .format
        .duration
        .as_deref()
        .or_else(|| video_stream.and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo { duration, video })
}

/// Probe a media file with ffprobe.
pub async fn probe(path: &Path) -> Result<MediaInfo> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(HomilyError::Media {
            tool: "ffprobe",
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_probe(&output.stdout).map_err(|e| HomilyError::Media {
        tool: "ffprobe",
        path: path.to_path_buf(),
        reason: format!("unreadable probe output: {}", e),
    })
}

/// Run ffmpeg with `args`, reporting stderr on failure.
pub async fn run_ffmpeg(args: &[String], output_path: &Path) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .args(["-hide_banner", "-loglevel", "error"])
        .args(args)
        .arg(output_path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(HomilyError::Media {
            tool: "ffmpeg",
            path: output_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}
