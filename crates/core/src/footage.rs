use std::{ops::Deref, path::Path};

use reqwest::Client;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    config::ServiceConfig,
    error::{HomilyError, Result},
    media,
    types::{ClipHandle, Mode},
    workspace::Workspace,
};

/// Search keywords, independent of the topic.
pub const SEARCH_QUERY: &str =
    "sun rays clouds, galaxy universe, cinematic nature, light beams, slow motion water";

pub fn orientation(mode: Mode) -> &'static str {
    match mode {
        Mode::Short => "portrait",
        Mode::Long => "landscape",
    }
}

pub fn clip_count(mode: Mode) -> usize {
    match mode {
        Mode::Short => 3,
        Mode::Long => 6,
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<SearchVideo>,
}

#[derive(Debug, Deserialize)]
struct SearchVideo {
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
}

/// Downloaded clips; their files are removed when this is dropped.
#[derive(Debug, Default)]
pub struct TempClips {
    clips: Vec<ClipHandle>,
}

impl TempClips {
    pub fn new(clips: Vec<ClipHandle>) -> Self {
        Self { clips }
    }

    /// Delete the downloaded files now.
    pub fn cleanup(&mut self) {
        for clip in self.clips.drain(..) {
            remove_quietly(&clip.path);
        }
    }
}

impl Deref for TempClips {
    type Target = [ClipHandle];

    fn deref(&self) -> &Self::Target {
        &self.clips
    }
}

impl Drop for TempClips {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to remove temporary clip");
    }
}

pub struct VisualAssetFetcher {
    http: Client,
    config: ServiceConfig,
}

impl VisualAssetFetcher {
    pub fn new(http: Client, config: ServiceConfig) -> Self {
        Self { http, config }
    }

    async fn search(&self, mode: Mode) -> Result<Vec<String>> {
        let count = clip_count(mode).to_string();
        let response = self
            .http
            .get(format!("{}/videos/search", self.config.base_url))
            .header("Authorization", &self.config.api_key)
            .query(&[
                ("query", SEARCH_QUERY),
                ("per_page", count.as_str()),
                ("orientation", orientation(mode)),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HomilyError::from_response("pexels", response).await);
        }

        let results: SearchResponse = response.json().await?;
        Ok(results
            .videos
            .into_iter()
            .filter_map(|video| video.video_files.into_iter().next().map(|f| f.link))
            .collect())
    }

    async fn download(&self, link: &str, path: &Path) -> Result<()> {
        let response = self.http.get(link).send().await?;
        if !response.status().is_success() {
            return Err(HomilyError::from_response("pexels", response).await);
        }
        let bytes = response.bytes().await?;
        fs::write(path, &bytes).await?;
        Ok(())
    }

    async fn open_clip(&self, link: &str, path: &Path) -> Result<ClipHandle> {
        self.download(link, path).await?;
        let info = media::probe(path).await?;
        match info.video {
            Some((width, height)) if info.duration > 0.0 => Ok(ClipHandle {
                path: path.to_path_buf(),
                width,
                height,
                duration: info.duration,
            }),
            _ => Err(HomilyError::Media {
                tool: "ffprobe",
                path: path.to_path_buf(),
                reason: "no decodable video stream".to_string(),
            }),
        }
    }

    /// Download stock clips for `mode`. Undecodable clips are skipped; total
    /// failure yields an empty set.
    pub async fn fetch(&self, mode: Mode, workspace: &Workspace) -> TempClips {
        let links = match self.search(mode).await {
            Ok(links) => links,
            Err(e) => {
                warn!(error = %e, "footage search failed");
                return TempClips::default();
            }
        };
        info!(results = links.len(), orientation = orientation(mode), "footage search finished");

        let mut clips = Vec::new();
        for (i, link) in links.iter().enumerate() {
            let path = workspace.clip_path(i);
            match self.open_clip(link, &path).await {
                Ok(clip) => {
                    debug!(
                        path = %clip.path.display(),
                        width = clip.width,
                        height = clip.height,
                        duration = clip.duration,
                        "clip ready"
                    );
                    clips.push(clip);
                }
                Err(e) => {
                    warn!(%link, error = %e, "skipping clip");
                    remove_quietly(&path);
                }
            }
        }

        TempClips::new(clips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selects_orientation_and_count() {
        assert_eq!(orientation(Mode::Short), "portrait");
        assert_eq!(clip_count(Mode::Short), 3);
        assert_eq!(orientation(Mode::Long), "landscape");
        assert_eq!(clip_count(Mode::Long), 6);
    }

    #[test]
    fn dropping_clips_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_0.mp4");
        std::fs::write(&path, b"clip").unwrap();

        let clips = TempClips::new(vec![ClipHandle {
            path: path.clone(),
            width: 1080,
            height: 1920,
            duration: 5.0,
        }]);
        assert_eq!(clips.len(), 1);
        drop(clips);

        assert!(!path.exists());
    }

    #[test]
    fn search_response_tolerates_missing_fields() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"videos":[{"video_files":[]},{"id":7}]}"#).unwrap();
        assert_eq!(parsed.videos.len(), 2);
        assert!(parsed.videos.iter().all(|v| v.video_files.is_empty()));
    }
}
