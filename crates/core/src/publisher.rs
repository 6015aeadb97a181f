use std::path::Path;

use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, error, info};

use crate::{
    error::{HomilyError, Result},
    format::{MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, truncate_chars},
    types::{PrivacyStatus, Snippet, VideoMetadata},
};

pub const TAGS: [&str; 6] = ["shorts", "god", "universe", "manifestation", "peace", "prayer"];
/// "Education"
pub const CATEGORY_ID: &str = "27";
pub const PRIVACY: &str = "public";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Must be a multiple of 256 KiB.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;
/// Consecutive 308 responses without progress before the upload is abandoned.
const MAX_STALLED_CHUNKS: usize = 3;

/// Stored OAuth credentials in Google's authorized-user JSON format.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizedUser {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_uri: Option<String>,
}

impl AuthorizedUser {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HomilyError::Credentials {
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

pub fn build_metadata(title: &str, description: &str) -> VideoMetadata {
    VideoMetadata {
        snippet: Snippet {
            title: truncate_chars(title, MAX_TITLE_CHARS).to_string(),
            description: truncate_chars(description, MAX_DESCRIPTION_CHARS).to_string(),
            tags: TAGS.iter().map(|t| t.to_string()).collect(),
            category_id: CATEGORY_ID.to_string(),
        },
        status: PrivacyStatus {
            privacy_status: PRIVACY.to_string(),
            self_declared_made_for_kids: false,
        },
    }
}

/// Offset after the last byte the server stored, from a `Range: bytes=0-N` header.
/// A missing header means nothing has been stored yet.
fn acknowledged_offset(range: Option<&header::HeaderValue>) -> usize {
    range
        .and_then(|v| v.to_str().ok())
        .and_then(|r| r.strip_prefix("bytes="))
        .and_then(|r| r.split('-').nth(1))
        .and_then(|end| end.trim().parse::<usize>().ok())
        .map_or(0, |n| n + 1)
}

pub struct Publisher {
    http: Client,
    upload_base: String,
    credentials_json: String,
    chunk_size: usize,
}

impl Publisher {
    pub fn new(http: Client, upload_base: impl Into<String>, credentials_json: impl Into<String>) -> Self {
        Self {
            http,
            upload_base: upload_base.into(),
            credentials_json: credentials_json.into(),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Override the upload chunk size. Google requires multiples of 256 KiB
    /// for every chunk but the last.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn access_token(&self) -> Result<String> {
        let creds = AuthorizedUser::from_json(&self.credentials_json)?;

        if let (Some(refresh_token), Some(client_id), Some(client_secret)) =
            (&creds.refresh_token, &creds.client_id, &creds.client_secret)
        {
            let token_uri = creds.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
            let response = self
                .http
                .post(token_uri)
                .form(&[
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(HomilyError::from_response("oauth", response).await);
            }
            debug!("refreshed OAuth access token");
            return Ok(response.json::<TokenResponse>().await?.access_token);
        }

        creds.token.ok_or_else(|| HomilyError::Credentials {
            reason: "neither an access token nor refresh credentials are present".to_string(),
        })
    }

    async fn start_session(
        &self,
        token: &str,
        metadata: &VideoMetadata,
        total: usize,
    ) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/upload/youtube/v3/videos", self.upload_base))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", total.to_string())
            .json(metadata)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HomilyError::from_response("youtube", response).await);
        }

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HomilyError::Upload {
                reason: "resumable session response has no Location header".to_string(),
            })
    }

    /// Upload `file_path` and return the new video id.
    pub async fn upload(&self, file_path: &Path, title: &str, description: &str) -> Result<String> {
        let token = self.access_token().await?;
        let data = fs::read(file_path).await?;
        if data.is_empty() {
            return Err(HomilyError::Upload {
                reason: format!("{} is empty", file_path.display()),
            });
        }

        let total = data.len();
        let metadata = build_metadata(title, description);
        let session = self.start_session(&token, &metadata, total).await?;

        let mut offset = 0;
        let mut stalled = 0;
        while offset < total {
            let end = (offset + self.chunk_size).min(total);
            let response = self
                .http
                .put(&session)
                .bearer_auth(&token)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", offset, end - 1, total),
                )
                .body(data[offset..end].to_vec())
                .send()
                .await?;

            match response.status() {
                StatusCode::PERMANENT_REDIRECT => {
                    let stored = acknowledged_offset(response.headers().get(header::RANGE));
                    if stored > offset {
                        stalled = 0;
                    } else {
                        stalled += 1;
                        if stalled >= MAX_STALLED_CHUNKS {
                            return Err(HomilyError::Upload {
                                reason: format!("server stopped accepting data at byte {}", stored),
                            });
                        }
                    }
                    offset = stored.min(total);
                    debug!(offset, total, "chunk acknowledged");
                }
                status if status.is_success() => {
                    let video: UploadedVideo = response.json().await?;
                    return Ok(video.id);
                }
                _ => return Err(HomilyError::from_response("youtube", response).await),
            }
        }

        Err(HomilyError::Upload {
            reason: "server acknowledged every chunk without finishing the upload".to_string(),
        })
    }

    /// Upload when a file is present. Failures are logged, never returned.
    pub async fn publish(&self, file_path: Option<&Path>, title: &str, description: &str) -> Option<String> {
        let file_path = file_path?;
        info!(path = %file_path.display(), %title, "uploading video");

        match self.upload(file_path, title, description).await {
            Ok(id) => {
                info!(video_id = %id, "upload finished");
                Some(id)
            }
            Err(e) => {
                error!(error = %e, "upload failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_truncates_and_declares_audience() {
        let title = "t".repeat(150);
        let description = "d".repeat(5000);
        let metadata = build_metadata(&title, &description);

        assert_eq!(metadata.snippet.title.chars().count(), 100);
        assert_eq!(metadata.snippet.description.chars().count(), 4500);
        assert_eq!(metadata.snippet.tags.len(), 6);
        assert_eq!(metadata.snippet.category_id, "27");
        assert_eq!(metadata.status.privacy_status, "public");
        assert!(!metadata.status.self_declared_made_for_kids);
    }

    #[test]
    fn range_header_sets_next_offset() {
        let value = header::HeaderValue::from_static("bytes=0-524287");
        assert_eq!(acknowledged_offset(Some(&value)), 524288);
        assert_eq!(acknowledged_offset(None), 0);
        let garbled = header::HeaderValue::from_static("items=3");
        assert_eq!(acknowledged_offset(Some(&garbled)), 0);
    }

    #[test]
    fn credentials_parse_authorized_user_json() {
        let creds = AuthorizedUser::from_json(
            r#"{"token":"ya29","refresh_token":"1//r","client_id":"id","client_secret":"s","scopes":["x"]}"#,
        )
        .unwrap();
        assert_eq!(creds.token.as_deref(), Some("ya29"));
        assert_eq!(creds.token_uri, None);
        assert!(AuthorizedUser::from_json("not json").is_err());
    }
}
