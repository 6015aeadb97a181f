use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomilyError {
    #[error("Missing configuration: {env_var} environment variable is not set")]
    MissingEnv { env_var: String },

    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Speech synthesis failed: {reason}")]
    Synthesis { reason: String },

    #[error("{tool} failed for {path}: {reason}")]
    Media {
        tool: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("No usable video clips were downloaded")]
    NoClips,

    #[error("Invalid OAuth credentials: {reason}")]
    Credentials { reason: String },

    #[error("Upload failed: {reason}")]
    Upload { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("WAV decode error: {0}")]
    AudioError(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, HomilyError>;

impl HomilyError {
    /// Build an [`HomilyError::Api`] from a non-success response, consuming its body.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        HomilyError::Api {
            service,
            status,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_missing() -> Result<String> {
        Ok(std::fs::read_to_string("/nonexistent/homily/topics.txt")?)
    }

    #[test]
    fn wrapped_errors_convert_through_question_mark() {
        let err = read_missing().unwrap_err();
        assert!(matches!(err, HomilyError::IoError(_)));
        assert!(err.to_string().starts_with("IO error: "));

        let err: HomilyError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, HomilyError::JsonError(_)));
    }
}
