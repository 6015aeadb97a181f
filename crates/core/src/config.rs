use std::path::PathBuf;

use crate::{
    error::{HomilyError, Result},
    types::Mode,
};

pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const PEXELS_KEY_ENV: &str = "PEXELS_API_KEY";
pub const YOUTUBE_TOKEN_ENV: &str = "YOUTUBE_TOKEN_JSON";
pub const MODE_ENV: &str = "VIDEO_MODE";
pub const WORKDIR_ENV: &str = "HOMILY_WORKDIR";

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_PEXELS_BASE: &str = "https://api.pexels.com";
pub const DEFAULT_KOKORO_BASE: &str = "http://localhost:8880";
pub const DEFAULT_YOUTUBE_UPLOAD_BASE: &str = "https://www.googleapis.com";

/// Endpoint and credential for one external service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mode: Mode,
    pub workdir: PathBuf,
    pub gemini: ServiceConfig,
    pub pexels: ServiceConfig,
    pub kokoro_url: String,
    pub youtube_upload_base: String,
    pub youtube_token_json: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| HomilyError::MissingEnv {
                    env_var: name.to_string(),
                })
        };
        let optional = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            mode: Mode::parse(lookup(MODE_ENV).as_deref()),
            workdir: lookup(WORKDIR_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            gemini: ServiceConfig {
                base_url: optional("GEMINI_API_BASE", DEFAULT_GEMINI_BASE),
                api_key: required(GEMINI_KEY_ENV)?,
            },
            pexels: ServiceConfig {
                base_url: optional("PEXELS_API_BASE", DEFAULT_PEXELS_BASE),
                api_key: required(PEXELS_KEY_ENV)?,
            },
            kokoro_url: optional("KOKORO_URL", DEFAULT_KOKORO_BASE),
            youtube_upload_base: optional("YOUTUBE_UPLOAD_BASE", DEFAULT_YOUTUBE_UPLOAD_BASE),
            youtube_token_json: required(YOUTUBE_TOKEN_ENV)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (GEMINI_KEY_ENV, "g-key"),
        (PEXELS_KEY_ENV, "p-key"),
        (YOUTUBE_TOKEN_ENV, "{}"),
    ];

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.mode, Mode::Short);
        assert_eq!(config.workdir, PathBuf::from("."));
        assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_BASE);
        assert_eq!(config.gemini.api_key, "g-key");
        assert_eq!(config.pexels.base_url, DEFAULT_PEXELS_BASE);
        assert_eq!(config.kokoro_url, DEFAULT_KOKORO_BASE);
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        match err {
            HomilyError::MissingEnv { env_var } => assert_eq!(env_var, YOUTUBE_TOKEN_ENV),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overrides_strip_trailing_slash() {
        let mut vars = REQUIRED.to_vec();
        vars.push((MODE_ENV, "Long"));
        vars.push(("KOKORO_URL", "http://tts:9000/"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.mode, Mode::Long);
        assert_eq!(config.kokoro_url, "http://tts:9000");
    }
}
