use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    config::ServiceConfig,
    error::{HomilyError, Result},
    types::Mode,
};

pub const FALLBACK_MODEL: &str = "models/gemini-pro";
const GENERATE_METHOD: &str = "generateContent";

static SHORT_PROMPT: &str = r#"
Act as 'The Universe' or a Divine Consciousness speaking directly to a human soul.
Write a script for a YouTube Short based on: '{topic}'.

RULES:
1. Start with a direct address (e.g., "My child...", "Listen closely...", "You, who are weary...").
2. Deliver the wisdom from the holy text naturally, not like a lecture. Make it feel like personal advice from God.
3. Tone: Deep, Ancient, Infinite Love, Authoritative.
4. Ending: A short command of peace (e.g., "Be still.", "I am with you.").

FORMAT:
- Plain text only.
- Use '...' frequently to force the AI voice to pause and breathe.
- Max 110 words.
"#;

static LONG_PROMPT: &str = r#"
Act as 'The Universe' or a Divine Consciousness. Write a FULL VIDEO SCRIPT on: '{topic}'.

STRUCTURE:
1. The Address: Acknowledge the user's pain or struggle related to the topic.
2. The Ancient Word: Quote the holy text (Gita/Bible/Quran) clearly.
3. The Wisdom: Explain why this truth matters now, in 2026.
4. The Promise: End with a divine promise of hope.

Tone: Epic, Cinematic, Healing, God-like.
Max 350 words.
Plain text only. Use '...' for dramatic pauses.
"#;

/// Persona prompt for `mode` with the topic embedded.
pub fn build_prompt(topic: &str, mode: Mode) -> String {
    let template = match mode {
        Mode::Short => SHORT_PROMPT,
        Mode::Long => LONG_PROMPT,
    };
    template.replace("{topic}", topic)
}

/// Narration used when generation yields nothing.
pub fn placeholder_script(topic: &str) -> String {
    format!("My child... peace be with you regarding {}...", topic)
}

/// Strip markdown emphasis markers and surrounding whitespace.
pub fn clean_script(raw: &str) -> String {
    raw.replace('*', "").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

pub struct ScriptRequester {
    http: Client,
    config: ServiceConfig,
}

impl ScriptRequester {
    pub fn new(http: Client, config: ServiceConfig) -> Self {
        Self { http, config }
    }

    /// Name of the first listed model that supports content generation.
    async fn discover_model(&self) -> Result<Option<String>> {
        let url = format!("{}/v1beta/models", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("key", &self.config.api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HomilyError::from_response("gemini", response).await);
        }

        let list: ModelList = response.json().await?;
        Ok(list
            .models
            .into_iter()
            .find(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_METHOD)
            })
            .map(|m| m.name))
    }

    /// Model to generate with, falling back to a fixed identifier when discovery fails.
    pub async fn resolve_model(&self) -> String {
        match self.discover_model().await {
            Ok(Some(name)) => {
                debug!(model = %name, "discovered generation model");
                name
            }
            Ok(None) => {
                warn!(model = FALLBACK_MODEL, "no model advertises {GENERATE_METHOD}");
                FALLBACK_MODEL.to_string()
            }
            Err(e) => {
                warn!(error = %e, model = FALLBACK_MODEL, "model discovery failed");
                FALLBACK_MODEL.to_string()
            }
        }
    }

    async fn request_script(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/{}:{}",
            self.config.base_url, model, GENERATE_METHOD
        );
        let response = self
            .http
            .post(&url)
            .query(&[("key", &self.config.api_key)])
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HomilyError::from_response("gemini", response).await);
        }

        let body = response.json::<serde_json::Value>().await?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| HomilyError::Api {
                service: "gemini",
                status: 200,
                body: format!("missing candidate text: {}", body),
            })?;
        Ok(text.to_string())
    }

    /// Generate narration for `topic`. Failures are logged and yield `None`.
    pub async fn generate(&self, topic: &str, mode: Mode) -> Option<String> {
        info!(%topic, %mode, "requesting script");
        let model = self.resolve_model().await;
        let prompt = build_prompt(topic, mode);

        match self.request_script(&model, &prompt).await {
            Ok(raw) => {
                let script = clean_script(&raw);
                if script.is_empty() {
                    warn!(%model, "generation returned empty text");
                    None
                } else {
                    Some(script)
                }
            }
            Err(e) => {
                warn!(error = %e, %model, "script generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_topic_and_word_budget() {
        let short = build_prompt("Letting Go", Mode::Short);
        assert!(short.contains("'Letting Go'"));
        assert!(short.contains("Max 110 words"));

        let long = build_prompt("Letting Go", Mode::Long);
        assert!(long.contains("'Letting Go'"));
        assert!(long.contains("Max 350 words"));
        assert!(!long.contains("{topic}"));
    }

    #[test]
    fn long_prompt_keeps_sermon_wording() {
        let long = build_prompt("Grief", Mode::Long);
        assert!(long.contains("Acknowledge the user's pain or struggle related to the topic."));
        assert!(long.contains("Explain why this truth matters now, in 2026."));
    }

    #[test]
    fn cleaning_removes_emphasis_and_padding() {
        assert_eq!(
            clean_script("  **My child**... *be still*.\n"),
            "My child... be still."
        );
    }

    #[test]
    fn placeholder_mentions_topic() {
        assert_eq!(
            placeholder_script("Hope"),
            "My child... peace be with you regarding Hope..."
        );
    }
}
