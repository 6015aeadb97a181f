use std::{io::Cursor, path::Path};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{HomilyError, Result};

/// Deep, calm narrator voice.
pub const VOICE_ID: &str = "bm_lewis";
/// Slower than natural delivery.
pub const VOICE_SPEED: f32 = 0.85;
pub const VOICE_LANG: &str = "en-us";

/// Mono narration waveform.
#[derive(Clone, Debug)]
pub struct Narration {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Narration {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Decode a WAV payload, averaging channels down to mono.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Persist as 16-bit mono PCM.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for sample in &self.samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Client for a Kokoro speech server's OpenAI-compatible endpoint.
pub struct NarrationSynthesizer {
    http: Client,
    base_url: String,
}

impl NarrationSynthesizer {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn synthesize(&self, script: &str, voice_id: &str, speed: f32) -> Result<Narration> {
        info!(voice = voice_id, speed, chars = script.len(), "synthesizing narration");
        let response = self
            .http
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&serde_json::json!({
                "model": "kokoro",
                "input": script,
                "voice": voice_id,
                "speed": speed,
                "lang_code": VOICE_LANG,
                "response_format": "wav",
                "stream": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HomilyError::Synthesis {
                reason: format!("{}: {}", status, body),
            });
        }

        let bytes = response.bytes().await?;
        let narration = Narration::from_wav_bytes(&bytes).map_err(|e| HomilyError::Synthesis {
            reason: format!("undecodable audio: {}", e),
        })?;

        if narration.samples.is_empty() {
            return Err(HomilyError::Synthesis {
                reason: "engine returned no audio".to_string(),
            });
        }

        debug!(
            sample_rate = narration.sample_rate,
            seconds = narration.duration_secs(),
            "narration decoded"
        );
        Ok(narration)
    }
}
