use std::fmt;

use reqwest::Client;
use tracing::{error, info, warn};

use crate::{
    assembler::Assembler,
    config::Config,
    error::{HomilyError, Result},
    footage::VisualAssetFetcher,
    format::{format_description, format_timestamp, format_title, preview},
    narration::{NarrationSynthesizer, VOICE_ID, VOICE_SPEED},
    publisher::Publisher,
    queue::TopicQueueManager,
    script::{ScriptRequester, placeholder_script},
    types::{Mode, OutputVideo},
    workspace::Workspace,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    SelectTopic,
    GenerateScript,
    SynthesizeNarration,
    FetchFootage,
    AssembleVideo,
    Publish,
}

impl Stage {
    pub fn id(&self) -> &'static str {
        match self {
            Stage::SelectTopic => "topic.select",
            Stage::GenerateScript => "script.generate",
            Stage::SynthesizeNarration => "narration.synthesize",
            Stage::FetchFootage => "footage.fetch",
            Stage::AssembleVideo => "video.assemble",
            Stage::Publish => "video.publish",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::SelectTopic => "Selecting topic",
            Stage::GenerateScript => "Generating script",
            Stage::SynthesizeNarration => "Synthesizing narration",
            Stage::FetchFootage => "Downloading footage",
            Stage::AssembleVideo => "Assembling video",
            Stage::Publish => "Uploading video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A fatal stage failure that ended the run.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct PipelineFailed {
    pub stage: Stage,
    pub message: String,
}

impl PipelineFailed {
    fn new(stage: Stage, err: &HomilyError) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// Receives stage progress; the CLI renders it as spinners.
pub trait StageObserver {
    fn started(&mut self, _stage: Stage) {}
    fn finished(&mut self, _stage: Stage, _summary: &str) {}
    fn failed(&mut self, _stage: Stage, _message: &str) {}
}

pub struct NoopObserver;

impl StageObserver for NoopObserver {}

#[derive(Debug)]
pub struct PipelineRun {
    pub mode: Mode,
    pub topic: String,
    pub script: String,
    pub used_placeholder: bool,
    pub video: OutputVideo,
    pub title: String,
    pub description: String,
    pub video_id: Option<String>,
}

pub struct Pipeline {
    mode: Mode,
    workspace: Workspace,
    script: ScriptRequester,
    narrator: NarrationSynthesizer,
    footage: VisualAssetFetcher,
    assembler: Assembler,
    publisher: Publisher,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder().build()?;
        let workspace = Workspace::new(config.workdir.clone());

        Ok(Self {
            mode: config.mode,
            script: ScriptRequester::new(http.clone(), config.gemini),
            narrator: NarrationSynthesizer::new(http.clone(), config.kokoro_url),
            footage: VisualAssetFetcher::new(http.clone(), config.pexels),
            assembler: Assembler::new(workspace.clone()),
            publisher: Publisher::new(http, config.youtube_upload_base, config.youtube_token_json),
            workspace,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn fail(
        &self,
        observer: &mut impl StageObserver,
        stage: Stage,
        err: HomilyError,
    ) -> PipelineFailed {
        let failed = PipelineFailed::new(stage, &err);
        error!(stage = stage.id(), error = %err, "stage failed");
        observer.failed(stage, &failed.message);
        failed
    }

    /// Run every stage in order, stopping at the first fatal failure.
    pub async fn run(
        &self,
        observer: &mut impl StageObserver,
    ) -> std::result::Result<PipelineRun, PipelineFailed> {
        let mode = self.mode;

        observer.started(Stage::SelectTopic);
        let topic = match TopicQueueManager::open(&self.workspace).and_then(|q| q.next_topic(mode)) {
            Ok(topic) => topic,
            Err(e) => return Err(self.fail(observer, Stage::SelectTopic, e)),
        };
        info!(%topic, %mode, "processing topic");
        observer.finished(Stage::SelectTopic, &topic);

        observer.started(Stage::GenerateScript);
        let (script, used_placeholder) = match self.script.generate(&topic, mode).await {
            Some(script) => (script, false),
            None => {
                warn!(%topic, "using placeholder script");
                (placeholder_script(&topic), true)
            }
        };
        info!(preview = %preview(&script, 50), "script ready");
        observer.finished(Stage::GenerateScript, &preview(&script, 50));

        observer.started(Stage::SynthesizeNarration);
        let voice_path = self.workspace.voice_path();
        let narration = match self.narrator.synthesize(&script, VOICE_ID, VOICE_SPEED).await {
            Ok(narration) => narration,
            Err(e) => return Err(self.fail(observer, Stage::SynthesizeNarration, e)),
        };
        if let Err(e) = narration.write_wav(&voice_path) {
            return Err(self.fail(observer, Stage::SynthesizeNarration, e));
        }
        observer.finished(
            Stage::SynthesizeNarration,
            &format!("{:.1}s of narration", narration.duration_secs()),
        );

        observer.started(Stage::FetchFootage);
        let mut clips = self.footage.fetch(mode, &self.workspace).await;
        if clips.is_empty() {
            return Err(self.fail(observer, Stage::FetchFootage, HomilyError::NoClips));
        }
        observer.finished(Stage::FetchFootage, &format!("{} clips", clips.len()));

        observer.started(Stage::AssembleVideo);
        let assembled = self.assembler.assemble(&voice_path, &clips, mode).await;
        clips.cleanup();
        let video = match assembled {
            Ok(video) => video,
            Err(e) => return Err(self.fail(observer, Stage::AssembleVideo, e)),
        };
        observer.finished(
            Stage::AssembleVideo,
            &format!("{} ({})", video.path.display(), format_timestamp(video.duration)),
        );

        let title = format_title(&topic, mode);
        let description = format_description(&topic);

        observer.started(Stage::Publish);
        let video_id = self
            .publisher
            .publish(Some(&video.path), &title, &description)
            .await;
        match &video_id {
            Some(id) => observer.finished(Stage::Publish, id),
            None => observer.failed(Stage::Publish, "upload failed, see log"),
        }

        Ok(PipelineRun {
            mode,
            topic,
            script,
            used_placeholder,
            video,
            title,
            description,
            video_id,
        })
    }
}
