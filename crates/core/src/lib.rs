//! Homily Core Library
//!
//! Turns a queued topic into a narrated devotional video: script generation,
//! speech synthesis, stock footage, ffmpeg assembly and YouTube upload.

pub mod assembler;
pub mod config;
pub mod error;
pub mod footage;
pub mod format;
pub mod media;
pub mod narration;
pub mod pipeline;
pub mod publisher;
pub mod queue;
pub mod script;
pub mod types;
pub mod workspace;

// Re-export commonly used items at crate root
pub use assembler::{Assembler, AssemblyPlan, FrameOp, MusicMix, Segment};
pub use config::{Config, ServiceConfig};
pub use error::{HomilyError, Result};
pub use footage::{TempClips, VisualAssetFetcher};
pub use format::{format_description, format_duration, format_title};
pub use narration::{Narration, NarrationSynthesizer};
pub use pipeline::{NoopObserver, Pipeline, PipelineFailed, PipelineRun, Stage, StageObserver};
pub use publisher::Publisher;
pub use queue::{FALLBACK_TOPIC, TopicQueue, TopicQueueManager};
pub use script::ScriptRequester;
pub use types::{ClipHandle, Mode, OutputVideo, VideoMetadata};
pub use workspace::Workspace;
