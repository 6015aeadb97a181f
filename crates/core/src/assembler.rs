use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use tracing::{debug, info};

use crate::{
    error::{HomilyError, Result},
    media,
    types::{ClipHandle, Mode, OutputVideo},
    workspace::Workspace,
};

pub const FRAME_RATE: u32 = 24;
pub const CROSSFADE_SECS: f64 = 1.5;
pub const MUSIC_GAIN: f64 = 0.20;
pub const MUSIC_LOOP_MARGIN_SECS: f64 = 2.0;
pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";
pub const ENCODE_PRESET: &str = "medium";

pub const SHORT_FRAME: (u32, u32) = (1080, 1920);
pub const LONG_FRAME: (u32, u32) = (1920, 1080);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOp {
    Crop {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
    Scale {
        width: u32,
        height: u32,
    },
}

impl FrameOp {
    fn filter(&self) -> String {
        match self {
            FrameOp::Crop {
                width,
                height,
                x,
                y,
            } => format!("crop={}:{}:{}:{}", width, height, x, y),
            FrameOp::Scale { width, height } => format!("scale={}:{}", width, height),
        }
    }
}

/// Round to the nearest even pixel count; x264 rejects odd dimensions.
fn even(value: f64) -> u32 {
    let rounded = value.round() as u32;
    (rounded - rounded % 2).max(2)
}

/// Crop/scale steps that bring a `width`×`height` source into the frame for `mode`.
pub fn frame_ops(mode: Mode, width: u32, height: u32) -> Vec<FrameOp> {
    let (w, h) = (width as u64, height as u64);
    match mode {
        Mode::Short => {
            let mut ops = Vec::new();
            if width > height {
                let crop_w = even(height as f64 * 9.0 / 16.0).min(width);
                ops.push(FrameOp::Crop {
                    width: crop_w,
                    height,
                    x: (width - crop_w) / 2,
                    y: 0,
                });
            }
            ops.push(FrameOp::Scale {
                width: SHORT_FRAME.0,
                height: SHORT_FRAME.1,
            });
            ops
        }
        Mode::Long => {
            let (frame_w, frame_h) = LONG_FRAME;
            if w * 9 == h * 16 {
                vec![FrameOp::Scale {
                    width: frame_w,
                    height: frame_h,
                }]
            } else if w * 9 > h * 16 {
                let scaled_w = even(width as f64 * frame_h as f64 / height as f64).max(frame_w);
                vec![
                    FrameOp::Scale {
                        width: scaled_w,
                        height: frame_h,
                    },
                    FrameOp::Crop {
                        width: frame_w,
                        height: frame_h,
                        x: (scaled_w - frame_w) / 2,
                        y: 0,
                    },
                ]
            } else {
                let scaled_h = even(height as f64 * frame_w as f64 / width as f64).max(frame_h);
                vec![
                    FrameOp::Scale {
                        width: frame_w,
                        height: scaled_h,
                    },
                    FrameOp::Crop {
                        width: frame_w,
                        height: frame_h,
                        x: 0,
                        y: (scaled_h - frame_h) / 2,
                    },
                ]
            }
        }
    }
}

/// Dimensions after applying `ops` to a `width`×`height` source.
pub fn output_size(ops: &[FrameOp], width: u32, height: u32) -> (u32, u32) {
    ops.iter().fold((width, height), |_, op| match *op {
        FrameOp::Crop { width, height, .. } | FrameOp::Scale { width, height } => (width, height),
    })
}

/// One placement of a clip on the output timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub clip: PathBuf,
    pub duration: f64,
    /// Timeline position where this segment starts fading in.
    pub start: f64,
    /// Crossfade length into this segment; zero for the first one.
    pub transition: f64,
    pub ops: Vec<FrameOp>,
}

/// Cycle through `clips` until the timeline covers `target` seconds.
pub fn plan_segments(clips: &[ClipHandle], mode: Mode, target: f64) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    if target <= 0.0 || !clips.iter().any(|c| c.duration > 0.0) {
        return segments;
    }

    let mut timeline = 0.0;
    for clip in clips.iter().filter(|c| c.duration > 0.0).cycle() {
        if timeline >= target {
            break;
        }

        let (start, transition) = match segments.last() {
            None => (0.0, 0.0),
            Some(prev) => {
                let transition = CROSSFADE_SECS
                    .min(prev.duration / 2.0)
                    .min(clip.duration / 2.0);
                (timeline - transition, transition)
            }
        };
        timeline = start + clip.duration;

        segments.push(Segment {
            clip: clip.path.clone(),
            duration: clip.duration,
            start,
            transition,
            ops: frame_ops(mode, clip.width, clip.height),
        });
    }
    segments
}

/// Background track placement under the narration.
#[derive(Clone, Debug, PartialEq)]
pub struct MusicMix {
    pub track: PathBuf,
    /// Loop the track before trimming because it is shorter than the narration.
    pub looped: bool,
    /// Length of the looped (or original) track before trimming.
    pub covered: f64,
    /// Contribution length after trimming; always the narration length.
    pub duration: f64,
    pub gain: f64,
}

pub fn plan_music(track: PathBuf, track_duration: f64, target: f64) -> MusicMix {
    let looped = track_duration < target;
    let covered = if looped {
        target + MUSIC_LOOP_MARGIN_SECS
    } else {
        track_duration
    };
    MusicMix {
        track,
        looped,
        covered,
        duration: covered.min(target),
        gain: MUSIC_GAIN,
    }
}

#[derive(Clone, Debug)]
pub struct AssemblyPlan {
    pub narration: PathBuf,
    pub target: f64,
    pub segments: Vec<Segment>,
    pub music: Option<MusicMix>,
}

impl AssemblyPlan {
    fn music_input(&self) -> usize {
        self.segments.len() + 1
    }

    /// ffmpeg filter graph: per-segment framing, chained crossfades, audio mix.
    pub fn filter_graph(&self) -> String {
        let mut chains: Vec<String> = Vec::new();

        for (i, seg) in self.segments.iter().enumerate() {
            let mut filters: Vec<String> = seg.ops.iter().map(FrameOp::filter).collect();
            filters.push(format!("fps={}", FRAME_RATE));
            filters.push("setsar=1".to_string());
            filters.push("format=yuv420p".to_string());
            filters.push(format!("trim=duration={:.3}", seg.duration));
            filters.push("setpts=PTS-STARTPTS".to_string());
            chains.push(format!("[{}:v]{}[v{}]", i + 1, filters.join(","), i));
        }

        let mut current = "v0".to_string();
        for (i, seg) in self.segments.iter().enumerate().skip(1) {
            let next = format!("x{}", i);
            chains.push(format!(
                "[{}][v{}]xfade=transition=fade:duration={:.3}:offset={:.3}[{}]",
                current, i, seg.transition, seg.start, next
            ));
            current = next;
        }
        chains.push(format!(
            "[{}]trim=duration={:.3},setpts=PTS-STARTPTS[vout]",
            current, self.target
        ));

        chains.push(format!(
            "[0:a]aformat=channel_layouts=stereo,atrim=duration={:.3},asetpts=PTS-STARTPTS[voice]",
            self.target
        ));
        match &self.music {
            Some(music) => {
                chains.push(format!(
                    "[{}:a]atrim=duration={:.3},asetpts=PTS-STARTPTS,volume={:.2},aformat=channel_layouts=stereo[music]",
                    self.music_input(),
                    music.duration,
                    music.gain
                ));
                chains.push(
                    "[voice][music]amix=inputs=2:duration=first:normalize=0[aout]".to_string(),
                );
            }
            None => chains.push("[voice]anull[aout]".to_string()),
        }

        chains.join(";")
    }

    /// Full ffmpeg argument list, excluding the output path.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-i".into(), self.narration.display().to_string()];
        for seg in &self.segments {
            args.push("-i".into());
            args.push(seg.clip.display().to_string());
        }
        if let Some(music) = &self.music {
            if music.looped {
                args.push("-stream_loop".into());
                args.push("-1".into());
            }
            args.push("-i".into());
            args.push(music.track.display().to_string());
        }

        let output_args: Vec<String> = vec![
            "-filter_complex".into(),
            self.filter_graph(),
            "-map".into(),
            "[vout]".into(),
            "-map".into(),
            "[aout]".into(),
            "-c:v".into(),
            VIDEO_CODEC.into(),
            "-preset".into(),
            ENCODE_PRESET.into(),
            "-r".into(),
            FRAME_RATE.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            AUDIO_CODEC.into(),
            "-t".into(),
            format!("{:.3}", self.target),
            "-movflags".into(),
            "+faststart".into(),
        ];
        args.extend(output_args);
        args
    }
}

pub struct Assembler {
    workspace: Workspace,
}

impl Assembler {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    async fn pick_music(&self, target: f64) -> Result<Option<MusicMix>> {
        let tracks = self.workspace.music_tracks();
        let Some(track) = tracks.choose(&mut rand::rng()).cloned() else {
            debug!("no background music available");
            return Ok(None);
        };

        let info = media::probe(&track).await?;
        info!(track = %track.display(), duration = info.duration, "selected background music");
        Ok(Some(plan_music(track, info.duration, target)))
    }

    pub async fn plan(
        &self,
        narration_path: &Path,
        clips: &[ClipHandle],
        mode: Mode,
    ) -> Result<AssemblyPlan> {
        let target = media::probe(narration_path).await?.duration;
        if target <= 0.0 {
            return Err(HomilyError::Media {
                tool: "ffprobe",
                path: narration_path.to_path_buf(),
                reason: "narration has no duration".to_string(),
            });
        }

        let segments = plan_segments(clips, mode, target);
        if segments.is_empty() {
            return Err(HomilyError::NoClips);
        }

        Ok(AssemblyPlan {
            narration: narration_path.to_path_buf(),
            target,
            segments,
            music: self.pick_music(target).await?,
        })
    }

    /// Compose narration, music and clips into the output file.
    pub async fn assemble(
        &self,
        narration_path: &Path,
        clips: &[ClipHandle],
        mode: Mode,
    ) -> Result<OutputVideo> {
        let plan = self.plan(narration_path, clips, mode).await?;
        info!(
            %mode,
            target = plan.target,
            segments = plan.segments.len(),
            music = plan.music.is_some(),
            "encoding video"
        );

        let output = self.workspace.output_path();
        media::run_ffmpeg(&plan.ffmpeg_args(), &output).await?;

        Ok(OutputVideo {
            path: output,
            duration: plan.target,
        })
    }
}
