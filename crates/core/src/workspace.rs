use std::path::{Path, PathBuf};

pub const TOPICS_FILE: &str = "topics.txt";
pub const LONG_QUEUE_FILE: &str = "long_form_queue.txt";
pub const MUSIC_DIR: &str = "music";
pub const VOICE_FILE: &str = "voice.wav";
pub const OUTPUT_FILE: &str = "final_video.mp4";

/// Fixed file layout of a run, relative to one working directory.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn topics_path(&self) -> PathBuf {
        self.root.join(TOPICS_FILE)
    }

    pub fn long_queue_path(&self) -> PathBuf {
        self.root.join(LONG_QUEUE_FILE)
    }

    pub fn music_dir(&self) -> PathBuf {
        self.root.join(MUSIC_DIR)
    }

    pub fn voice_path(&self) -> PathBuf {
        self.root.join(VOICE_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(OUTPUT_FILE)
    }

    /// Numbered download slot for the `index`-th search result
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("temp_{}.mp4", index))
    }

    /// List background tracks in the music directory, sorted by name
    pub fn music_tracks(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.music_dir()) else {
            return Vec::new();
        };

        let mut tracks: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false)
            })
            .collect();
        tracks.sort();
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_relative_to_root() {
        let ws = Workspace::new("/srv/run");
        assert_eq!(ws.topics_path(), PathBuf::from("/srv/run/topics.txt"));
        assert_eq!(
            ws.long_queue_path(),
            PathBuf::from("/srv/run/long_form_queue.txt")
        );
        assert_eq!(ws.clip_path(2), PathBuf::from("/srv/run/temp_2.mp4"));
        assert_eq!(ws.output_path(), PathBuf::from("/srv/run/final_video.mp4"));
    }

    #[test]
    fn music_tracks_only_lists_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        std::fs::create_dir(ws.music_dir()).unwrap();
        std::fs::write(ws.music_dir().join("b.mp3"), b"").unwrap();
        std::fs::write(ws.music_dir().join("a.MP3"), b"").unwrap();
        std::fs::write(ws.music_dir().join("notes.txt"), b"").unwrap();

        let tracks = ws.music_tracks();
        let names: Vec<_> = tracks
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.MP3", "b.mp3"]);
    }

    #[test]
    fn missing_music_dir_yields_no_tracks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Workspace::new(dir.path()).music_tracks().is_empty());
    }
}
