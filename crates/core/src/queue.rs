use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{error::Result, types::Mode, workspace::Workspace};

/// Topic used when both queues are exhausted.
pub const FALLBACK_TOPIC: &str = "Finding Peace in Chaos";

/// FIFO of topics stored one per line in a flat file.
#[derive(Debug)]
pub struct TopicQueue {
    path: PathBuf,
}

impl TopicQueue {
    /// Open the queue file, creating it empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::File::create(&path)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blank entries in queue order, trimmed.
    pub fn entries(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Remove and return the first entry, rewriting the file without it.
    pub fn pop_front(&self) -> Result<Option<String>> {
        let mut entries = self.entries()?;
        if entries.is_empty() {
            return Ok(None);
        }
        let head = entries.remove(0);
        self.rewrite(&entries)?;
        Ok(Some(head))
    }

    pub fn push_back(&self, topic: &str) -> Result<()> {
        let unterminated = fs::read(&self.path)
            .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
            .unwrap_or(false);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if unterminated {
            writeln!(file)?;
        }
        writeln!(file, "{}", topic.trim())?;
        Ok(())
    }

    // Sibling temp file renamed over the queue: readers never see a partial write.
    fn rewrite(&self, entries: &[String]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        for entry in entries {
            writeln!(tmp, "{}", entry)?;
        }
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Chooses the next topic from the new-topic queue and the long-form backlog.
#[derive(Debug)]
pub struct TopicQueueManager {
    new_topics: TopicQueue,
    long_backlog: TopicQueue,
}

impl TopicQueueManager {
    pub fn new(new_topics: TopicQueue, long_backlog: TopicQueue) -> Self {
        Self {
            new_topics,
            long_backlog,
        }
    }

    pub fn open(workspace: &Workspace) -> Result<Self> {
        Ok(Self::new(
            TopicQueue::open(workspace.topics_path())?,
            TopicQueue::open(workspace.long_queue_path())?,
        ))
    }

    pub fn new_topics(&self) -> &TopicQueue {
        &self.new_topics
    }

    pub fn long_backlog(&self) -> &TopicQueue {
        &self.long_backlog
    }

    /// Pop the next topic for `mode`.
    ///
    /// Long-form runs drain the backlog first. Short-form topics are rotated
    /// into the backlog so each one is later revisited as a long-form subject.
    pub fn next_topic(&self, mode: Mode) -> Result<String> {
        if mode == Mode::Long
            && let Some(topic) = self.long_backlog.pop_front()?
        {
            info!(%topic, "found topic in long-form backlog");
            return Ok(topic);
        }

        if let Some(topic) = self.new_topics.pop_front()? {
            if mode == Mode::Short {
                self.long_backlog.push_back(&topic)?;
                debug!(%topic, "rotated topic into long-form backlog");
            }
            info!(%topic, "took topic from new-topic queue");
            return Ok(topic);
        }

        info!(topic = FALLBACK_TOPIC, "both queues are empty, using fallback topic");
        Ok(FALLBACK_TOPIC.to_string())
    }
}
