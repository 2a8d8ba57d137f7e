use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::session::Command;

/// A command scheduled at a frame position in the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub frame: u64,
    pub command: Command,
}

/// Frame-ordered list of commands.
///
/// Events fire at the first block boundary at or after their frame; nothing changes
/// inside a block.
#[derive(Debug, Clone, Default)]
pub struct Automation {
    events: Vec<AutomationEvent>,
    next: usize,
}

impl Automation {
    pub fn new(mut events: Vec<AutomationEvent>) -> Self {
        events.sort_by_key(|e| e.frame);
        Self { events, next: 0 }
    }

    /// Loads a JSON array of events, e.g.
    /// `[{"frame": 0, "command": {"cmd": "setParams", "bitDepth": 4}}]`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read automation file {}", path.display()))?;
        let events: Vec<AutomationEvent> =
            serde_json::from_str(&contents).context("failed to parse automation")?;
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns every not-yet-fired event due at or before `frame` and marks them fired.
    pub fn take_due(&mut self, frame: u64) -> &[AutomationEvent] {
        let start = self.next;
        while self
            .events
            .get(self.next)
            .is_some_and(|event| event.frame <= frame)
        {
            self.next += 1;
        }
        &self.events[start..self.next]
    }
}
