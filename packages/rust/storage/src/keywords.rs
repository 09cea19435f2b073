//! Keyword queue: one name per line, consumed front to back.

use std::collections::VecDeque;
use std::path::Path;

use tracing::debug;

use drivesite_shared::Result;

use crate::{read_optional, write_atomic};

/// Ordered names for output documents. Only ever shrinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordQueue {
    items: VecDeque<String>,
}

impl KeywordQueue {
    /// Parse line-oriented text: lines are trimmed, blanks dropped.
    pub fn parse(text: &str) -> Self {
        text.lines().collect()
    }

    /// Load the queue. A missing file is an empty queue.
    pub fn load(path: &Path) -> Result<Self> {
        let queue = read_optional(path)?
            .map(|text| Self::parse(&text))
            .unwrap_or_default();
        debug!(path = %path.display(), remaining = queue.len(), "loaded keywords");
        Ok(queue)
    }

    /// Persist the remaining keywords, one per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = String::new();
        for keyword in &self.items {
            text.push_str(keyword);
            text.push('\n');
        }
        write_atomic(path, text.as_bytes())
    }

    /// Remove and return the front keyword.
    pub fn pop_front(&mut self) -> Option<String> {
        self.items.pop_front()
    }

    pub fn front(&self) -> Option<&str> {
        self.items.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for KeywordQueue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}
