//! Processed-set tracker.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use drivesite_shared::Result;

use crate::{read_optional, write_json};

/// Durable record of remote items that already produced an output document.
///
/// On disk: `{"fileIds": [...], "outputs": {"<id>": "<file name>"}}`.
/// `outputs` is absent in files written before output names were tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedSet {
    #[serde(rename = "fileIds")]
    ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the set. A missing, unreadable, or malformed file starts empty.
    pub fn load(path: &Path) -> Self {
        let content = match read_optional(path) {
            Ok(Some(content)) => content,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(error = %e, "processed set unreadable, starting empty");
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(set) => {
                debug!(ids = set.ids.len(), "loaded processed set");
                set
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "processed set malformed, starting empty");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// The output file recorded for `id`, if any.
    pub fn output_for(&self, id: &str) -> Option<&str> {
        self.outputs.get(id).map(String::as_str)
    }

    /// Mark `id` as handled by `file_name`. Call only once the file is on disk.
    pub fn record(&mut self, id: impl Into<String>, file_name: impl Into<String>) {
        let id = id.into();
        self.outputs.insert(id.clone(), file_name.into());
        self.ids.insert(id);
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
            outputs: BTreeMap::new(),
        }
    }
}
