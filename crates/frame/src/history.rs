use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use strata_scroll::ViewState;
use strata_scroll_anchor::SerializedAnchor;

/// What a history entry remembers about the frame's scroll position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub view_state: ViewState,
    /// Preferred over `view_state`'s offsets when it can be restored.
    #[serde(default)]
    pub scroll_anchor: Option<SerializedAnchor>,
}

impl HistoryItem {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serializing history item")
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a history item.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing history item")
    }
}
