use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use strata_geometry::ScrollOffset;

/// Visual viewport offset of history entries that predate storing it.
pub const LEGACY_VISUAL_VIEWPORT_OFFSET: ScrollOffset = ScrollOffset::new(-1.0, -1.0);

/// Scroll state saved with a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewState {
    /// Offset of the layout viewport. Legacy entries stored the combined
    /// offset here.
    pub scroll_offset: ScrollOffset,
    /// Visual viewport offset relative to the layout viewport.
    pub visual_viewport_scroll_offset: ScrollOffset,
    /// Zero when the scale was not saved.
    pub page_scale_factor: f32,
}

impl ViewState {
    pub fn has_legacy_visual_viewport_offset(&self) -> bool {
        self.visual_viewport_scroll_offset == LEGACY_VISUAL_VIEWPORT_OFFSET
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serializing view state")
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a view state.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing view state")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test code")]
mod tests {
    use super::*;

    #[test]
    fn legacy_sentinel_is_detected() {
        let state = ViewState {
            scroll_offset: ScrollOffset::new(0.0, 300.0),
            visual_viewport_scroll_offset: LEGACY_VISUAL_VIEWPORT_OFFSET,
            page_scale_factor: 0.0,
        };
        assert!(state.has_legacy_visual_viewport_offset());
        let parsed = ViewState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ViewState::from_json("{\"scroll_offset\": 3}").is_err());
    }
}
