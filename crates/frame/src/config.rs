//! Pipeline settings.
//!
//! Every setting has a compiled-in default and can be overridden through a
//! `STRATA_*` environment variable.

use core::str::FromStr;
use core::time::Duration;
use log::warn;
use std::env;

/// Runtime configuration of a [`crate::FrameView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Keep fractional scroll offsets instead of snapping them to whole
    /// pixels.
    pub fractional_scroll_offsets: bool,
    /// Whether scroll anchors are chosen and adjusted at all.
    pub scroll_anchoring: bool,
    /// Longest selector a serialized scroll anchor may carry.
    pub scroll_anchor_max_selector_len: usize,
    /// Time one `service_scroll_animations` call advances animations by.
    pub smooth_scroll_step_ms: u64,
    /// Length of a smooth scroll.
    pub smooth_scroll_duration_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// The default configuration.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fractional_scroll_offsets: false,
            scroll_anchoring: true,
            scroll_anchor_max_selector_len: 500,
            smooth_scroll_step_ms: 16,
            smooth_scroll_duration_ms: 150,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `STRATA_FRACTIONAL_SCROLL_OFFSETS`: `1`/`true` to keep fractional offsets (default: off)
    /// - `STRATA_SCROLL_ANCHORING`: `0`/`false` to disable scroll anchoring (default: on)
    /// - `STRATA_SCROLL_ANCHOR_MAX_SELECTOR_LEN`: selector length limit (default: 500)
    /// - `STRATA_SMOOTH_SCROLL_STEP_MS`: animation tick in milliseconds (default: 16)
    /// - `STRATA_SMOOTH_SCROLL_DURATION_MS`: smooth scroll length in milliseconds (default: 150)
    ///
    /// Malformed values are logged and replaced by the default.
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::new();
        Self {
            fractional_scroll_offsets: flag(
                "STRATA_FRACTIONAL_SCROLL_OFFSETS",
                lookup("STRATA_FRACTIONAL_SCROLL_OFFSETS"),
                defaults.fractional_scroll_offsets,
            ),
            scroll_anchoring: flag(
                "STRATA_SCROLL_ANCHORING",
                lookup("STRATA_SCROLL_ANCHORING"),
                defaults.scroll_anchoring,
            ),
            scroll_anchor_max_selector_len: number(
                "STRATA_SCROLL_ANCHOR_MAX_SELECTOR_LEN",
                lookup("STRATA_SCROLL_ANCHOR_MAX_SELECTOR_LEN"),
                defaults.scroll_anchor_max_selector_len,
            ),
            smooth_scroll_step_ms: number(
                "STRATA_SMOOTH_SCROLL_STEP_MS",
                lookup("STRATA_SMOOTH_SCROLL_STEP_MS"),
                defaults.smooth_scroll_step_ms,
            ),
            smooth_scroll_duration_ms: number(
                "STRATA_SMOOTH_SCROLL_DURATION_MS",
                lookup("STRATA_SMOOTH_SCROLL_DURATION_MS"),
                defaults.smooth_scroll_duration_ms,
            ),
        }
    }

    #[inline]
    #[must_use]
    pub const fn smooth_scroll_step(&self) -> Duration {
        Duration::from_millis(self.smooth_scroll_step_ms)
    }
}

fn flag(name: &str, raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => true,
        "0" | "false" | "off" | "no" => false,
        _ => {
            warn!("ignoring {name}={raw:?}: expected a boolean");
            default
        }
    }
}

fn number<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("ignoring {name}={raw:?}: expected a non-negative integer");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> PipelineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        PipelineConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn missing_variables_keep_defaults() {
        assert_eq!(lookup(&[]), PipelineConfig::new());
        assert_eq!(PipelineConfig::default().smooth_scroll_step(), Duration::from_millis(16));
    }

    #[test]
    fn variables_override_defaults() {
        let config = lookup(&[
            ("STRATA_FRACTIONAL_SCROLL_OFFSETS", "1"),
            ("STRATA_SCROLL_ANCHORING", "false"),
            ("STRATA_SCROLL_ANCHOR_MAX_SELECTOR_LEN", "64"),
            ("STRATA_SMOOTH_SCROLL_STEP_MS", " 8 "),
            ("STRATA_SMOOTH_SCROLL_DURATION_MS", "300"),
        ]);
        assert!(config.fractional_scroll_offsets);
        assert!(!config.scroll_anchoring);
        assert_eq!(config.scroll_anchor_max_selector_len, 64);
        assert_eq!(config.smooth_scroll_step_ms, 8);
        assert_eq!(config.smooth_scroll_duration_ms, 300);
    }

    #[test]
    fn malformed_values_fall_back() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = lookup(&[
            ("STRATA_SCROLL_ANCHORING", "maybe"),
            ("STRATA_SCROLL_ANCHOR_MAX_SELECTOR_LEN", "-3"),
            ("STRATA_SMOOTH_SCROLL_STEP_MS", "fast"),
        ]);
        assert_eq!(config, PipelineConfig::new());
    }
}
