//! Computed style: only the properties paint layers, clipping and scroll
//! anchoring read.

use strata_geometry::{Outsets, RectF, Transform2D, WritingMode};

/// The `position` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// The `overflow-x` / `overflow-y` properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Scroll,
    Auto,
}

impl Overflow {
    /// `hidden`, `scroll` and `auto` make a scroll container.
    pub const fn is_scrollable(self) -> bool {
        matches!(self, Self::Hidden | Self::Scroll | Self::Auto)
    }

    /// Whether the user can scroll along an axis with this value.
    pub const fn is_user_scrollable(self) -> bool {
        matches!(self, Self::Scroll | Self::Auto)
    }
}

/// The `overflow-anchor` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowAnchor {
    #[default]
    Auto,
    None,
}

/// The `visibility` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// The `content-visibility` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentVisibility {
    #[default]
    Visible,
    Auto,
    Hidden,
}

/// The `resize` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resize {
    #[default]
    None,
    Both,
    Horizontal,
    Vertical,
}

/// The `scroll-behavior` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CssScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

/// Computed values for one layout object.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub position: Position,
    /// `None` is `z-index: auto`.
    pub z_index: Option<i32>,
    pub opacity: f32,
    pub transform: Option<Transform2D>,
    pub isolate: bool,
    pub contain_paint: bool,
    /// The box is a flex or grid item, so `z-index` applies without positioning.
    pub is_flex_or_grid_item: bool,
    pub floating: bool,
    pub column_span_all: bool,
    pub overflow_x: Overflow,
    pub overflow_y: Overflow,
    pub overflow_anchor: OverflowAnchor,
    pub writing_mode: WritingMode,
    /// Uniform corner radius; zero means square corners.
    pub border_radius: f32,
    pub border_widths: Outsets,
    /// CSS `clip`, only honored on absolutely positioned boxes.
    pub clip: Option<RectF>,
    pub visibility: Visibility,
    pub content_visibility: ContentVisibility,
    pub resize: Resize,
    /// Scrollbars are overlay (auto-hiding) rather than classic.
    pub overlay_scrollbars: bool,
    pub scroll_padding: Outsets,
    pub scroll_behavior: CssScrollBehavior,
    pub inset: Outsets,
    pub margin: Outsets,
    pub padding: Outsets,
    pub specified_width: Option<f32>,
    pub specified_height: Option<f32>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            position: Position::Static,
            z_index: None,
            opacity: 1.0,
            transform: None,
            isolate: false,
            contain_paint: false,
            is_flex_or_grid_item: false,
            floating: false,
            column_span_all: false,
            overflow_x: Overflow::Visible,
            overflow_y: Overflow::Visible,
            overflow_anchor: OverflowAnchor::Auto,
            writing_mode: WritingMode::HorizontalTb,
            border_radius: 0.0,
            border_widths: Outsets::ZERO,
            clip: None,
            visibility: Visibility::Visible,
            content_visibility: ContentVisibility::Visible,
            resize: Resize::None,
            overlay_scrollbars: false,
            scroll_padding: Outsets::ZERO,
            scroll_behavior: CssScrollBehavior::Auto,
            inset: Outsets::ZERO,
            margin: Outsets::ZERO,
            padding: Outsets::ZERO,
            specified_width: None,
            specified_height: None,
        }
    }
}

impl ComputedStyle {
    /// Builder: set `position`.
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Builder: set `z-index`.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    /// Builder: set both overflow axes.
    #[must_use]
    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow_x = overflow;
        self.overflow_y = overflow;
        self
    }

    /// Builder: set `opacity`.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Builder: set `transform`.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform2D) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Builder: set `writing-mode`.
    #[must_use]
    pub fn with_writing_mode(mut self, writing_mode: WritingMode) -> Self {
        self.writing_mode = writing_mode;
        self
    }

    /// Builder: set `overflow-anchor: none`.
    #[must_use]
    pub fn with_overflow_anchor_none(mut self) -> Self {
        self.overflow_anchor = OverflowAnchor::None;
        self
    }

    /// Builder: set `border-radius`.
    #[must_use]
    pub fn with_border_radius(mut self, radius: f32) -> Self {
        self.border_radius = radius;
        self
    }

    /// Builder: set CSS `clip`.
    #[must_use]
    pub fn with_clip(mut self, clip: RectF) -> Self {
        self.clip = Some(clip);
        self
    }

    /// `z-index: auto`.
    pub fn has_auto_z_index(&self) -> bool {
        self.z_index.is_none()
    }

    /// Whether `z-index` has any effect on this box.
    pub fn z_index_applies(&self) -> bool {
        self.position != Position::Static || self.is_flex_or_grid_item
    }

    /// The z-index used for stacking order. `auto` and non-applicable
    /// values count as zero.
    pub fn effective_z_index(&self) -> i32 {
        if self.z_index_applies() {
            self.z_index.unwrap_or(0)
        } else {
            0
        }
    }

    /// Stacking context triggers that only depend on style.
    pub fn is_stacking_context_without_containment(&self) -> bool {
        (self.z_index_applies() && !self.has_auto_z_index())
            || matches!(self.position, Position::Fixed | Position::Sticky)
            || self.opacity < 1.0
            || self.transform.is_some()
            || self.isolate
    }

    /// Either axis turns this box into a scroll container.
    pub fn is_scroll_container(&self) -> bool {
        self.overflow_x.is_scrollable() || self.overflow_y.is_scrollable()
    }

    /// Overflow is clipped along at least one axis.
    pub fn has_non_visible_overflow(&self) -> bool {
        self.overflow_x != Overflow::Visible || self.overflow_y != Overflow::Visible
    }

    /// The box is absolutely or fixed positioned.
    pub fn is_out_of_flow_positioned(&self) -> bool {
        matches!(self.position, Position::Absolute | Position::Fixed)
    }

    /// Whether a change from `old` to `self` invalidates a saved scroll
    /// anchor offset.
    pub fn scroll_anchor_disabling_property_changed(&self, old: &Self) -> bool {
        self.position != old.position
            || self.inset != old.inset
            || self.margin != old.margin
            || self.padding != old.padding
            || self.specified_width != old.specified_width
            || self.specified_height != old.specified_height
            || self.transform != old.transform
    }
}
