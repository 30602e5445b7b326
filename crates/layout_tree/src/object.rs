//! Layout objects and the predicates derived from their kind and style.

use crate::dom::DomNodeId;
use crate::style::{ComputedStyle, Overflow, Position, Resize};
use indextree::NodeId;
use strata_geometry::{PointF, RectF, ScrollOffset, SizeF};

/// Handle to a layout object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutObjectId(pub(crate) NodeId);

/// Column geometry of a multi-column container.
///
/// Columns are laid out left to right; content flows through a single
/// tall flow thread whose block range `[i * column_height, (i + 1) * column_height)`
/// lands in column `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnLayout {
    pub count: u32,
    pub column_width: f32,
    pub column_height: f32,
    pub gap: f32,
}

impl ColumnLayout {
    /// Column index holding flow-thread block offset `block_offset`.
    ///
    /// Content past the last column keeps flowing into overflow columns.
    pub fn column_at(&self, block_offset: f32) -> u32 {
        if self.column_height <= 0.0 || block_offset <= 0.0 {
            return 0;
        }
        (block_offset / self.column_height).floor() as u32
    }

    /// Translation from flow-thread coordinates to the container for column `index`.
    pub fn column_translation(&self, index: u32) -> ScrollOffset {
        let index = index as f32;
        ScrollOffset::new(
            index * (self.column_width + self.gap),
            -index * self.column_height,
        )
    }

    /// The part of the flow thread that column `index` shows.
    pub fn flow_thread_portion(&self, index: u32) -> RectF {
        RectF::new(
            0.0,
            index as f32 * self.column_height,
            self.column_width,
            self.column_height,
        )
    }

    /// Columns intersected by a flow-thread rect, with the intersected pieces.
    pub fn fragments(&self, rect: &RectF) -> Vec<(u32, RectF)> {
        let first = self.column_at(rect.y);
        let mut last = self.column_at(rect.max_y());
        if last > first && self.column_height > 0.0 && rect.max_y() % self.column_height == 0.0 {
            last -= 1;
        }
        (first..=last)
            .map(|index| {
                let portion = self.flow_thread_portion(index);
                let mut piece = RectF::new(rect.x, rect.y.max(portion.y), rect.width, 0.0);
                piece.shift_bottom_edge_to(rect.max_y().min(portion.max_y()));
                (index, piece)
            })
            .collect()
    }

    /// Bounding box, in container coordinates, of a flow-thread rect split into columns.
    pub fn flow_thread_to_visual(&self, rect: &RectF) -> RectF {
        self.fragments(rect)
            .into_iter()
            .map(|(index, piece)| piece.translated(self.column_translation(index)))
            .reduce(|visual, mapped| visual.union(&mapped))
            .unwrap_or(*rect)
    }
}

/// The kind of box a layout object generates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutObjectKind {
    /// The root of the layout tree, sized to the frame.
    View,
    Block,
    /// Atomic inline-level box (`inline-block`).
    InlineBlock,
    /// Non-atomic inline box; its geometry is the union of its line boxes.
    Inline,
    Text,
    /// Images, video and other replaced boxes.
    Replaced,
    /// Iframes and plugins.
    EmbeddedContent,
    /// A multi-column container. Its only child is the flow thread.
    MultiColumn(ColumnLayout),
    /// The anonymous flow thread of a multi-column container.
    FlowThread,
}

/// Whether and why an object needs a paint layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintLayerType {
    NoPaintLayer,
    /// The layer only exists to clip overflow and is not self-painting.
    OverflowClipPaintLayer,
    NormalPaintLayer,
}

/// One node of the layout tree.
#[derive(Debug, Clone)]
pub struct LayoutObject {
    kind: LayoutObjectKind,
    node: Option<DomNodeId>,
    pub(crate) style: ComputedStyle,
    /// Border-box origin relative to the container's border box, before
    /// the container's scroll offset is applied. Inside a flow thread this
    /// is in flow-thread coordinates.
    pub location: PointF,
    pub size: SizeF,
    /// Ink overflow in local coordinates; `None` means the border box.
    pub visual_overflow: Option<RectF>,
    /// Layout overflow in local coordinates; `None` means the border box.
    pub scrollable_overflow: Option<RectF>,
    /// Committed scroll offset of a scroll container.
    pub scroll_offset: ScrollOffset,
    pub needs_layout: bool,
    /// `content-visibility: auto` box whose contents were skipped by layout.
    pub content_visibility_auto_without_layout: bool,
    pub(crate) scroll_anchor_disabling_style_changed: bool,
    pub(crate) in_top_layer: bool,
}

impl LayoutObject {
    pub(crate) fn new(kind: LayoutObjectKind, node: Option<DomNodeId>, style: ComputedStyle) -> Self {
        Self {
            kind,
            node,
            style,
            location: PointF::ZERO,
            size: SizeF::ZERO,
            visual_overflow: None,
            scrollable_overflow: None,
            scroll_offset: ScrollOffset::ZERO,
            needs_layout: true,
            content_visibility_auto_without_layout: false,
            scroll_anchor_disabling_style_changed: false,
            in_top_layer: false,
        }
    }

    #[inline]
    pub fn kind(&self) -> LayoutObjectKind {
        self.kind
    }

    /// The DOM node that generated this object; `None` for anonymous boxes.
    #[inline]
    pub fn node(&self) -> Option<DomNodeId> {
        self.node
    }

    #[inline]
    pub fn style(&self) -> &ComputedStyle {
        &self.style
    }

    #[inline]
    pub fn is_view(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::View)
    }

    pub fn is_anonymous(&self) -> bool {
        self.node.is_none() && !self.is_view()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::Text)
    }

    /// A non-atomic inline box.
    pub fn is_layout_inline(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::Inline)
    }

    pub fn is_atomic_inline_level(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::InlineBlock | LayoutObjectKind::Replaced)
    }

    /// Inline-level and not atomic: text and inline boxes.
    pub fn is_inline_non_atomic(&self) -> bool {
        self.is_layout_inline() || self.is_text()
    }

    /// Every kind except inline boxes and text generates a box.
    pub fn is_box(&self) -> bool {
        !self.is_inline_non_atomic()
    }

    pub fn is_layout_embedded_content(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::EmbeddedContent)
    }

    pub fn is_flow_thread(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::FlowThread)
    }

    pub fn column_layout(&self) -> Option<ColumnLayout> {
        match self.kind {
            LayoutObjectKind::MultiColumn(columns) => Some(columns),
            _ => None,
        }
    }

    pub fn is_in_top_layer(&self) -> bool {
        self.in_top_layer
    }

    pub fn is_out_of_flow_positioned(&self) -> bool {
        self.style.is_out_of_flow_positioned()
    }

    pub fn is_fixed_positioned(&self) -> bool {
        self.style.position == Position::Fixed
    }

    pub fn is_sticky_positioned(&self) -> bool {
        self.style.position == Position::Sticky
    }

    /// Set by style changes that invalidate a saved scroll-anchor offset.
    pub fn scroll_anchor_disabling_style_changed(&self) -> bool {
        self.scroll_anchor_disabling_style_changed
    }

    /// Whether this object would be a stacking context with `style`.
    pub fn is_stacking_context_for(&self, style: &ComputedStyle) -> bool {
        self.is_view()
            || self.in_top_layer
            || style.is_stacking_context_without_containment()
            || (style.contain_paint && self.is_box())
    }

    /// Whether this object establishes a stacking context.
    pub fn is_stacking_context(&self) -> bool {
        self.is_stacking_context_for(&self.style)
    }

    /// Whether this object would be stacked with `style`.
    pub fn is_stacked_for(&self, style: &ComputedStyle) -> bool {
        style.position != Position::Static || self.is_stacking_context_for(style)
    }

    /// Stacked objects are painted by their stacking context in z-order
    /// rather than in normal flow.
    pub fn is_stacked(&self) -> bool {
        self.is_stacked_for(&self.style)
    }

    /// The z-index used to sort stacked layers.
    pub fn effective_z_index(&self) -> i32 {
        if self.is_view() {
            return 0;
        }
        self.style.effective_z_index()
    }

    pub fn can_contain_absolute_position_objects(&self) -> bool {
        self.is_view()
            || self.style.position != Position::Static
            || self.style.transform.is_some()
            || self.style.contain_paint
    }

    pub fn can_contain_fixed_position_objects(&self) -> bool {
        self.is_view() || self.style.transform.is_some() || self.style.contain_paint
    }

    /// Boxes with non-visible overflow on either axis clip their contents.
    /// The view always clips.
    pub fn should_clip_overflow_along_either_axis(&self) -> bool {
        if self.is_view() {
            return true;
        }
        self.is_box() && self.style.has_non_visible_overflow()
    }

    /// The box scrolls its overflow.
    pub fn is_scroll_container(&self) -> bool {
        self.is_view() || (self.is_box() && self.style.is_scroll_container())
    }

    /// Overlay scrollbars or a resizer, painted on top of the contents.
    pub fn has_overlay_overflow_controls(&self) -> bool {
        self.is_scroll_container() && (self.style.overlay_scrollbars || self.style.resize != Resize::None)
    }

    /// CSS `clip` only applies to absolutely positioned boxes.
    pub fn css_clip(&self) -> Option<RectF> {
        if self.is_out_of_flow_positioned() {
            self.style.clip
        } else {
            None
        }
    }

    pub fn has_border_radius(&self) -> bool {
        self.style.border_radius > 0.0
    }

    /// Whether the user may scroll along x and y.
    pub fn user_scrollable_axes(&self) -> (bool, bool) {
        if self.is_view() {
            return (
                self.style.overflow_x != Overflow::Hidden,
                self.style.overflow_y != Overflow::Hidden,
            );
        }
        (
            self.style.overflow_x.is_user_scrollable(),
            self.style.overflow_y.is_user_scrollable(),
        )
    }

    /// Which kind of paint layer this object needs.
    pub fn layer_type_required(&self) -> PaintLayerType {
        if self.is_view()
            || self.is_stacked()
            || self.is_flow_thread()
            || self.style.transform.is_some()
            || self.css_clip().is_some()
            || self.style.resize != Resize::None
        {
            return PaintLayerType::NormalPaintLayer;
        }
        if self.should_clip_overflow_along_either_axis() {
            return PaintLayerType::OverflowClipPaintLayer;
        }
        PaintLayerType::NoPaintLayer
    }

    /// Border box in local coordinates.
    pub fn border_box_rect(&self) -> RectF {
        RectF::from_origin_size(PointF::ZERO, self.size)
    }

    /// Padding box in local coordinates; the clip applied to overflow.
    pub fn overflow_clip_rect(&self) -> RectF {
        self.border_box_rect().contracted(&self.style.border_widths)
    }

    /// Visual overflow, always including the border box.
    pub fn visual_overflow_rect(&self) -> RectF {
        let border_box = self.border_box_rect();
        self.visual_overflow
            .map_or(border_box, |overflow| overflow.union(&border_box))
    }

    /// Layout overflow, always including the border box.
    pub fn scrollable_overflow_rect(&self) -> RectF {
        let border_box = self.border_box_rect();
        self.scrollable_overflow
            .map_or(border_box, |overflow| overflow.union(&border_box))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnLayout {
        ColumnLayout {
            count: 3,
            column_width: 100.0,
            column_height: 50.0,
            gap: 10.0,
        }
    }

    #[test]
    fn columns_split_flow_thread_rects() {
        let fragments = columns().fragments(&RectF::new(0.0, 40.0, 80.0, 30.0));
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], (0, RectF::new(0.0, 40.0, 80.0, 10.0)));
        assert_eq!(fragments[1], (1, RectF::new(0.0, 50.0, 80.0, 20.0)));
    }

    #[test]
    fn second_column_is_offset_by_width_and_gap() {
        let layout = columns();
        assert_eq!(layout.column_translation(1), ScrollOffset::new(110.0, -50.0));
        let visual = layout.flow_thread_to_visual(&RectF::new(0.0, 60.0, 80.0, 20.0));
        assert_eq!(visual, RectF::new(110.0, 10.0, 80.0, 20.0));
    }

    #[test]
    fn positioned_objects_are_stacked_but_not_always_contexts() {
        let object = LayoutObject::new(
            LayoutObjectKind::Block,
            None,
            ComputedStyle::default().with_position(Position::Relative),
        );
        assert!(object.is_stacked());
        assert!(!object.is_stacking_context());
        assert_eq!(object.layer_type_required(), PaintLayerType::NormalPaintLayer);
    }

    #[test]
    fn hidden_overflow_only_needs_a_clip_layer() {
        let object = LayoutObject::new(
            LayoutObjectKind::Block,
            None,
            ComputedStyle::default().with_overflow(Overflow::Hidden),
        );
        assert_eq!(object.layer_type_required(), PaintLayerType::OverflowClipPaintLayer);
        let inline = LayoutObject::new(
            LayoutObjectKind::Inline,
            None,
            ComputedStyle::default().with_overflow(Overflow::Hidden),
        );
        assert_eq!(inline.layer_type_required(), PaintLayerType::NoPaintLayer);
    }
}
