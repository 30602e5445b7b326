use crate::node::TransformNodeId;
use strata_geometry::ScrollOffset;

/// The compositor-side copy of the property trees.
///
/// Scroll and pinch-zoom updates try to patch the committed transform
/// node in place. When a patch is refused the caller must invalidate
/// paint properties and go through a full pre-paint instead.
pub trait PaintArtifactCompositor {
    /// Patch a scroll translation node to `offset`.
    fn directly_update_scroll_offset_transform(
        &mut self,
        node: TransformNodeId,
        offset: ScrollOffset,
    ) -> bool;

    /// Patch a page scale node to `scale`.
    fn directly_update_page_scale_transform(&mut self, node: TransformNodeId, scale: f32) -> bool;
}
