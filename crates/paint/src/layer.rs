//! Paint layers and their dirty bits.

use crate::fragment::FragmentData;
use crate::stacking_node::PaintLayerStackingNode;
use indextree::NodeId;
use smallvec::SmallVec;
use strata_geometry::Transform2D;
use strata_layout_tree::{LayoutObjectId, PaintLayerType};

/// Handle to a layer in a [`crate::PaintLayerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaintLayerId(pub(crate) NodeId);

/// Data most layers never need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintLayerRareData {
    pub transform: Option<Transform2D>,
    /// Nearest ancestor layer of a multi-column flow thread.
    pub enclosing_pagination_layer: Option<PaintLayerId>,
}

/// A node of the paint layer tree, owned by a layout object that needs
/// its own layer.
#[derive(Debug)]
pub struct PaintLayer {
    object: LayoutObjectId,
    pub(crate) layer_type: PaintLayerType,
    pub(crate) is_root: bool,
    pub(crate) stacking_node: Option<Box<PaintLayerStackingNode>>,
    pub(crate) rare: Option<Box<PaintLayerRareData>>,
    pub(crate) fragments: SmallVec<FragmentData, 1>,

    pub(crate) is_self_painting: bool,
    pub(crate) has_visible_content: bool,
    pub(crate) has_visible_descendant: bool,
    pub(crate) has_self_painting_layer_descendant: bool,
    pub(crate) has_stacked_descendant_in_current_stacking_context: bool,

    pub(crate) needs_descendant_dependent_flags_update: bool,
    pub(crate) needs_repaint: bool,
    pub(crate) descendant_needs_repaint: bool,
    pub(crate) needs_cull_rect_update: bool,
    pub(crate) needs_visual_overflow_recalc: bool,
    pub(crate) needs_reorder_overlay_overflow_controls: bool,
}

impl PaintLayer {
    pub(crate) fn new(object: LayoutObjectId, layer_type: PaintLayerType, is_root: bool) -> Self {
        Self {
            object,
            layer_type,
            is_root,
            stacking_node: None,
            rare: None,
            fragments: SmallVec::new(),
            is_self_painting: false,
            has_visible_content: true,
            has_visible_descendant: false,
            has_self_painting_layer_descendant: false,
            has_stacked_descendant_in_current_stacking_context: false,
            needs_descendant_dependent_flags_update: true,
            needs_repaint: true,
            descendant_needs_repaint: false,
            needs_cull_rect_update: true,
            needs_visual_overflow_recalc: false,
            needs_reorder_overlay_overflow_controls: false,
        }
    }

    #[inline]
    pub fn layout_object(&self) -> LayoutObjectId {
        self.object
    }

    #[inline]
    pub fn layer_type(&self) -> PaintLayerType {
        self.layer_type
    }

    /// The layer of the view.
    #[inline]
    pub fn is_root_layer(&self) -> bool {
        self.is_root
    }

    /// Present only while the layer's object is a stacking context.
    pub fn stacking_node(&self) -> Option<&PaintLayerStackingNode> {
        self.stacking_node.as_deref()
    }

    pub fn rare_data(&self) -> Option<&PaintLayerRareData> {
        self.rare.as_deref()
    }

    pub(crate) fn ensure_rare_data(&mut self) -> &mut PaintLayerRareData {
        self.rare.get_or_insert_with(Box::default)
    }

    pub fn transform(&self) -> Option<Transform2D> {
        self.rare.as_ref().and_then(|rare| rare.transform)
    }

    pub fn enclosing_pagination_layer(&self) -> Option<PaintLayerId> {
        self.rare.as_ref().and_then(|rare| rare.enclosing_pagination_layer)
    }

    /// Fragments written by the last pre-paint, first fragment first.
    pub fn fragments(&self) -> &[FragmentData] {
        &self.fragments
    }

    pub fn first_fragment(&self) -> Option<&FragmentData> {
        self.fragments.first()
    }

    pub fn is_self_painting_layer(&self) -> bool {
        self.is_self_painting
    }

    pub fn has_visible_content(&self) -> bool {
        self.has_visible_content
    }

    pub fn has_visible_descendant(&self) -> bool {
        self.has_visible_descendant
    }

    pub fn has_self_painting_layer_descendant(&self) -> bool {
        self.has_self_painting_layer_descendant
    }

    pub fn has_stacked_descendant_in_current_stacking_context(&self) -> bool {
        self.has_stacked_descendant_in_current_stacking_context
    }

    pub fn needs_descendant_dependent_flags_update(&self) -> bool {
        self.needs_descendant_dependent_flags_update
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    pub fn descendant_needs_repaint(&self) -> bool {
        self.descendant_needs_repaint
    }

    pub fn needs_cull_rect_update(&self) -> bool {
        self.needs_cull_rect_update
    }

    pub fn set_needs_cull_rect_update(&mut self, needs_update: bool) {
        self.needs_cull_rect_update = needs_update;
    }

    pub fn needs_visual_overflow_recalc(&self) -> bool {
        self.needs_visual_overflow_recalc
    }

    pub fn set_needs_visual_overflow_recalc(&mut self, needs_recalc: bool) {
        self.needs_visual_overflow_recalc = needs_recalc;
    }

    /// The overlay overflow controls of this layer paint after a stacked
    /// descendant instead of right after the layer's own contents.
    pub fn needs_reorder_overlay_overflow_controls(&self) -> bool {
        self.needs_reorder_overlay_overflow_controls
    }

    /// Called once paint has consumed the layer.
    pub fn clear_needs_repaint(&mut self) {
        self.needs_repaint = false;
        self.descendant_needs_repaint = false;
    }
}
