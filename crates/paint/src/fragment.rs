//! Per-fragment geometry written by pre-paint.

use strata_geometry::PointF;
use strata_property_trees::{ClipNodeId, EffectNodeId, PropertyTreeState};

/// Geometry of one fragment of a layer's box.
///
/// Unfragmented boxes have a single fragment with index 0. Boxes inside a
/// multi-column flow thread get one fragment per column they span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentData {
    /// Column index for fragmented boxes, otherwise 0.
    pub fragment_index: u32,
    /// Border-box origin in the space of `local_border_box_properties.transform`.
    pub paint_offset: PointF,
    local_border_box_properties: Option<PropertyTreeState>,
    /// Clip in effect before this box's own CSS clip.
    pub pre_clip: ClipNodeId,
    /// Effect in effect before this box's own opacity.
    pub pre_effect: EffectNodeId,
    contents_properties: Option<PropertyTreeState>,
}

impl FragmentData {
    pub fn new(
        fragment_index: u32,
        paint_offset: PointF,
        local_border_box_properties: PropertyTreeState,
        pre_clip: ClipNodeId,
        pre_effect: EffectNodeId,
        contents_properties: PropertyTreeState,
    ) -> Self {
        Self {
            fragment_index,
            paint_offset,
            local_border_box_properties: Some(local_border_box_properties),
            pre_clip,
            pre_effect,
            contents_properties: Some(contents_properties),
        }
    }

    /// A fragment whose property-tree state has not been computed yet.
    pub fn without_properties(fragment_index: u32, paint_offset: PointF) -> Self {
        Self {
            fragment_index,
            paint_offset,
            local_border_box_properties: None,
            pre_clip: ClipNodeId::ROOT,
            pre_effect: EffectNodeId::ROOT,
            contents_properties: None,
        }
    }

    #[inline]
    pub fn has_local_border_box_properties(&self) -> bool {
        self.local_border_box_properties.is_some()
    }

    /// State the box's own background and border paint under.
    pub fn local_border_box_properties(&self) -> Option<PropertyTreeState> {
        self.local_border_box_properties
    }

    /// State the box's contents paint under: its overflow clip and scroll
    /// translation applied.
    pub fn contents_properties(&self) -> Option<PropertyTreeState> {
        self.contents_properties
    }

    /// The local border-box state with the box's own clips and effects
    /// removed.
    pub fn pre_clip_properties(&self) -> Option<PropertyTreeState> {
        self.local_border_box_properties
            .map(|state| PropertyTreeState::new(state.transform, self.pre_clip, self.pre_effect))
    }

    /// The contents clip node, if properties are available.
    pub fn contents_clip(&self) -> Option<ClipNodeId> {
        self.contents_properties.map(|state| state.clip)
    }
}
