use strata_geometry::{RectF, Transform2D};

/// Index of a transform node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformNodeId(pub(crate) usize);

/// Index of a clip node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipNodeId(pub(crate) usize);

/// Index of an effect node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectNodeId(pub(crate) usize);

impl TransformNodeId {
    pub const ROOT: Self = Self(0);
}

impl ClipNodeId {
    pub const ROOT: Self = Self(0);
}

impl EffectNodeId {
    pub const ROOT: Self = Self(0);
}

/// What produced a transform node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Root,
    /// Offset of a box relative to its ancestor transform space.
    PaintOffsetTranslation,
    /// CSS `transform`.
    CssTransform,
    /// Scroll offset of a scroll container, applied to its contents.
    ScrollTranslation,
    /// Pinch-zoom scale of the visual viewport.
    PageScale,
    /// Scroll offset of the visual viewport.
    VisualViewportScroll,
}

/// What produced a clip node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipKind {
    Root,
    /// CSS `clip` on an absolutely positioned box.
    CssClip,
    /// Overflow clip of a box that clips its contents.
    OverflowClip,
    /// Clip to one column of a multi-column container.
    FragmentClip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    pub parent: Option<TransformNodeId>,
    /// Maps this node's space into the parent's space.
    pub matrix: Transform2D,
    pub kind: TransformKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipNode {
    pub parent: Option<ClipNodeId>,
    /// Space `clip_rect` is expressed in.
    pub local_transform_space: TransformNodeId,
    pub clip_rect: RectF,
    pub has_radius: bool,
    pub kind: ClipKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectNode {
    pub parent: Option<EffectNodeId>,
    pub local_transform_space: TransformNodeId,
    pub output_clip: ClipNodeId,
    pub opacity: f32,
}

/// The trio of property nodes content is painted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyTreeState {
    pub transform: TransformNodeId,
    pub clip: ClipNodeId,
    pub effect: EffectNodeId,
}

impl PropertyTreeState {
    /// State of content painted directly into the root.
    pub const ROOT: Self = Self {
        transform: TransformNodeId::ROOT,
        clip: ClipNodeId::ROOT,
        effect: EffectNodeId::ROOT,
    };

    pub const fn new(transform: TransformNodeId, clip: ClipNodeId, effect: EffectNodeId) -> Self {
        Self {
            transform,
            clip,
            effect,
        }
    }
}

impl Default for PropertyTreeState {
    fn default() -> Self {
        Self::ROOT
    }
}
