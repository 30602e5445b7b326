use crate::node::{
    ClipKind, ClipNode, ClipNodeId, EffectNode, EffectNodeId, TransformKind, TransformNode,
    TransformNodeId,
};
use log::trace;
use strata_geometry::{RectF, Transform2D};

/// The three property trees of a frame.
///
/// `generation` increases on every structural or value change so cached
/// geometry derived from the trees can be validated cheaply.
#[derive(Debug, Clone)]
pub struct PropertyTrees {
    transforms: Vec<TransformNode>,
    clips: Vec<ClipNode>,
    effects: Vec<EffectNode>,
    generation: u64,
}

impl Default for PropertyTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTrees {
    /// Trees holding only their roots.
    pub fn new() -> Self {
        Self {
            transforms: vec![TransformNode {
                parent: None,
                matrix: Transform2D::IDENTITY,
                kind: TransformKind::Root,
            }],
            clips: vec![ClipNode {
                parent: None,
                local_transform_space: TransformNodeId::ROOT,
                clip_rect: RectF::infinite(),
                has_radius: false,
                kind: ClipKind::Root,
            }],
            effects: vec![EffectNode {
                parent: None,
                local_transform_space: TransformNodeId::ROOT,
                output_clip: ClipNodeId::ROOT,
                opacity: 1.0,
            }],
            generation: 0,
        }
    }

    /// Drop every non-root node.
    pub fn clear(&mut self) {
        self.transforms.truncate(1);
        self.clips.truncate(1);
        self.effects.truncate(1);
        self.bump_generation();
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn add_transform(
        &mut self,
        parent: TransformNodeId,
        matrix: Transform2D,
        kind: TransformKind,
    ) -> TransformNodeId {
        let id = TransformNodeId(self.transforms.len());
        self.transforms.push(TransformNode {
            parent: Some(parent),
            matrix,
            kind,
        });
        self.bump_generation();
        trace!("transform node {id:?} ({kind:?}) under {parent:?}");
        id
    }

    pub fn add_clip(
        &mut self,
        parent: ClipNodeId,
        local_transform_space: TransformNodeId,
        clip_rect: RectF,
        has_radius: bool,
        kind: ClipKind,
    ) -> ClipNodeId {
        let id = ClipNodeId(self.clips.len());
        self.clips.push(ClipNode {
            parent: Some(parent),
            local_transform_space,
            clip_rect,
            has_radius,
            kind,
        });
        self.bump_generation();
        trace!("clip node {id:?} ({kind:?}) under {parent:?}");
        id
    }

    pub fn add_effect(
        &mut self,
        parent: EffectNodeId,
        local_transform_space: TransformNodeId,
        output_clip: ClipNodeId,
        opacity: f32,
    ) -> EffectNodeId {
        let id = EffectNodeId(self.effects.len());
        self.effects.push(EffectNode {
            parent: Some(parent),
            local_transform_space,
            output_clip,
            opacity,
        });
        self.bump_generation();
        id
    }

    pub fn transform(&self, id: TransformNodeId) -> Option<&TransformNode> {
        self.transforms.get(id.0)
    }

    pub fn clip(&self, id: ClipNodeId) -> Option<&ClipNode> {
        self.clips.get(id.0)
    }

    pub fn effect(&self, id: EffectNodeId) -> Option<&EffectNode> {
        self.effects.get(id.0)
    }

    /// Replace a transform matrix. Returns whether anything changed.
    pub fn update_transform(&mut self, id: TransformNodeId, matrix: Transform2D) -> bool {
        let Some(node) = self.transforms.get_mut(id.0) else {
            return false;
        };
        if node.matrix == matrix {
            return false;
        }
        node.matrix = matrix;
        self.bump_generation();
        true
    }

    /// Replace a clip rect. Returns whether anything changed.
    pub fn update_clip(&mut self, id: ClipNodeId, clip_rect: RectF, has_radius: bool) -> bool {
        let Some(node) = self.clips.get_mut(id.0) else {
            return false;
        };
        if node.clip_rect == clip_rect && node.has_radius == has_radius {
            return false;
        }
        node.clip_rect = clip_rect;
        node.has_radius = has_radius;
        self.bump_generation();
        true
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_transform_ancestor_or_self(&self, ancestor: TransformNodeId, node: TransformNodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.transform(id).and_then(|entry| entry.parent);
        }
        false
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_clip_ancestor_or_self(&self, ancestor: ClipNodeId, node: ClipNodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.clip(id).and_then(|entry| entry.parent);
        }
        false
    }

    /// Product of opacities from `node` up to, but excluding, `ancestor`.
    pub fn accumulated_opacity(&self, node: EffectNodeId, ancestor: EffectNodeId) -> f32 {
        let mut opacity = 1.0;
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                break;
            }
            let Some(entry) = self.effect(id) else {
                break;
            };
            opacity *= entry.opacity;
            current = entry.parent;
        }
        opacity
    }
}
