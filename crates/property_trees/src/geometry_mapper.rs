//! Projection of rects between property-tree spaces.

use crate::node::{ClipNodeId, PropertyTreeState, TransformNodeId};
use crate::trees::PropertyTrees;
use log::{debug, warn};
use smallvec::SmallVec;
use strata_geometry::{FloatClipRect, Transform2D};

/// Stateless queries over [`PropertyTrees`].
pub struct GeometryMapper;

impl GeometryMapper {
    /// Matrix mapping `node`'s space into the root space.
    fn to_root(trees: &PropertyTrees, node: TransformNodeId) -> Transform2D {
        let mut chain: SmallVec<Transform2D, 8> = SmallVec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(entry) = trees.transform(id) else {
                break;
            };
            chain.push(entry.matrix);
            current = entry.parent;
        }
        chain
            .iter()
            .rev()
            .fold(Transform2D::IDENTITY, |accumulated, matrix| accumulated.multiply(matrix))
    }

    /// Matrix mapping `source` space into `destination` space.
    ///
    /// A destination that cannot be inverted maps everything through the
    /// identity.
    pub fn source_to_destination_projection(
        trees: &PropertyTrees,
        source: TransformNodeId,
        destination: TransformNodeId,
    ) -> Transform2D {
        if source == destination {
            return Transform2D::IDENTITY;
        }
        let source_to_root = Self::to_root(trees, source);
        if destination == TransformNodeId::ROOT {
            return source_to_root;
        }
        Self::to_root(trees, destination).inverse().map_or_else(
            || {
                warn!("transform node {destination:?} is not invertible");
                Transform2D::IDENTITY
            },
            |root_to_destination| root_to_destination.multiply(&source_to_root),
        )
    }

    /// The clip accumulated between `local.clip` and `ancestor.clip`,
    /// expressed in `ancestor.transform` space.
    ///
    /// Returns the infinite rect when no clip applies, and also when
    /// `ancestor.clip` is not an ancestor of `local.clip`.
    pub fn local_to_ancestor_clip_rect(
        trees: &PropertyTrees,
        local: &PropertyTreeState,
        ancestor: &PropertyTreeState,
    ) -> FloatClipRect {
        if local.clip == ancestor.clip {
            return FloatClipRect::infinite();
        }
        if !trees.is_clip_ancestor_or_self(ancestor.clip, local.clip) {
            debug!(
                "clip {:?} is not below {:?}; reporting an unclipped rect",
                local.clip, ancestor.clip
            );
            return FloatClipRect::infinite();
        }

        let mut accumulated = FloatClipRect::infinite();
        let mut current: Option<ClipNodeId> = Some(local.clip);
        while let Some(id) = current {
            if id == ancestor.clip {
                break;
            }
            let Some(node) = trees.clip(id) else {
                break;
            };
            let projection = Self::source_to_destination_projection(
                trees,
                node.local_transform_space,
                ancestor.transform,
            );
            let mut mapped = FloatClipRect::new(projection.map_rect(&node.clip_rect));
            if !projection.preserves_axis_alignment() {
                mapped.clear_is_tight();
            }
            if node.has_radius {
                mapped.set_has_radius();
            }
            accumulated.intersect(&mapped);
            current = node.parent;
        }
        accumulated
    }

    /// Map `rect` from `local` space into `ancestor` space, clipped by
    /// every clip in between.
    ///
    /// Returns false when the result is empty.
    pub fn local_to_ancestor_visual_rect(
        trees: &PropertyTrees,
        local: &PropertyTreeState,
        ancestor: &PropertyTreeState,
        rect: &mut FloatClipRect,
    ) -> bool {
        let projection =
            Self::source_to_destination_projection(trees, local.transform, ancestor.transform);
        if !rect.is_infinite() {
            let mapped = projection.map_rect(rect.rect());
            rect.set_rect(mapped);
            if !projection.preserves_axis_alignment() {
                rect.clear_is_tight();
            }
        }
        rect.intersect(&Self::local_to_ancestor_clip_rect(trees, local, ancestor));
        rect.is_infinite() || !rect.rect().is_empty()
    }
}
