use anyhow::Result;
use strata_layout_tree::{ComputedStyle, Document, LayoutObjectId};

/// A layout object whose computed style was set during style recalc.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleChange {
    pub object: LayoutObjectId,
    /// `None` for objects created by this recalc.
    pub old_style: Option<ComputedStyle>,
}

/// The style and layout engine a [`crate::FrameView`] drives.
///
/// The frame view owns the lifecycle; the engine only does the work of
/// each phase against the document it is handed.
pub trait LayoutEngine {
    /// Recompute styles, writing them with
    /// [`strata_layout_tree::LayoutTree::set_style`], and report what
    /// changed, parents before children.
    ///
    /// # Errors
    ///
    /// Returns an error if styles could not be computed. The lifecycle
    /// still advances past style recalc.
    fn recalc_style(&mut self, document: &mut Document) -> Result<Vec<StyleChange>>;

    /// Write geometry and overflow for every object that needs layout.
    ///
    /// # Errors
    ///
    /// Returns an error if layout failed. The lifecycle still advances past
    /// layout.
    fn perform_layout(&mut self, document: &mut Document) -> Result<()>;
}
