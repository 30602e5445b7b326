//! One frame of the rendering pipeline.
//!
//! [`FrameView`] ties the lifecycle, scrolling, scroll anchoring and paint
//! layer crates together. It advances the document through style, layout,
//! compositing inputs, pre-paint and paint, and hands style and layout to
//! a [`LayoutEngine`] supplied by the embedder.

mod config;
mod engine;
mod frame_view;
mod history;
mod presentation;

pub use config::PipelineConfig;
pub use engine::{LayoutEngine, StyleChange};
pub use frame_view::{FrameView, PaintChunk};
pub use history::HistoryItem;
pub use presentation::{PresentationCallback, PresentationCallbacks};
