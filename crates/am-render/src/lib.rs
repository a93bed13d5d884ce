/// TUI rendering module for ascii-mation.
///
/// Provides grid blitting, layout, frame pacing and render statistics.
pub mod canvas;
pub mod fps;
pub mod ui;

pub use fps::{FrameLimiter, RenderStats, StatsMeter};
pub use ui::{RenderState, UiView};
