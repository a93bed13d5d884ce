/// Types, configuration and shared structures for ascii-mation.
///
/// This crate holds everything the pipeline, the sources, the renderer and
/// the exporters agree on: pixel and cell grids, charsets, settings, presets.

pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod presets;
pub mod settings;
pub mod traits;

pub use charset::{CharsetId, Gradient};
pub use config::{DitherMode, EdgeMode, EditorSettings, PipelineConfig};
pub use error::CoreError;
pub use frame::{AsciiFrame, ColorGrid, FrameBuffer, LumaGrid};
pub use traits::FrameSource;
