/// Image-to-character pipeline for ascii-mation.
///
/// Sampler → tone → blur → edges → dither/mapping, with palette reduction
/// on the colour grid. Every stage is a plain function over a `cols × rows`
/// grid; [`compositor`] chains them.
pub mod blur;
pub mod compositor;
pub mod dither;
pub mod edge;
pub mod palette;
pub mod sampler;
pub mod tone;

pub use compositor::{Compositor, process_cells};
pub use sampler::compute_rows;
