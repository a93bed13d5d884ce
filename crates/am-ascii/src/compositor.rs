use am_core::config::{EdgeMode, PipelineConfig};
use am_core::frame::{AsciiFrame, FrameBuffer};
use anyhow::Result;

use crate::sampler::{Sampler, compute_rows, extract_cells};
use crate::{blur, dither, edge, palette, tone};

/// Pipeline pur : surface déjà réduite (un pixel par cellule) → frame ASCII.
///
/// Ordre fixe : extraction → tonalité → flou (si > 0) → contours (si actifs)
/// → tramage + mapping → palette (si couleur et palette).
///
/// # Example
/// ```
/// use am_ascii::compositor::process_cells;
/// use am_core::charset::Gradient;
/// use am_core::config::PipelineConfig;
/// use am_core::frame::FrameBuffer;
///
/// let cells = FrameBuffer::from_rgb(2, 2, &[[255; 3], [255; 3], [0; 3], [0; 3]]);
/// let config = PipelineConfig { cols: 2, charset: Gradient::new("@ "), ..Default::default() };
/// let frame = process_cells(&cells, &config);
/// assert_eq!(frame.lines(), ["  ", "@@"]);
/// ```
#[must_use]
pub fn process_cells(cells: &FrameBuffer, config: &PipelineConfig) -> AsciiFrame {
    let cols = cells.width as usize;
    let rows = cells.height as usize;
    let (mut luma, mut colors) = extract_cells(cells);

    tone::apply_adjustments(
        &mut luma.values,
        config.brightness,
        config.contrast,
        config.gamma,
        config.invert,
    );

    if config.blur > 0.0 {
        blur::box_blur(&mut luma.values, cols, rows, config.blur);
    }

    if config.edge_mode != EdgeMode::Off {
        let edges = edge::detect_edges(
            &luma.values,
            cols,
            rows,
            config.edge_mode,
            config.edge_strength,
            config.edge_threshold,
        );
        edge::blend_edges(&mut luma.values, &edges, config.edge_blend);
    }

    let lines = dither::dither_and_map(&luma.values, cols, rows, config.dither, &config.charset);

    if config.color_enabled && config.palette_mode {
        palette::quantize_colors(&mut colors, config.palette_size);
    }

    AsciiFrame::new(lines, colors)
}

/// Orchestrateur : réduit la source à la grille puis exécute le pipeline.
///
/// Seul état conservé : le sampler et sa surface de travail. Aucune donnée
/// ne passe d'une frame à l'autre.
///
/// # Example
/// ```
/// use am_ascii::compositor::Compositor;
/// use am_core::config::PipelineConfig;
/// use am_core::frame::FrameBuffer;
///
/// let mut compositor = Compositor::new();
/// let src = FrameBuffer::new(160, 90);
/// let frame = compositor.process(&src, &PipelineConfig::default()).unwrap();
/// assert_eq!(frame.cols(), 120);
/// assert_eq!(frame.rows(), 37);
/// ```
pub struct Compositor {
    sampler: Sampler,
}

impl Compositor {
    /// Create a new compositor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sampler: Sampler::new(),
        }
    }

    /// Traite une surface source aux dimensions natives de `src`.
    ///
    /// # Errors
    /// Configuration invalide (cols = 0, gamma ≤ 0), source vide, ou échec du
    /// redimensionnement.
    pub fn process(&mut self, src: &FrameBuffer, config: &PipelineConfig) -> Result<AsciiFrame> {
        config.validate()?;
        let rows = compute_rows(src.width, src.height, config.cols);
        let cells = self.sampler.downsample(src, config.cols, rows)?;
        Ok(process_cells(cells, config))
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}
