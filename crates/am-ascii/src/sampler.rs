use am_core::error::CoreError;
use am_core::frame::{ColorGrid, FrameBuffer, LumaGrid};
use anyhow::{Context, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

/// Rapport largeur/hauteur d'une cellule monospace (les glyphes sont plus
/// hauts que larges).
pub const FONT_ASPECT: f64 = 0.55;

/// Nombre de lignes dérivé des dimensions source et du nombre de colonnes.
///
/// `max(1, round(h / w * cols * FONT_ASPECT))`.
///
/// # Example
/// ```
/// use am_ascii::sampler::compute_rows;
/// assert_eq!(compute_rows(1920, 1080, 120), 37);
/// assert_eq!(compute_rows(1000, 1, 10), 1);
/// ```
#[must_use]
pub fn compute_rows(source_width: u32, source_height: u32, cols: u32) -> u32 {
    let ratio = f64::from(source_height) / f64::from(source_width.max(1));
    let rows = (ratio * f64::from(cols) * FONT_ASPECT).round();
    (rows as u32).max(1)
}

/// Extrait luminance (BT.601) et couleur d'une surface déjà réduite,
/// un pixel par cellule.
///
/// # Example
/// ```
/// use am_ascii::sampler::extract_cells;
/// use am_core::frame::FrameBuffer;
/// let fb = FrameBuffer::from_rgb(2, 1, &[[255, 255, 255], [0, 0, 0]]);
/// let (luma, colors) = extract_cells(&fb);
/// assert!((luma.values[0] - 255.0).abs() < 1e-3);
/// assert_eq!(colors.rgb(1), [0, 0, 0]);
/// ```
#[must_use]
pub fn extract_cells(cells: &FrameBuffer) -> (LumaGrid, ColorGrid) {
    let cols = cells.width as usize;
    let rows = cells.height as usize;
    let mut luma = LumaGrid::new(cols, rows);
    let mut colors = ColorGrid::new(cols, rows);

    for (i, (px, rgb)) in cells
        .data
        .chunks_exact(4)
        .zip(colors.data.chunks_exact_mut(3))
        .enumerate()
    {
        let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
        luma.values[i] = 0.299 * r + 0.587 * g + 0.114 * b;
        rgb.copy_from_slice(&px[..3]);
    }

    (luma, colors)
}

/// Réduction d'une surface source vers la grille `cols × rows`.
///
/// Garde le resizer et la surface de travail entre deux appels : le live
/// et la collecte d'export la partagent (jamais en même temps).
///
/// # Example
/// ```
/// use am_ascii::sampler::Sampler;
/// use am_core::frame::FrameBuffer;
/// let mut s = Sampler::new();
/// let src = FrameBuffer::new(64, 32);
/// let cells = s.downsample(&src, 16, 4).unwrap();
/// assert_eq!((cells.width, cells.height), (16, 4));
/// ```
pub struct Sampler {
    inner: Resizer,
    options: ResizeOptions,
    /// Copie de la source (fast_image_resize exige `&mut` sur la source).
    src_buf: Vec<u8>,
    /// Surface de travail, contenu indéfini entre deux appels.
    scratch: FrameBuffer,
}

impl Sampler {
    /// Create a new sampler with bilinear interpolation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Resizer::new(),
            options: ResizeOptions::new()
                .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            src_buf: Vec::new(),
            scratch: FrameBuffer::new(0, 0),
        }
    }

    /// Réduit `src` en `cols × rows` pixels dans la surface de travail.
    ///
    /// # Errors
    /// [`CoreError::InvalidDimensions`] pour une source ou une grille vide,
    /// ou une erreur de redimensionnement.
    pub fn downsample(&mut self, src: &FrameBuffer, cols: u32, rows: u32) -> Result<&FrameBuffer> {
        if src.is_empty() {
            return Err(CoreError::InvalidDimensions {
                width: src.width,
                height: src.height,
            }
            .into());
        }
        if cols == 0 || rows == 0 {
            return Err(CoreError::InvalidDimensions {
                width: cols,
                height: rows,
            }
            .into());
        }

        if self.scratch.width != cols || self.scratch.height != rows {
            self.scratch = FrameBuffer::new(cols, rows);
        }

        if src.width == cols && src.height == rows {
            self.scratch.data.copy_from_slice(&src.data);
            return Ok(&self.scratch);
        }

        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image =
            Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8x4)
                .context("Invalid source dimensions")?;
        let mut dst_image =
            Image::from_slice_u8(cols, rows, &mut self.scratch.data, PixelType::U8x4)
                .context("Invalid destination dimensions")?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .context("Resize failed")?;

        Ok(&self.scratch)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_for_full_hd() {
        assert_eq!(compute_rows(1920, 1080, 120), 37);
        assert_eq!(compute_rows(2, 2, 2), 1);
        assert_eq!(compute_rows(100, 100, 1), 1);
    }

    #[test]
    fn bt601_weights() {
        let fb = FrameBuffer::from_rgb(3, 1, &[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);
        let (luma, _) = extract_cells(&fb);
        assert!((luma.values[0] - 76.245).abs() < 1e-3);
        assert!((luma.values[1] - 149.685).abs() < 1e-3);
        assert!((luma.values[2] - 29.07).abs() < 1e-3);
    }

    #[test]
    fn uniform_source_stays_uniform() {
        let mut src = FrameBuffer::new(40, 20);
        src.fill((200, 100, 50));
        let mut s = Sampler::new();
        let cells = s.downsample(&src, 8, 3).unwrap();
        for px in cells.data.chunks_exact(4) {
            for (got, want) in px[..3].iter().zip([200u8, 100, 50]) {
                assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
            }
        }
    }

    #[test]
    fn same_size_is_a_copy() {
        let src = FrameBuffer::from_rgb(2, 1, &[[1, 2, 3], [4, 5, 6]]);
        let mut s = Sampler::new();
        assert_eq!(s.downsample(&src, 2, 1).unwrap().data, src.data);
    }

    #[test]
    fn zero_sized_input_is_rejected() {
        let mut s = Sampler::new();
        assert!(s.downsample(&FrameBuffer::new(0, 10), 4, 4).is_err());
        assert!(s.downsample(&FrameBuffer::new(4, 4), 0, 4).is_err());
    }
}
