use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use am_core::frame::AsciiFrame;
use image::RgbaImage;
use rayon::prelude::*;

use crate::error::ExportError;

/// Fond des exports raster (#0a0a0f).
pub const BG_RGB: [u8; 3] = [0x0a, 0x0a, 0x0f];
/// Premier plan monochrome (#d4d4d8).
pub const FG_RGB: [u8; 3] = [0xd4, 0xd4, 0xd8];
/// Largeur approximative d'un caractère monospace, en fraction de la taille de police.
pub const CHAR_WIDTH_RATIO: f64 = 0.6;

/// Taille de police (px) qui fait tenir `cols × rows` dans `width × height`.
///
/// # Example
/// ```
/// use am_export::rasterizer::font_size_for;
/// assert_eq!(font_size_for(960, 296, 120, 37), 8);
/// assert_eq!(font_size_for(10, 10, 400, 400), 1);
/// ```
#[must_use]
pub fn font_size_for(width: u32, height: u32, cols: usize, rows: usize) -> u32 {
    if cols == 0 || rows == 0 {
        return 1;
    }
    let fit = (f64::from(width) / (cols as f64 * CHAR_WIDTH_RATIO)).min(f64::from(height) / rows as f64);
    (fit.floor() as u32).max(1)
}

/// Glyphes pré-rasterisés pour une taille de police donnée.
struct GlyphAtlas {
    font_size: u32,
    /// Avance horizontale mesurée sur 'M'.
    advance: f32,
    ascent: f32,
    scale: PxScale,
    cell_w: usize,
    cell_h: usize,
    /// Char → masque alpha `cell_w × cell_h`.
    glyphs: HashMap<char, Vec<u8>>,
    empty: Vec<u8>,
}

/// Convertit une `AsciiFrame` en pixels RGBA.
///
/// Le cache de glyphes est reconstruit uniquement quand la taille de police
/// change ; le rendu lui-même est parallélisé par ligne de pixels.
pub struct Rasterizer {
    font: FontVec,
    atlas: Option<GlyphAtlas>,
}

impl Rasterizer {
    /// Charge une police TrueType/OpenType depuis des octets.
    ///
    /// # Errors
    /// [`ExportError::FontUnavailable`] si les octets ne forment pas une police valide.
    pub fn new(font_data: Vec<u8>) -> Result<Self, ExportError> {
        let font = FontVec::try_from_vec(font_data).map_err(|e| {
            log::warn!("Police invalide : {e}");
            ExportError::FontUnavailable
        })?;
        Ok(Self { font, atlas: None })
    }

    /// Charge la police depuis un fichier.
    ///
    /// # Errors
    /// [`ExportError::Io`] si le fichier est illisible, sinon comme [`Rasterizer::new`].
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let data = std::fs::read(path)?;
        log::info!("Police chargée : {}", path.display());
        Self::new(data)
    }

    fn ensure_atlas(&mut self, font_size: u32) {
        if self.atlas.as_ref().is_some_and(|a| a.font_size == font_size) {
            return;
        }
        let size = font_size as f32;
        let scale = match self.font.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(size * self.font.height_unscaled() / upem),
            _ => PxScale::from(size),
        };
        let scaled = self.font.as_scaled(scale);
        let advance = scaled.h_advance(self.font.glyph_id('M')).max(1.0);
        let cell_w = advance.ceil() as usize;
        let cell_h = font_size as usize;
        self.atlas = Some(GlyphAtlas {
            font_size,
            advance,
            ascent: scaled.ascent(),
            scale,
            cell_w,
            cell_h,
            glyphs: HashMap::new(),
            empty: vec![0; cell_w * cell_h],
        });
    }

    fn cache_chars(&mut self, frame: &AsciiFrame, font_size: u32) {
        self.ensure_atlas(font_size);
        let Some(atlas) = self.atlas.as_mut() else {
            return;
        };
        for ch in frame.lines().iter().flat_map(|l| l.chars()) {
            if !atlas.glyphs.contains_key(&ch) {
                let mask = rasterize_glyph(&self.font, atlas, ch);
                atlas.glyphs.insert(ch, mask);
            }
        }
    }

    /// Rend `frame` dans `img` (fond, grille centrée, couleur par cellule si
    /// `color_enabled`).
    pub fn render_into(&mut self, frame: &AsciiFrame, color_enabled: bool, img: &mut RgbaImage) {
        let (width, height) = img.dimensions();
        let stride = width as usize * 4;
        if stride == 0 {
            return;
        }
        if frame.cols() == 0 || frame.rows() == 0 {
            for px in img.pixels_mut() {
                *px = image::Rgba([BG_RGB[0], BG_RGB[1], BG_RGB[2], 255]);
            }
            return;
        }

        let font_size = font_size_for(width, height, frame.cols(), frame.rows());
        self.cache_chars(frame, font_size);
        let Some(atlas) = self.atlas.as_ref() else {
            return;
        };

        let grid_w = frame.cols() as f32 * atlas.advance;
        let grid_h = (frame.rows() * atlas.cell_h) as i64;
        let ox = ((width as f32 - grid_w) / 2.0).floor() as i64;
        let oy = (i64::from(height) - grid_h).div_euclid(2);
        let lines = frame.lines();

        img.par_chunks_exact_mut(stride).enumerate().for_each(|(y, row)| {
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&[BG_RGB[0], BG_RGB[1], BG_RGB[2], 255]);
            }
            let rel = y as i64 - oy;
            if rel < 0 || rel >= grid_h {
                return;
            }
            let gy = rel as usize / atlas.cell_h;
            let cy = rel as usize % atlas.cell_h;
            let Some(line) = lines.get(gy) else {
                return;
            };

            for (gx, ch) in line.chars().enumerate() {
                let mask = atlas.glyphs.get(&ch).unwrap_or(&atlas.empty);
                let mask_row = &mask[cy * atlas.cell_w..(cy + 1) * atlas.cell_w];
                if mask_row.iter().all(|&a| a == 0) {
                    continue;
                }
                let fg = if color_enabled {
                    frame.rgb_at(gx, gy)
                } else {
                    FG_RGB
                };
                let x0 = ox + (gx as f32 * atlas.advance).floor() as i64;
                for (cx, &alpha) in mask_row.iter().enumerate() {
                    let px = x0 + cx as i64;
                    if alpha == 0 || px < 0 || px >= i64::from(width) {
                        continue;
                    }
                    let idx = px as usize * 4;
                    let a = f32::from(alpha) / 255.0;
                    for (slot, &f) in row[idx..idx + 3].iter_mut().zip(&fg) {
                        *slot = (f32::from(f) * a + f32::from(*slot) * (1.0 - a)).round() as u8;
                    }
                }
            }
        });
    }

    /// Rend `frame` dans une nouvelle image `width × height`.
    #[must_use]
    pub fn render(&mut self, frame: &AsciiFrame, color_enabled: bool, width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::new(width, height);
        self.render_into(frame, color_enabled, &mut img);
        img
    }
}

/// Masque alpha d'un caractère, aligné en haut de cellule (ligne d'ascension à y = 0).
fn rasterize_glyph(font: &FontVec, atlas: &GlyphAtlas, ch: char) -> Vec<u8> {
    let mut mask = vec![0u8; atlas.cell_w * atlas.cell_h];
    let gid = font.glyph_id(ch);
    // .notdef : on préfère une cellule vide à une boîte "tofu".
    if gid.0 == 0 {
        return mask;
    }
    let glyph = gid.with_scale_and_position(atlas.scale, point(0.0, atlas.ascent));
    if let Some(outline) = font.outline_glyph(glyph) {
        let bounds = outline.px_bounds();
        outline.draw(|x, y, v| {
            let px = x as i64 + bounds.min.x as i64;
            let py = y as i64 + bounds.min.y as i64;
            if px < 0 || py < 0 {
                return;
            }
            let (px, py) = (px as usize, py as usize);
            if px < atlas.cell_w && py < atlas.cell_h {
                let idx = py * atlas.cell_w + px;
                mask[idx] = mask[idx].max((v * 255.0).round() as u8);
            }
        });
    }
    mask
}
