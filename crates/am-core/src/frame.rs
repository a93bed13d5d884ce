/// Surface de pixels RGBA réutilisable (source décodée ou buffer de rendu).
///
/// Stocke les pixels en RGBA row-major, 4 bytes par pixel.
///
/// # Example
/// ```
/// use am_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer noir transparent aux dimensions données.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Construit une surface à partir de pixels RGB opaques.
    ///
    /// # Example
    /// ```
    /// use am_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::from_rgb(1, 2, &[[255, 255, 255], [0, 0, 0]]);
    /// assert_eq!(fb.pixel(0, 1), (0, 0, 0, 255));
    /// ```
    #[must_use]
    pub fn from_rgb(width: u32, height: u32, pixels: &[[u8; 3]]) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        let mut data = Vec::with_capacity(pixels.len() * 4);
        for &[r, g, b] in pixels {
            data.extend_from_slice(&[r, g, b, 255]);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Remplit toute la surface avec une couleur opaque.
    pub fn fill(&mut self, rgb: (u8, u8, u8)) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
    }

    /// `true` si la surface n'a aucun pixel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if idx + 3 >= self.data.len() {
            return (0, 0, 0, 0);
        }
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }
}

/// Grille de luminance `cols × rows`, valeurs flottantes dans [0, 255].
///
/// Mutable pendant les étapes tonalité → flou → contours, puis lue par le
/// mapping de caractères.
#[derive(Clone, Debug, PartialEq)]
pub struct LumaGrid {
    /// Valeurs row-major, longueur `cols * rows`.
    pub values: Vec<f32>,
    /// Largeur en cellules.
    pub cols: usize,
    /// Hauteur en cellules.
    pub rows: usize,
}

impl LumaGrid {
    /// Grille remplie de zéros.
    #[must_use]
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            values: vec![0.0; cols * rows],
            cols,
            rows,
        }
    }
}

/// Couleurs par cellule, RGB packé (`cols * rows * 3` bytes).
///
/// Cellule `i` ↔ bytes `[3i, 3i + 3)`, même indexation que [`LumaGrid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorGrid {
    /// Bytes R, G, B par cellule, row-major.
    pub data: Vec<u8>,
    /// Largeur en cellules.
    pub cols: usize,
    /// Hauteur en cellules.
    pub rows: usize,
}

impl ColorGrid {
    /// Grille noire.
    #[must_use]
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            data: vec![0; cols * rows * 3],
            cols,
            rows,
        }
    }

    /// Nombre de cellules.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.data.len() / 3
    }

    /// Couleur de la cellule `i`.
    ///
    /// # Example
    /// ```
    /// use am_core::frame::ColorGrid;
    /// let mut c = ColorGrid::new(2, 1);
    /// c.set_rgb(1, [10, 20, 30]);
    /// assert_eq!(c.rgb(1), [10, 20, 30]);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn rgb(&self, i: usize) -> [u8; 3] {
        [self.data[i * 3], self.data[i * 3 + 1], self.data[i * 3 + 2]]
    }

    /// Écrit la couleur de la cellule `i`.
    #[inline(always)]
    pub fn set_rgb(&mut self, i: usize, rgb: [u8; 3]) {
        self.data[i * 3..i * 3 + 3].copy_from_slice(&rgb);
    }
}

/// Frame ASCII produite par le pipeline. Immuable une fois construite.
///
/// Possédée par son consommateur : le rendu live la jette après affichage,
/// le collecteur d'export la conserve.
///
/// # Example
/// ```
/// use am_core::frame::{AsciiFrame, ColorGrid};
/// let frame = AsciiFrame::new(vec!["@ ".into()], ColorGrid::new(2, 1));
/// assert_eq!(frame.cols(), 2);
/// assert_eq!(frame.rows(), 1);
/// assert_eq!(frame.text(), "@ ");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsciiFrame {
    lines: Vec<String>,
    colors: ColorGrid,
}

impl AsciiFrame {
    /// Assemble une frame. `lines.len()` doit valoir `colors.rows` et chaque
    /// ligne compter `colors.cols` caractères.
    #[must_use]
    pub fn new(lines: Vec<String>, colors: ColorGrid) -> Self {
        debug_assert_eq!(lines.len(), colors.rows);
        debug_assert!(lines.iter().all(|l| l.chars().count() == colors.cols));
        Self { lines, colors }
    }

    /// Une chaîne par ligne de la grille.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Couleurs par cellule.
    #[must_use]
    pub fn colors(&self) -> &ColorGrid {
        &self.colors
    }

    /// Largeur en caractères.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.colors.cols
    }

    /// Hauteur en caractères.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.colors.rows
    }

    /// Couleur de la cellule (x, y).
    #[must_use]
    pub fn rgb_at(&self, x: usize, y: usize) -> [u8; 3] {
        self.colors.rgb(y * self.colors.cols + x)
    }

    /// Bloc de texte complet, lignes jointes par `\n`.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_buffer_from_rgb_is_opaque() {
        let fb = FrameBuffer::from_rgb(2, 1, &[[1, 2, 3], [4, 5, 6]]);
        assert_eq!(fb.data, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(!fb.is_empty());
    }

    #[test]
    fn ascii_frame_color_lookup_uses_row_major_index() {
        let mut colors = ColorGrid::new(2, 2);
        colors.set_rgb(3, [9, 8, 7]);
        let frame = AsciiFrame::new(vec!["ab".into(), "cd".into()], colors);
        assert_eq!(frame.rgb_at(1, 1), [9, 8, 7]);
        assert_eq!(frame.text(), "ab\ncd");
    }
}
