//! Tramage et mapping luminance → caractère.
//!
//! Toutes les diffusions travaillent sur une copie privée de la grille, en
//! ordre raster (gauche → droite, haut → bas), et bornent chaque valeur
//! diffusée à [0, 255] avant qu'elle ne soit relue.

use am_core::charset::Gradient;
use am_core::config::DitherMode;

/// Matrice de Bayer 4x4. Normalisée sur 16 niveaux (0-15).
pub const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Convertit la luminance finale en une ligne de texte par rangée.
///
/// La grille d'entrée n'est jamais modifiée.
///
/// # Example
/// ```
/// use am_ascii::dither::dither_and_map;
/// use am_core::charset::Gradient;
/// use am_core::config::DitherMode;
/// let lines = dither_and_map(&[255.0, 255.0, 0.0, 0.0], 2, 2, DitherMode::None, &Gradient::new("@ "));
/// assert_eq!(lines, vec!["  ".to_string(), "@@".to_string()]);
/// ```
#[must_use]
pub fn dither_and_map(
    luma: &[f32],
    cols: usize,
    rows: usize,
    mode: DitherMode,
    gradient: &Gradient,
) -> Vec<String> {
    debug_assert_eq!(luma.len(), cols * rows);
    // Un seul niveau : aucune erreur à diffuser, tout prend ce caractère.
    if gradient.levels() < 2 {
        let line: String = std::iter::repeat_n(gradient.char_at(0), cols).collect();
        return vec![line; rows];
    }

    let mut grid = luma.to_vec();
    let levels = gradient.levels();
    let indices = match mode {
        DitherMode::None => direct(&grid, gradient),
        DitherMode::FloydSteinberg => floyd_steinberg(&mut grid, cols, rows, gradient),
        DitherMode::Atkinson => atkinson(&mut grid, cols, rows, gradient),
        DitherMode::Bayer => bayer(&grid, cols, levels),
    };
    to_lines(&indices, cols, gradient)
}

fn to_lines(indices: &[usize], cols: usize, gradient: &Gradient) -> Vec<String> {
    indices
        .chunks(cols.max(1))
        .map(|row| row.iter().map(|&l| gradient.char_at(l)).collect())
        .collect()
}

fn direct(grid: &[f32], gradient: &Gradient) -> Vec<usize> {
    grid.iter().map(|&v| gradient.level_for(v)).collect()
}

/// Valeur de luminance reconstruite d'un niveau.
#[inline(always)]
fn quantized(level: usize, levels: usize) -> f32 {
    level as f32 / (levels - 1) as f32 * 255.0
}

#[inline(always)]
fn spread(grid: &mut [f32], i: usize, amount: f32) {
    grid[i] = (grid[i] + amount).clamp(0.0, 255.0);
}

fn floyd_steinberg(grid: &mut [f32], cols: usize, rows: usize, gradient: &Gradient) -> Vec<usize> {
    let levels = gradient.levels();
    let mut out = Vec::with_capacity(grid.len());
    for y in 0..rows {
        for x in 0..cols {
            let i = y * cols + x;
            let level = gradient.level_for(grid[i]);
            out.push(level);
            let err = grid[i] - quantized(level, levels);

            if x + 1 < cols {
                spread(grid, i + 1, err * (7.0 / 16.0));
            }
            if y + 1 < rows {
                if x > 0 {
                    spread(grid, i + cols - 1, err * (3.0 / 16.0));
                }
                spread(grid, i + cols, err * (5.0 / 16.0));
                if x + 1 < cols {
                    spread(grid, i + cols + 1, err * (1.0 / 16.0));
                }
            }
        }
    }
    out
}

/// Atkinson : 1/8 de l'erreur à six voisins, les 2/8 restants sont perdus.
fn atkinson(grid: &mut [f32], cols: usize, rows: usize, gradient: &Gradient) -> Vec<usize> {
    let levels = gradient.levels();
    let mut out = Vec::with_capacity(grid.len());
    for y in 0..rows {
        for x in 0..cols {
            let i = y * cols + x;
            let level = gradient.level_for(grid[i]);
            out.push(level);
            let share = (grid[i] - quantized(level, levels)) / 8.0;

            if x + 1 < cols {
                spread(grid, i + 1, share);
            }
            if x + 2 < cols {
                spread(grid, i + 2, share);
            }
            if y + 1 < rows {
                if x > 0 {
                    spread(grid, i + cols - 1, share);
                }
                spread(grid, i + cols, share);
                if x + 1 < cols {
                    spread(grid, i + cols + 1, share);
                }
            }
            if y + 2 < rows {
                spread(grid, i + 2 * cols, share);
            }
        }
    }
    out
}

fn bayer(grid: &[f32], cols: usize, levels: usize) -> Vec<usize> {
    grid.iter()
        .enumerate()
        .map(|(i, &l)| {
            let (x, y) = (i % cols, i / cols);
            let threshold = (f32::from(BAYER_4X4[y % 4][x % 4]) + 0.5) / 16.0;
            let v = (l / 255.0 + threshold - 0.5).clamp(0.0, 1.0);
            ((v * levels as f32).floor() as usize).min(levels - 1)
        })
        .collect()
}
