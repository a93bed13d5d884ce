use am_core::config::EdgeMode;

/// Rapport seuil bas / seuil haut du double seuillage Canny.
pub const CANNY_LOW_RATIO: f32 = 0.4;

/// Noyau gaussien 3×3 (somme 16) du pré-lissage Canny.
const GAUSS_3X3: [f32; 9] = [1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0];

/// Grille de magnitudes de contour, mêmes dimensions que la luminance.
///
/// `strength` dans [0, 100] (échelle), `threshold` dans [0, 255] : toute
/// magnitude mise à l'échelle sous le seuil vaut exactement 0. La bordure
/// d'une cellule reste à 0.
///
/// # Example
/// ```
/// use am_ascii::edge::detect_edges;
/// use am_core::config::EdgeMode;
/// let luma = vec![0.0, 0.0, 255.0, 0.0, 0.0, 255.0, 0.0, 0.0, 255.0];
/// let edges = detect_edges(&luma, 3, 3, EdgeMode::Sobel, 100.0, 10.0);
/// assert_eq!(edges[4], 255.0);
/// assert_eq!(edges[0], 0.0);
/// ```
#[must_use]
pub fn detect_edges(
    luma: &[f32],
    cols: usize,
    rows: usize,
    mode: EdgeMode,
    strength: f32,
    threshold: f32,
) -> Vec<f32> {
    debug_assert_eq!(luma.len(), cols * rows);
    let s = strength / 100.0;
    match mode {
        EdgeMode::Off => vec![0.0; luma.len()],
        EdgeMode::Sobel => sobel(luma, cols, rows, s, threshold),
        EdgeMode::Laplacian => laplacian(luma, cols, rows, s, threshold),
        EdgeMode::Canny => canny(luma, cols, rows, s, threshold),
    }
}

/// Mélange les contours dans la luminance : `l·(1 − t) + e·t`, `t = blend/100`.
///
/// # Example
/// ```
/// use am_ascii::edge::blend_edges;
/// let mut luma = vec![100.0, 200.0];
/// blend_edges(&mut luma, &[0.0, 0.0], 50.0);
/// assert_eq!(luma, vec![50.0, 100.0]);
/// ```
pub fn blend_edges(luma: &mut [f32], edges: &[f32], blend: f32) {
    let t = blend / 100.0;
    for (l, &e) in luma.iter_mut().zip(edges) {
        *l = *l * (1.0 - t) + e * t;
    }
}

#[inline(always)]
fn keep(mag: f32, threshold: f32) -> f32 {
    if mag < threshold {
        0.0
    } else {
        mag.clamp(0.0, 255.0)
    }
}

/// Gradients Sobel (gx, gy) à l'index `i` (cellule intérieure).
#[inline(always)]
fn sobel_at(luma: &[f32], cols: usize, i: usize) -> (f32, f32) {
    let tl = luma[i - cols - 1];
    let tc = luma[i - cols];
    let tr = luma[i - cols + 1];
    let ml = luma[i - 1];
    let mr = luma[i + 1];
    let bl = luma[i + cols - 1];
    let bc = luma[i + cols];
    let br = luma[i + cols + 1];

    let gx = -tl + tr - 2.0 * ml + 2.0 * mr - bl + br;
    let gy = -tl - 2.0 * tc - tr + bl + 2.0 * bc + br;
    (gx, gy)
}

/// Itère sur les cellules intérieures (bordure d'une cellule exclue).
fn interior(cols: usize, rows: usize) -> impl Iterator<Item = usize> {
    (1..rows.saturating_sub(1))
        .flat_map(move |y| (1..cols.saturating_sub(1)).map(move |x| y * cols + x))
}

fn sobel(luma: &[f32], cols: usize, rows: usize, strength: f32, threshold: f32) -> Vec<f32> {
    let mut out = vec![0.0; luma.len()];
    for i in interior(cols, rows) {
        let (gx, gy) = sobel_at(luma, cols, i);
        out[i] = keep((gx * gx + gy * gy).sqrt() * strength, threshold);
    }
    out
}

fn laplacian(luma: &[f32], cols: usize, rows: usize, strength: f32, threshold: f32) -> Vec<f32> {
    let mut out = vec![0.0; luma.len()];
    for i in interior(cols, rows) {
        let v = luma[i - cols] + luma[i - 1] + luma[i + 1] + luma[i + cols] - 4.0 * luma[i];
        out[i] = keep(v.abs() * strength, threshold);
    }
    out
}

fn gaussian_3x3(luma: &[f32], cols: usize, rows: usize) -> Vec<f32> {
    let mut out = vec![0.0; luma.len()];
    for i in interior(cols, rows) {
        let mut sum = 0.0;
        let mut k = 0;
        for row in [i - cols, i, i + cols] {
            for j in row - 1..=row + 1 {
                sum += luma[j] * GAUSS_3X3[k];
                k += 1;
            }
        }
        out[i] = sum / 16.0;
    }
    out
}

/// Voisins à comparer selon l'angle du gradient (degrés, `atan2`).
#[inline(always)]
fn nms_neighbors(angle: f32, i: usize, cols: usize) -> (usize, usize) {
    if (-22.5..22.5).contains(&angle) || angle >= 157.5 || angle < -157.5 {
        (i - 1, i + 1)
    } else if (22.5..67.5).contains(&angle) || (-157.5..-112.5).contains(&angle) {
        (i - cols + 1, i + cols - 1)
    } else if (67.5..112.5).contains(&angle) || (-112.5..-67.5).contains(&angle) {
        (i - cols, i + cols)
    } else {
        (i - cols - 1, i + cols + 1)
    }
}

fn canny(luma: &[f32], cols: usize, rows: usize, strength: f32, threshold: f32) -> Vec<f32> {
    let smoothed = gaussian_3x3(luma, cols, rows);

    let mut magnitude = vec![0.0f32; luma.len()];
    let mut angle = vec![0.0f32; luma.len()];
    for i in interior(cols, rows) {
        let (gx, gy) = sobel_at(&smoothed, cols, i);
        magnitude[i] = (gx * gx + gy * gy).sqrt();
        angle[i] = gy.atan2(gx).to_degrees();
    }

    let mut out = vec![0.0; luma.len()];
    let low = threshold * CANNY_LOW_RATIO;
    for i in interior(cols, rows) {
        let m = magnitude[i];
        let (n1, n2) = nms_neighbors(angle[i], i, cols);
        let suppressed = if m >= magnitude[n1] && m >= magnitude[n2] {
            m
        } else {
            0.0
        };

        let v = suppressed * strength;
        out[i] = if v >= threshold {
            v.clamp(0.0, 255.0)
        } else if v >= low {
            (v * 0.5).clamp(0.0, 255.0)
        } else {
            0.0
        };
    }
    out
}
