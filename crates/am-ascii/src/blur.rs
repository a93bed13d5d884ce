/// Flou boîte séparable en place : passe horizontale puis verticale.
///
/// `r = round(radius)` ; `radius < 1` ne fait rien. Les bords moyennent
/// sur moins d'échantillons (pas de zero-padding), aucun clamp entre passes.
///
/// # Example
/// ```
/// use am_ascii::blur::box_blur;
/// let mut luma = vec![0.0, 90.0, 0.0];
/// box_blur(&mut luma, 3, 1, 1.0);
/// assert_eq!(luma, vec![45.0, 30.0, 45.0]);
/// ```
pub fn box_blur(luma: &mut [f32], cols: usize, rows: usize, radius: f32) {
    if radius.is_nan() || radius < 1.0 || cols == 0 || rows == 0 {
        return;
    }
    debug_assert_eq!(luma.len(), cols * rows);
    let r = radius.round() as usize;
    let mut tmp = vec![0.0f32; luma.len()];

    // Horizontal
    for y in 0..rows {
        let row = &luma[y * cols..(y + 1) * cols];
        for x in 0..cols {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(cols - 1);
            let sum: f32 = row[lo..=hi].iter().sum();
            tmp[y * cols + x] = sum / (hi - lo + 1) as f32;
        }
    }

    // Vertical
    for x in 0..cols {
        for y in 0..rows {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(rows - 1);
            let sum: f32 = (lo..=hi).map(|ny| tmp[ny * cols + x]).sum();
            luma[y * cols + x] = sum / (hi - lo + 1) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_radius_is_noop() {
        let original = vec![1.0, 50.0, 255.0, 3.0];
        for radius in [0.0, 0.99, -2.0, f32::NAN] {
            let mut luma = original.clone();
            box_blur(&mut luma, 2, 2, radius);
            assert_eq!(luma, original);
        }
    }

    #[test]
    fn uniform_grid_is_stable() {
        let mut luma = vec![77.0; 5 * 4];
        box_blur(&mut luma, 5, 4, 2.4);
        assert!(luma.iter().all(|&v| (v - 77.0).abs() < 1e-4));
    }

    #[test]
    fn vertical_pass_uses_clipped_means() {
        // Colonne unique : seule la passe verticale agit.
        let mut luma = vec![0.0, 0.0, 120.0];
        box_blur(&mut luma, 1, 3, 1.0);
        assert!((luma[0] - 0.0).abs() < 1e-4);
        assert!((luma[1] - 40.0).abs() < 1e-4);
        assert!((luma[2] - 60.0).abs() < 1e-4);
    }

    #[test]
    fn radius_rounds_to_nearest() {
        let mut a = vec![0.0, 0.0, 0.0, 0.0, 100.0];
        let mut b = a.clone();
        box_blur(&mut a, 5, 1, 1.6);
        box_blur(&mut b, 5, 1, 2.0);
        assert_eq!(a, b);
    }
}
