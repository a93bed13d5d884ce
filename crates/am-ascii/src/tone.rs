use rayon::prelude::*;

/// Seuil sous lequel on reste séquentiel (grille typique ~4k cellules).
const PAR_THRESHOLD: usize = 16_384;

/// Ajuste la luminance en place : inversion → contraste + luminosité →
/// clamp → gamma → clamp.
///
/// `brightness` et `contrast` dans [-100, 100], `gamma` > 0.
///
/// # Example
/// ```
/// use am_ascii::tone::apply_adjustments;
/// let mut luma = vec![0.0, 100.0, 255.0];
/// apply_adjustments(&mut luma, 0.0, 0.0, 1.0, true);
/// assert_eq!(luma, vec![255.0, 155.0, 0.0]);
/// ```
pub fn apply_adjustments(luma: &mut [f32], brightness: f32, contrast: f32, gamma: f32, invert: bool) {
    let c = contrast / 100.0 * 255.0;
    let factor = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));
    let offset = brightness / 100.0 * 255.0;
    let inv_gamma = 1.0 / gamma;
    #[allow(clippy::float_cmp)]
    let apply_gamma = inv_gamma != 1.0;

    let adjust = |v: &mut f32| {
        let mut x = *v;
        if invert {
            x = 255.0 - x;
        }
        x = factor * (x - 128.0) + 128.0 + offset;
        x = x.clamp(0.0, 255.0);
        if apply_gamma {
            x = 255.0 * (x / 255.0).powf(inv_gamma);
        }
        *v = x.clamp(0.0, 255.0);
    };

    if luma.len() >= PAR_THRESHOLD {
        luma.par_iter_mut().for_each(adjust);
    } else {
        luma.iter_mut().for_each(adjust);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_settings_are_identity() {
        let original: Vec<f32> = (0..=255u16).map(f32::from).collect();
        let mut luma = original.clone();
        apply_adjustments(&mut luma, 0.0, 0.0, 1.0, false);
        assert_eq!(luma, original);
    }

    #[test]
    fn brightness_saturates() {
        let mut luma = vec![200.0, 10.0];
        apply_adjustments(&mut luma, 100.0, 0.0, 1.0, false);
        assert_eq!(luma, vec![255.0, 255.0]);
        apply_adjustments(&mut luma, -100.0, 0.0, 1.0, false);
        assert_eq!(luma, vec![0.0, 0.0]);
    }

    #[test]
    fn contrast_spreads_around_midpoint() {
        let mut luma = vec![100.0, 128.0, 156.0];
        apply_adjustments(&mut luma, 0.0, 50.0, 1.0, false);
        assert!(luma[0] < 100.0);
        assert!((luma[1] - 128.0).abs() < 1e-4);
        assert!(luma[2] > 156.0);
    }

    #[test]
    fn gamma_above_one_brightens_midtones() {
        let mut luma = vec![0.0, 64.0, 255.0];
        apply_adjustments(&mut luma, 0.0, 0.0, 2.0, false);
        assert!(luma[0].abs() < 1e-4);
        assert!(luma[1] > 64.0);
        assert!((luma[2] - 255.0).abs() < 1e-3);
    }

    #[test]
    fn output_always_in_range() {
        let mut luma: Vec<f32> = (0..PAR_THRESHOLD + 10).map(|i| (i % 256) as f32).collect();
        apply_adjustments(&mut luma, 40.0, 100.0, 0.1, true);
        assert!(luma.iter().all(|v| (0.0..=255.0).contains(v)));
    }
}
