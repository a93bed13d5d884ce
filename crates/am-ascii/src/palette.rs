//! Réduction de palette par median cut, pour le mode couleur « rétro ».
//!
//! Indépendant du mapping de caractères : ne touche que la grille couleur.

use am_core::frame::ColorGrid;

type Rgb = [u8; 3];

/// Palette d'au plus `target` couleurs par median cut.
///
/// Découpe la boîte ayant le plus grand écart sur un canal, à la médiane de
/// ce canal, jusqu'à `target` boîtes ou jusqu'à ce qu'aucune boîte ne soit
/// divisible. Chaque entrée est la moyenne arrondie de sa boîte.
///
/// # Example
/// ```
/// use am_ascii::palette::median_cut;
/// let palette = median_cut(&[[10, 20, 30]; 5], 8);
/// assert_eq!(palette, vec![[10, 20, 30]]);
/// assert_eq!(median_cut(&[], 4), vec![[0, 0, 0]]);
/// ```
#[must_use]
pub fn median_cut(colors: &[Rgb], target: usize) -> Vec<Rgb> {
    if colors.is_empty() {
        return vec![[0, 0, 0]];
    }

    let mut boxes: Vec<Vec<Rgb>> = vec![colors.to_vec()];

    while boxes.len() < target {
        let Some((idx, channel)) = widest_box(&boxes) else {
            break;
        };
        let mut members = boxes.remove(idx);
        // Tri stable : l'ordre d'insertion départage les égalités.
        members.sort_by_key(|c| c[channel]);
        let upper = members.split_off(members.len() / 2);
        boxes.insert(idx, upper);
        boxes.insert(idx, members);
    }

    boxes.iter().map(|b| mean(b)).collect()
}

/// Boîte (≥ 2 couleurs) et canal au plus grand écart strictement positif.
/// Premier trouvé en cas d'égalité.
fn widest_box(boxes: &[Vec<Rgb>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, u8)> = None;
    for (bi, b) in boxes.iter().enumerate() {
        if b.len() < 2 {
            continue;
        }
        for ch in 0..3 {
            let (lo, hi) = b
                .iter()
                .fold((u8::MAX, u8::MIN), |(lo, hi), c| (lo.min(c[ch]), hi.max(c[ch])));
            let range = hi - lo;
            if best.is_none_or(|(_, _, r)| range > r) {
                best = Some((bi, ch, range));
            }
        }
    }
    best.filter(|&(_, _, r)| r > 0).map(|(bi, ch, _)| (bi, ch))
}

fn mean(members: &[Rgb]) -> Rgb {
    let n = members.len().max(1) as f64;
    let mut sum = [0u64; 3];
    for c in members {
        for (s, &v) in sum.iter_mut().zip(c) {
            *s += u64::from(v);
        }
    }
    sum.map(|s| (s as f64 / n).round() as u8)
}

/// Entrée la plus proche (distance euclidienne au carré). La première
/// entrée gagne en cas d'égalité.
///
/// # Example
/// ```
/// use am_ascii::palette::nearest;
/// let palette = [[0, 0, 0], [255, 255, 255]];
/// assert_eq!(nearest([200, 190, 180], &palette), [255, 255, 255]);
/// ```
#[must_use]
pub fn nearest(rgb: Rgb, palette: &[Rgb]) -> Rgb {
    let dist = |c: &Rgb| -> u32 {
        (0..3)
            .map(|ch| {
                let d = i32::from(rgb[ch]) - i32::from(c[ch]);
                d.unsigned_abs() * d.unsigned_abs()
            })
            .sum()
    };
    let mut best = palette.first().copied().unwrap_or(rgb);
    let mut best_dist = u32::MAX;
    for c in palette {
        let d = dist(c);
        if d < best_dist {
            best_dist = d;
            best = *c;
        }
    }
    best
}

/// Quantifie la grille couleur en place vers une palette de `palette_size`.
pub fn quantize_colors(colors: &mut ColorGrid, palette_size: usize) {
    let cells: Vec<Rgb> = (0..colors.cell_count()).map(|i| colors.rgb(i)).collect();
    let palette = median_cut(&cells, palette_size);
    log::trace!("median cut : {} couleurs → {}", cells.len(), palette.len());
    for (i, &c) in cells.iter().enumerate() {
        colors.set_rgb(i, nearest(c, &palette));
    }
}
