//! Presets nommés : instantanés complets des réglages de style.

use crate::charset::CharsetId;
use crate::config::{DitherMode, EdgeMode, EditorSettings};

/// Identifiants des presets, dans l'ordre des touches 1–6.
pub const PRESET_IDS: [&str; 6] = [
    "brutal_mono",
    "retro_color",
    "high_contrast",
    "dense",
    "soft_dither",
    "edge_glow",
];

/// Valeurs de style d'un preset. Les champs non listés (fps, export,
/// charset custom) sont conservés lors de l'application.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    /// Identifiant stable.
    pub id: &'static str,
    /// Libellé affiché.
    pub label: &'static str,
    pub cols: u32,
    pub brightness: f32,
    pub contrast: f32,
    pub gamma: f32,
    pub invert: bool,
    pub blur: f32,
    pub charset: CharsetId,
    pub dither: DitherMode,
    pub edge_mode: EdgeMode,
    pub edge_strength: f32,
    pub edge_threshold: f32,
    pub edge_blend: f32,
    pub color_enabled: bool,
    pub palette_mode: bool,
    pub palette_size: usize,
}

const BASE: Preset = Preset {
    id: "",
    label: "",
    cols: 120,
    brightness: 0.0,
    contrast: 0.0,
    gamma: 1.0,
    invert: false,
    blur: 0.0,
    charset: CharsetId::Standard,
    dither: DitherMode::None,
    edge_mode: EdgeMode::Off,
    edge_strength: 50.0,
    edge_threshold: 30.0,
    edge_blend: 50.0,
    color_enabled: false,
    palette_mode: false,
    palette_size: 8,
};

/// Recherche un preset par identifiant (insensible à la casse, `-` accepté).
///
/// # Example
/// ```
/// use am_core::presets::preset;
/// let p = preset("edge-glow").unwrap();
/// assert!(p.invert);
/// assert!(preset("unknown").is_none());
/// ```
#[must_use]
pub fn preset(id: &str) -> Option<Preset> {
    let key = id.trim().to_ascii_lowercase().replace('-', "_");
    let p = match key.as_str() {
        "brutal_mono" => Preset {
            id: "brutal_mono",
            label: "Brutal Mono",
            contrast: 30.0,
            ..BASE
        },
        "retro_color" => Preset {
            id: "retro_color",
            label: "Retro Color",
            cols: 100,
            contrast: 10.0,
            charset: CharsetId::Blocks,
            dither: DitherMode::Bayer,
            color_enabled: true,
            palette_mode: true,
            palette_size: 8,
            ..BASE
        },
        "high_contrast" => Preset {
            id: "high_contrast",
            label: "High Contrast",
            brightness: 10.0,
            contrast: 60.0,
            gamma: 0.8,
            charset: CharsetId::Detailed,
            dither: DitherMode::FloydSteinberg,
            ..BASE
        },
        "dense" | "dense_charset" => Preset {
            id: "dense",
            label: "Dense Charset",
            cols: 180,
            contrast: 20.0,
            charset: CharsetId::Detailed,
            ..BASE
        },
        "soft_dither" => Preset {
            id: "soft_dither",
            label: "Soft Dither",
            cols: 100,
            brightness: 5.0,
            contrast: -10.0,
            gamma: 1.2,
            blur: 1.0,
            dither: DitherMode::Atkinson,
            ..BASE
        },
        "edge_glow" => Preset {
            id: "edge_glow",
            label: "Edge Glow",
            contrast: 20.0,
            invert: true,
            edge_mode: EdgeMode::Sobel,
            edge_strength: 80.0,
            edge_threshold: 20.0,
            edge_blend: 70.0,
            ..BASE
        },
        _ => return None,
    };
    Some(p)
}

/// Tous les presets, dans l'ordre des touches.
#[must_use]
pub fn all_presets() -> Vec<Preset> {
    PRESET_IDS.iter().filter_map(|id| preset(id)).collect()
}

/// Applique un preset et marque `active_preset`.
pub fn apply_preset(settings: &mut EditorSettings, p: &Preset) {
    settings.cols = p.cols;
    settings.brightness = p.brightness;
    settings.contrast = p.contrast;
    settings.gamma = p.gamma;
    settings.invert = p.invert;
    settings.blur = p.blur;
    settings.charset_id = p.charset;
    settings.dither = p.dither;
    settings.edge_mode = p.edge_mode;
    settings.edge_strength = p.edge_strength;
    settings.edge_threshold = p.edge_threshold;
    settings.edge_blend = p.edge_blend;
    settings.color_enabled = p.color_enabled;
    settings.palette_mode = p.palette_mode;
    settings.palette_size = p.palette_size;
    settings.active_preset = Some(p.id.to_string());
    settings.clamp_all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_id_resolves() {
        assert_eq!(all_presets().len(), PRESET_IDS.len());
        for p in all_presets() {
            assert_eq!(preset(p.id).map(|q| q.id), Some(p.id));
        }
    }

    #[test]
    fn apply_sets_active_and_edit_clears_it() {
        let mut s = EditorSettings {
            export_fps: 30,
            ..Default::default()
        };
        apply_preset(&mut s, &preset("retro_color").unwrap());
        assert_eq!(s.active_preset.as_deref(), Some("retro_color"));
        assert_eq!(s.charset_id, CharsetId::Blocks);
        assert!(s.color_enabled && s.palette_mode);
        assert_eq!(s.export_fps, 30);
        s.edit(|s| s.cols = 90);
        assert!(s.active_preset.is_none());
    }

    #[test]
    fn edge_glow_values() {
        let p = preset("edge_glow").unwrap();
        assert_eq!(p.edge_mode, EdgeMode::Sobel);
        assert!((p.edge_strength - 80.0).abs() < f32::EPSILON);
        assert!((p.edge_threshold - 20.0).abs() < f32::EPSILON);
        assert!((p.edge_blend - 70.0).abs() < f32::EPSILON);
    }
}
