use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::{CharsetId, Gradient};
use crate::error::CoreError;

/// Mode de tramage appliqué lors du mapping luminance → caractère.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherMode {
    /// Mapping direct, sans diffusion.
    #[default]
    None,
    /// Diffusion d'erreur Floyd–Steinberg (7/16, 3/16, 5/16, 1/16).
    #[serde(alias = "floyd-steinberg")]
    FloydSteinberg,
    /// Tramage ordonné Bayer 4×4.
    Bayer,
    /// Diffusion Atkinson (6 voisins × 1/8).
    Atkinson,
}

impl DitherMode {
    /// Tous les modes, dans l'ordre de cycle de l'UI.
    pub const ALL: [DitherMode; 4] = [
        DitherMode::None,
        DitherMode::FloydSteinberg,
        DitherMode::Bayer,
        DitherMode::Atkinson,
    ];

    /// Nom court stable.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DitherMode::None => "none",
            DitherMode::FloydSteinberg => "floyd-steinberg",
            DitherMode::Bayer => "bayer",
            DitherMode::Atkinson => "atkinson",
        }
    }

    /// Mode suivant dans le cycle.
    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for DitherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DitherMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(DitherMode::None),
            "floyd-steinberg" | "floyd_steinberg" | "fs" => Ok(DitherMode::FloydSteinberg),
            "bayer" => Ok(DitherMode::Bayer),
            "atkinson" => Ok(DitherMode::Atkinson),
            other => Err(format!("mode de tramage inconnu '{other}'")),
        }
    }
}

/// Détecteur de contours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    /// Pas de détection.
    #[default]
    Off,
    /// Gradient Sobel 3×3.
    Sobel,
    /// Canny simplifié (gauss → sobel → NMS → double seuil).
    Canny,
    /// Laplacien 3×3.
    Laplacian,
}

impl EdgeMode {
    /// Tous les modes, dans l'ordre de cycle de l'UI.
    pub const ALL: [EdgeMode; 4] = [
        EdgeMode::Off,
        EdgeMode::Sobel,
        EdgeMode::Canny,
        EdgeMode::Laplacian,
    ];

    /// Nom court stable.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeMode::Off => "off",
            EdgeMode::Sobel => "sobel",
            EdgeMode::Canny => "canny",
            EdgeMode::Laplacian => "laplacian",
        }
    }

    /// Mode suivant dans le cycle.
    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("mode de contours inconnu '{s}'"))
    }
}

/// Paramètres immuables d'un passage du pipeline sur une frame.
///
/// Relu à chaque frame : aucune mémoire entre deux appels.
///
/// # Example
/// ```
/// use am_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.cols, 120);
/// assert!(config.validate().is_ok());
/// ```
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Largeur de la grille en caractères. Les lignes sont dérivées.
    pub cols: u32,
    /// Luminosité [-100, 100].
    pub brightness: f32,
    /// Contraste [-100, 100].
    pub contrast: f32,
    /// Gamma, strictement positif (plancher recommandé 0.1).
    pub gamma: f32,
    /// Inversion de la luminance.
    pub invert: bool,
    /// Rayon du flou boîte. < 1 = désactivé.
    pub blur: f32,
    /// Dégradé de caractères résolu.
    pub charset: Gradient,
    /// Mode de tramage.
    pub dither: DitherMode,
    /// Détecteur de contours.
    pub edge_mode: EdgeMode,
    /// Force des contours [0, 100].
    pub edge_strength: f32,
    /// Seuil des contours [0, 255].
    pub edge_threshold: f32,
    /// Part des contours dans le mélange [0, 100].
    pub edge_blend: f32,
    /// Rendu couleur par cellule.
    pub color_enabled: bool,
    /// Réduction de palette (median cut) en mode couleur.
    pub palette_mode: bool,
    /// Taille cible de la palette.
    pub palette_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        EditorSettings::default().pipeline_config()
    }
}

impl PipelineConfig {
    /// Vérifie les préconditions du pipeline (cols ≥ 1, gamma > 0).
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] when a precondition is violated.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cols == 0 {
            return Err(CoreError::Config("cols doit être ≥ 1".into()));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(CoreError::Config(format!(
                "gamma doit être > 0 (reçu {})",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// Réglages de l'éditeur : tout ce qui est persisté entre deux sessions.
///
/// Les stats d'exécution et l'état d'export vivent ailleurs et ne sont
/// jamais sérialisés.
///
/// # Example
/// ```
/// use am_core::config::EditorSettings;
/// let s = EditorSettings::default();
/// assert_eq!(s.fps_cap, 24);
/// assert_eq!(s.export_fps, 15);
/// ```
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EditorSettings {
    // === Géométrie ===
    /// Largeur de la grille en caractères.
    pub cols: u32,
    /// Plafond FPS de la boucle live.
    pub fps_cap: u32,

    // === Style ===
    /// Charset actif.
    pub charset_id: CharsetId,
    /// Chaîne utilisée quand `charset_id == Custom`.
    pub custom_charset: String,
    /// Luminosité [-100, 100].
    pub brightness: f32,
    /// Contraste [-100, 100].
    pub contrast: f32,
    /// Gamma [0.1, 3.0].
    pub gamma: f32,
    /// Inversion.
    pub invert: bool,
    /// Flou [0, 10].
    pub blur: f32,

    // === Contours ===
    /// Détecteur.
    pub edge_mode: EdgeMode,
    /// Force [0, 100].
    pub edge_strength: f32,
    /// Seuil [0, 255].
    pub edge_threshold: f32,
    /// Mélange [0, 100].
    pub edge_blend: f32,

    // === Tramage + couleur ===
    /// Tramage.
    pub dither: DitherMode,
    /// Couleur par cellule.
    pub color_enabled: bool,
    /// Palette réduite.
    pub palette_mode: bool,
    /// Taille de palette (4, 8, 16 typiquement).
    pub palette_size: usize,

    // === Export ===
    /// FPS des exports.
    pub export_fps: u32,
    /// Durée max exportée en secondes. 0 = vidéo entière.
    pub export_duration: f64,

    /// Preset actif, effacé dès qu'un réglage est modifié à la main.
    pub active_preset: Option<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            cols: 120,
            fps_cap: 24,
            charset_id: CharsetId::Standard,
            custom_charset: String::new(),
            brightness: 0.0,
            contrast: 0.0,
            gamma: 1.0,
            invert: false,
            blur: 0.0,
            edge_mode: EdgeMode::Off,
            edge_strength: 50.0,
            edge_threshold: 30.0,
            edge_blend: 50.0,
            dither: DitherMode::None,
            color_enabled: false,
            palette_mode: false,
            palette_size: 8,
            export_fps: 15,
            export_duration: 10.0,
            active_preset: None,
        }
    }
}

impl EditorSettings {
    /// Clamp all numeric fields to their UI ranges.
    /// Called after every deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.cols = self.cols.clamp(20, 400);
        self.fps_cap = self.fps_cap.clamp(1, 60);
        self.brightness = self.brightness.clamp(-100.0, 100.0);
        self.contrast = self.contrast.clamp(-100.0, 100.0);
        self.gamma = if self.gamma.is_finite() {
            self.gamma.clamp(0.1, 3.0)
        } else {
            1.0
        };
        self.blur = self.blur.clamp(0.0, 10.0);
        self.edge_strength = self.edge_strength.clamp(0.0, 100.0);
        self.edge_threshold = self.edge_threshold.clamp(0.0, 255.0);
        self.edge_blend = self.edge_blend.clamp(0.0, 100.0);
        self.palette_size = self.palette_size.clamp(2, 64);
        self.export_fps = self.export_fps.clamp(1, 60);
        self.export_duration = if self.export_duration.is_finite() {
            self.export_duration.clamp(0.0, 600.0)
        } else {
            0.0
        };
    }

    /// Instantané immuable pour une frame.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            cols: self.cols,
            brightness: self.brightness,
            contrast: self.contrast,
            gamma: self.gamma,
            invert: self.invert,
            blur: self.blur,
            charset: Gradient::resolve(self.charset_id, &self.custom_charset),
            dither: self.dither,
            edge_mode: self.edge_mode,
            edge_strength: self.edge_strength,
            edge_threshold: self.edge_threshold,
            edge_blend: self.edge_blend,
            color_enabled: self.color_enabled,
            palette_mode: self.palette_mode,
            palette_size: self.palette_size,
        }
    }

    /// Modification manuelle d'un réglage : efface le preset actif.
    ///
    /// # Example
    /// ```
    /// use am_core::config::EditorSettings;
    /// let mut s = EditorSettings { active_preset: Some("edge_glow".into()), ..Default::default() };
    /// s.edit(|s| s.invert = true);
    /// assert!(s.invert);
    /// assert!(s.active_preset.is_none());
    /// ```
    pub fn edit(&mut self, mutate: impl FnOnce(&mut Self)) {
        mutate(self);
        self.active_preset = None;
        self.clamp_all();
    }
}

/// Charge un fichier TOML et fusionne avec les valeurs de `base`.
///
/// Les clés absentes conservent la valeur de `base` : le fichier peut ne
/// contenir qu'un sous-ensemble de réglages.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use am_core::config::{load_config, EditorSettings};
/// use std::path::Path;
/// let settings = load_config(Path::new("config/default.toml"), &EditorSettings::default()).unwrap();
/// ```
pub fn load_config(path: &Path, base: &EditorSettings) -> Result<EditorSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content, base)
        .with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Fusionne un document TOML partiel dans `base`.
///
/// # Errors
/// Returns an error if the document is not valid TOML or has mistyped keys.
pub fn parse_config(content: &str, base: &EditorSettings) -> Result<EditorSettings> {
    let overrides: toml::Table = toml::from_str(content)?;
    let mut merged = toml::Table::try_from(base)?;
    // Accepte un document plat ou une section [settings].
    let source = match overrides.get("settings") {
        Some(toml::Value::Table(t)) => t.clone(),
        _ => overrides,
    };
    for (key, value) in source {
        merged.insert(key, value);
    }
    let mut settings: EditorSettings = toml::Value::Table(merged).try_into()?;
    settings.clamp_all();
    Ok(settings)
}
