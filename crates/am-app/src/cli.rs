use std::path::PathBuf;

use am_core::charset::CharsetId;
use am_core::config::{DitherMode, EdgeMode, EditorSettings, load_config};
use am_core::presets;
use am_core::settings::load_settings;
use am_export::ExportFormat;
use anyhow::{Context, Result};
use clap::Parser;

/// ascii-mation : vidéo et images en ASCII art, en temps réel.
#[derive(Parser, Debug)]
#[command(name = "asciimation", version, about, long_about = None)]
pub struct Cli {
    /// Source visuelle : chemin vers une vidéo (décodée via ffmpeg).
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Source visuelle : chemin vers une image (PNG, JPEG, BMP, GIF).
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Fichier TOML partiel, surveillé et rechargé à chaud.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Réglages persistés (JSON), relus au démarrage et écrits à la sortie.
    #[arg(long, default_value = "config/settings.json")]
    pub settings: PathBuf,

    /// Preset nommé : brutal_mono, retro_color, high_contrast, dense, soft_dither, edge_glow.
    #[arg(long)]
    pub preset: Option<String>,

    /// Largeur de la grille en caractères (20..=400).
    #[arg(long)]
    pub cols: Option<u32>,

    /// Plafond d'images par seconde du rendu live.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Jeu de caractères : detailed, standard, blocks, binary, minimal, dense, custom.
    #[arg(long)]
    pub charset: Option<String>,

    /// Tramage : none, floyd-steinberg, bayer, atkinson.
    #[arg(long)]
    pub dither: Option<String>,

    /// Contours : off, sobel, canny, laplacian.
    #[arg(long)]
    pub edge: Option<String>,

    /// Désactiver la couleur.
    #[arg(long, default_value_t = false)]
    pub no_color: bool,

    /// Export sans interface vers ce fichier (format déduit de l'extension).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Format d'export forcé : gif, webm, mp4, html.
    #[arg(long)]
    pub format: Option<String>,

    /// Dossier des exports lancés depuis l'interface.
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Cadence des exports.
    #[arg(long)]
    pub export_fps: Option<u32>,

    /// Durée exportée en secondes (0 = toute la vidéo).
    #[arg(long)]
    pub duration: Option<f64>,

    /// Police monospace (TTF/OTF) pour les exports raster.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one visual source is provided.
    ///
    /// # Errors
    /// Returns an error if zero or both sources are specified.
    pub fn validate_source(&self) -> Result<()> {
        match (&self.video, &self.image) {
            (None, None) => anyhow::bail!("Aucune source visuelle spécifiée. Utilisez --video ou --image."),
            (Some(_), Some(_)) => {
                anyhow::bail!("Une seule source visuelle à la fois : --video OU --image.")
            }
            _ => Ok(()),
        }
    }

    /// Format d'export demandé : `--format`, sinon l'extension de `--export`.
    ///
    /// # Errors
    /// Returns an error if the format cannot be determined.
    pub fn export_format(&self) -> Result<Option<ExportFormat>> {
        let Some(out) = &self.export else {
            return Ok(None);
        };
        if let Some(name) = &self.format {
            return name.parse().map(Some).map_err(anyhow::Error::msg);
        }
        ExportFormat::from_path(out)
            .map(Some)
            .with_context(|| format!("Format d'export indéterminé pour {} (utiliser --format)", out.display()))
    }

    /// Réglages de départ : défauts → JSON persisté → TOML → preset → options.
    ///
    /// # Errors
    /// Returns an error for an unreadable TOML file, an unknown preset or an
    /// invalid option value.
    pub fn resolve_settings(&self) -> Result<EditorSettings> {
        let persisted = load_settings(&self.settings);
        let mut settings = if self.config.exists() {
            load_config(&self.config, &persisted)?
        } else {
            log::info!(
                "Config introuvable : {}. Réglages persistés seuls.",
                self.config.display()
            );
            persisted
        };

        if let Some(name) = &self.preset {
            let p = presets::preset(name).with_context(|| {
                format!(
                    "Preset inconnu : {name}. Disponibles : {}",
                    presets::PRESET_IDS.join(", ")
                )
            })?;
            presets::apply_preset(&mut settings, &p);
        }

        self.apply_overrides(&mut settings)?;
        Ok(settings)
    }

    /// Applique les options individuelles (priorité maximale).
    ///
    /// # Errors
    /// Returns an error if a charset, dither or edge name is unknown.
    pub fn apply_overrides(&self, settings: &mut EditorSettings) -> Result<()> {
        let charset = self
            .charset
            .as_deref()
            .map(str::parse::<CharsetId>)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let dither = self
            .dither
            .as_deref()
            .map(str::parse::<DitherMode>)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let edge = self
            .edge
            .as_deref()
            .map(str::parse::<EdgeMode>)
            .transpose()
            .map_err(anyhow::Error::msg)?;

        let touched = self.cols.is_some()
            || charset.is_some()
            || dither.is_some()
            || edge.is_some()
            || self.no_color;
        let apply = |s: &mut EditorSettings| {
            if let Some(cols) = self.cols {
                s.cols = cols;
            }
            if let Some(id) = charset {
                s.charset_id = id;
            }
            if let Some(mode) = dither {
                s.dither = mode;
            }
            if let Some(mode) = edge {
                s.edge_mode = mode;
            }
            if self.no_color {
                s.color_enabled = false;
            }
            if let Some(fps) = self.fps {
                s.fps_cap = fps;
            }
            if let Some(fps) = self.export_fps {
                s.export_fps = fps;
            }
            if let Some(d) = self.duration {
                s.export_duration = d;
            }
        };
        // Un changement de style efface le preset actif ; fps et export non.
        if touched {
            settings.edit(apply);
        } else {
            apply(settings);
            settings.clamp_all();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("asciimation").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn exactly_one_source() {
        assert!(parse(&[]).validate_source().is_err());
        assert!(parse(&["--video", "a.mp4", "--image", "b.png"]).validate_source().is_err());
        assert!(parse(&["--image", "b.png"]).validate_source().is_ok());
    }

    #[test]
    fn export_format_from_extension_or_flag() {
        let cli = parse(&["--video", "a.mp4", "--export", "out/clip.webm"]);
        assert_eq!(cli.export_format().unwrap(), Some(ExportFormat::Webm));
        let cli = parse(&["--video", "a.mp4", "--export", "clip", "--format", "gif"]);
        assert_eq!(cli.export_format().unwrap(), Some(ExportFormat::Gif));
        assert!(parse(&["--video", "a.mp4", "--export", "clip"]).export_format().is_err());
        assert_eq!(parse(&["--video", "a.mp4"]).export_format().unwrap(), None);
    }

    #[test]
    fn priority_json_then_toml_then_preset_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("settings.json");
        let toml = dir.path().join("default.toml");
        std::fs::write(&json, r#"{ "cols": 90, "gamma": 1.5, "export_fps": 20 }"#).unwrap();
        std::fs::write(&toml, "gamma = 2.0\nblur = 1.5\n").unwrap();

        let cli = parse(&[
            "--image",
            "x.png",
            "--settings",
            json.to_str().unwrap(),
            "--config",
            toml.to_str().unwrap(),
            "--preset",
            "edge_glow",
            "--dither",
            "bayer",
            "--fps",
            "30",
        ]);
        let s = cli.resolve_settings().unwrap();
        // Preset écrase JSON/TOML sur ses champs de style.
        assert_eq!(s.cols, 120);
        assert!((s.gamma - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.edge_mode, EdgeMode::Sobel);
        // Champs hors preset : TOML puis JSON.
        assert_eq!(s.export_fps, 20);
        // Option individuelle : priorité maximale, preset effacé.
        assert_eq!(s.dither, DitherMode::Bayer);
        assert_eq!(s.fps_cap, 30);
        assert!(s.active_preset.is_none());
    }

    #[test]
    fn preset_survives_non_style_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cli = parse(&[
            "--image",
            "x.png",
            "--settings",
            dir.path().join("none.json").to_str().unwrap(),
            "--config",
            dir.path().join("none.toml").to_str().unwrap(),
            "--preset",
            "retro-color",
            "--export-fps",
            "12",
        ]);
        let s = cli.resolve_settings().unwrap();
        assert_eq!(s.active_preset.as_deref(), Some("retro_color"));
        assert_eq!(s.export_fps, 12);
    }

    #[test]
    fn unknown_names_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("s.json");
        let base = ["--image", "x.png", "--settings", settings.to_str().unwrap()];
        let with = |extra: &[&str]| {
            let args: Vec<&str> = base.iter().chain(extra).copied().collect();
            parse(&args).resolve_settings()
        };
        assert!(with(&["--preset", "nope"]).is_err());
        assert!(with(&["--dither", "nope"]).is_err());
        assert!(with(&["--edge", "nope"]).is_err());
        assert!(with(&["--charset", "nope"]).is_err());
    }

    #[test]
    fn flags_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("s.json");
        let cli = parse(&[
            "--image",
            "x.png",
            "--settings",
            settings.to_str().unwrap(),
            "--cols",
            "5000",
            "--export-fps",
            "0",
        ]);
        let s = cli.resolve_settings().unwrap();
        assert_eq!(s.cols, 400);
        assert_eq!(s.export_fps, 1);
    }
}
