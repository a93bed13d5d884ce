use std::path::Path;

use anyhow::{Context, Result};

use crate::config::EditorSettings;

/// Charge les réglages persistés (JSON).
///
/// Jamais fatal : fichier absent ou illisible → avertissement + défauts.
///
/// # Example
/// ```
/// use am_core::settings::load_settings;
/// let s = load_settings(std::path::Path::new("/nonexistent/settings.json"));
/// assert_eq!(s.cols, 120);
/// ```
#[must_use]
pub fn load_settings(path: &Path) -> EditorSettings {
    if !path.exists() {
        log::debug!("Pas de réglages persistés ({}), défauts", path.display());
        return EditorSettings::default();
    }
    match read_settings(path) {
        Ok(s) => {
            log::info!("Réglages chargés depuis {}", path.display());
            s
        }
        Err(e) => {
            log::warn!("Réglages ignorés ({}) : {e:#}", path.display());
            EditorSettings::default()
        }
    }
}

fn read_settings(path: &Path) -> Result<EditorSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let mut settings: EditorSettings =
        serde_json::from_str(&content).context("JSON de réglages invalide")?;
    settings.clamp_all();
    Ok(settings)
}

/// Écrit les réglages en JSON (création du dossier parent si besoin).
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn save_settings(path: &Path, settings: &EditorSettings) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {}", path.display()))?;
    log::debug!("Réglages sauvegardés dans {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DitherMode;

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = EditorSettings {
            cols: 150,
            dither: DitherMode::Atkinson,
            active_preset: Some("soft_dither".into()),
            ..Default::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path), EditorSettings::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "invert": true }"#).unwrap();
        let s = load_settings(&path);
        assert!(s.invert);
        assert_eq!(s.fps_cap, 24);
    }
}
