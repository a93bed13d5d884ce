use std::path::{Path, PathBuf};
use std::sync::Arc;

use am_core::config::{EditorSettings, load_config};
use anyhow::Result;
use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecursiveMode, Watcher};

/// Recharge `path` par-dessus les réglages courants et publie le résultat.
///
/// En cas d'échec, les réglages précédents restent en place.
///
/// # Errors
/// Returns the load error (already logged) so callers can surface it.
pub fn reload_into(path: &Path, settings: &ArcSwap<EditorSettings>) -> Result<()> {
    let current = settings.load_full();
    match load_config(path, &current) {
        Ok(new_settings) => {
            settings.store(Arc::new(new_settings));
            log::info!("Config rechargée depuis {}", path.display());
            Ok(())
        }
        Err(e) => {
            // On garde l'ancienne config. Pas de panic.
            log::warn!("Erreur de rechargement config : {e:#}");
            Err(e)
        }
    }
}

/// Surveille le fichier TOML et met à jour l'ArcSwap à chaque modification.
///
/// Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use arc_swap::ArcSwap;
/// use am_core::config::EditorSettings;
/// use am_app::hotreload::spawn_config_watcher;
/// use std::path::Path;
///
/// let settings = Arc::new(ArcSwap::from_pointee(EditorSettings::default()));
/// let _watcher = spawn_config_watcher(Path::new("config/default.toml"), &settings);
/// ```
pub fn spawn_config_watcher(
    config_path: &Path,
    settings: &Arc<ArcSwap<EditorSettings>>,
) -> Result<impl Watcher + use<>> {
    let settings = Arc::clone(settings);
    let path: PathBuf = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        {
            let _ = reload_into(&path, &settings);
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    log::info!("Surveillance de {}", config_path.display());
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_merges_over_current_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.toml");
        std::fs::write(&path, "contrast = 40.0\n").unwrap();

        let start = EditorSettings {
            cols: 200,
            ..EditorSettings::default()
        };
        let settings = ArcSwap::from_pointee(start);
        reload_into(&path, &settings).unwrap();

        let now = settings.load();
        assert!((now.contrast - 40.0).abs() < f32::EPSILON);
        // Clé absente du fichier : valeur courante conservée.
        assert_eq!(now.cols, 200);
    }

    #[test]
    fn broken_file_keeps_previous_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.toml");
        std::fs::write(&path, "contrast = \"very\"\n").unwrap();

        let settings = ArcSwap::from_pointee(EditorSettings::default());
        let before = settings.load_full();
        assert!(reload_into(&path, &settings).is_err());
        assert!(Arc::ptr_eq(&before, &settings.load_full()));
    }

    #[test]
    fn watcher_starts_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.toml");
        std::fs::write(&path, "").unwrap();
        let settings = Arc::new(ArcSwap::from_pointee(EditorSettings::default()));
        assert!(spawn_config_watcher(&path, &settings).is_ok());
    }
}
