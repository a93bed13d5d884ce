use std::path::Path;
use std::sync::Arc;

use am_app::app::{App, AppOptions, LiveSource};
use am_app::batch::{self, ExportJob};
use am_app::{cli, hotreload};
use am_core::traits::FrameSource;
use am_source::{ImageSource, VideoSource};
use anyhow::Result;
use arc_swap::ArcSwap;
use clap::Parser;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider la source
    cli.validate_source()?;

    // 4. Réglages : défauts → JSON → TOML → preset → options
    let settings = cli.resolve_settings()?;

    // Export sans interface
    if let Some(format) = cli.export_format()? {
        let Some(out) = cli.export.clone() else {
            anyhow::bail!("--export requis pour un export sans interface");
        };
        let mut source = open_frame_source(&cli)?;
        let job = ExportJob {
            format,
            out,
            font: cli.font.clone(),
        };
        let n = batch::run_headless(source.as_mut(), &settings, &job)?;
        println!("{n} frames exportées → {}", job.out.display());
        return Ok(());
    }

    let settings = Arc::new(ArcSwap::from_pointee(settings));

    // 5. Hot-reload du TOML (facultatif)
    let _watcher = if cli.config.exists() {
        hotreload::spawn_config_watcher(&cli.config, &settings)
            .inspect_err(|e| log::warn!("Hot-reload indisponible : {e:#}"))
            .ok()
    } else {
        None
    };

    // 6. Charger la source ; un échec reste affiché dans l'interface
    let (source, load_error) = match open_live_source(&cli) {
        Ok(source) => (Some(source), None),
        Err(e) => {
            log::error!("Échec du chargement : {e:#}");
            (None, Some(format!("Échec du chargement : {e}")))
        }
    };
    let label = source_label(&cli);

    // 7. Initialiser le terminal ratatui
    let terminal = ratatui::init();

    let mut app = App::new(
        settings,
        source,
        label,
        AppOptions {
            settings_path: cli.settings.clone(),
            export_dir: cli.export_dir.clone(),
            font: cli.font.clone(),
        },
    );
    if let Some(msg) = load_error {
        app.set_status(msg);
    }

    // 8. Boucle principale
    let result = app.run(terminal);

    // 9. Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    ratatui::restore();

    result
}

fn open_frame_source(cli: &cli::Cli) -> Result<Box<dyn FrameSource>> {
    if let Some(path) = &cli.video {
        Ok(Box::new(VideoSource::open(path)?))
    } else if let Some(path) = &cli.image {
        Ok(Box::new(ImageSource::new(path)?))
    } else {
        anyhow::bail!("Aucune source visuelle spécifiée")
    }
}

fn open_live_source(cli: &cli::Cli) -> Result<LiveSource> {
    if let Some(path) = &cli.video {
        LiveSource::open_video(path)
    } else if let Some(path) = &cli.image {
        LiveSource::open_image(path)
    } else {
        anyhow::bail!("Aucune source visuelle spécifiée")
    }
}

fn source_label(cli: &cli::Cli) -> String {
    cli.video
        .as_deref()
        .or(cli.image.as_deref())
        .and_then(Path::file_name)
        .map_or_else(|| "-".to_string(), |n| n.to_string_lossy().into_owned())
}
