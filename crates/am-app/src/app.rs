use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use am_ascii::Compositor;
use am_core::config::EditorSettings;
use am_core::frame::{AsciiFrame, FrameBuffer};
use am_core::presets;
use am_core::settings::save_settings;
use am_core::traits::FrameSource;
use am_export::ExportFormat;
use am_render::fps::{FrameLimiter, StatsMeter};
use am_render::ui::{self, RenderState, UiView};
use am_source::{ImageSource, Playback, VideoCommand, VideoSource};
use anyhow::Result;
use arc_swap::ArcSwap;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::Backend;
use ratatui::{DefaultTerminal, Terminal};

use crate::batch::{self, BatchError, ExportJob};
use crate::generative;

/// Pas des flèches gauche/droite, en secondes.
pub const SEEK_STEP: f64 = 5.0;

/// Source affichée en direct.
pub enum LiveSource {
    /// Image fixe : une seule frame, pas de transport.
    Image(ImageSource),
    /// Vidéo : lecture en boucle sur un thread + capture par seek pour l'export.
    Video {
        source: VideoSource,
        playback: Playback,
    },
}

impl LiveSource {
    /// Sonde la vidéo (timeout de chargement inclus) et démarre la lecture.
    ///
    /// # Errors
    /// Returns an error if reading the metadata fails or times out, or the decode thread
    /// cannot start.
    pub fn open_video(path: &Path) -> Result<Self> {
        let source = VideoSource::open(path)?;
        let playback = source.spawn_playback()?;
        Ok(Self::Video { source, playback })
    }

    /// Charge une image fixe.
    ///
    /// # Errors
    /// See [`ImageSource::new`].
    pub fn open_image(path: &Path) -> Result<Self> {
        Ok(Self::Image(ImageSource::new(path)?))
    }

    fn frame_source(&mut self) -> &mut dyn FrameSource {
        match self {
            Self::Image(image) => image,
            Self::Video { source, .. } => source,
        }
    }

    fn duration(&self) -> f64 {
        match self {
            Self::Image(_) => 0.0,
            Self::Video { source, .. } => source.info().duration,
        }
    }

    fn position(&self) -> f64 {
        match self {
            Self::Image(_) => 0.0,
            Self::Video { playback, .. } => playback.position(),
        }
    }

    fn is_paused(&self) -> bool {
        match self {
            Self::Image(_) => false,
            Self::Video { playback, .. } => playback.is_paused(),
        }
    }

    /// Frame la plus récente : image fixe, ou dernière frame décodée en attente.
    fn latest_frame(&self) -> Option<Arc<FrameBuffer>> {
        match self {
            Self::Image(image) => Some(image.frame()),
            Self::Video { playback, .. } => playback.frames.try_iter().last(),
        }
    }

    fn send(&self, cmd: VideoCommand) {
        if let Self::Video { playback, .. } = self {
            log::debug!("Commande vidéo : {cmd:?}");
            playback.send(cmd);
        }
    }
}

/// Chemins et options fixes de la session.
#[derive(Clone, Debug, Default)]
pub struct AppOptions {
    /// Réglages JSON écrits à la sortie.
    pub settings_path: PathBuf,
    /// Dossier des exports lancés au clavier.
    pub export_dir: PathBuf,
    /// Police explicite pour les exports raster.
    pub font: Option<PathBuf>,
}

/// Main application struct holding all state.
pub struct App {
    /// Réglages courants (écrits par le clavier et le hot-reload, lus à chaque tick).
    pub settings: Arc<ArcSwap<EditorSettings>>,
    options: AppOptions,
    source: Option<LiveSource>,
    source_label: String,
    current_frame: Option<Arc<FrameBuffer>>,
    /// Dernière frame ASCII affichée.
    ascii: Option<AsciiFrame>,
    compositor: Compositor,
    limiter: FrameLimiter,
    stats: StatsMeter,
    rng: fastrand::Rng,
    status: Option<String>,
    show_help: bool,
    quit: bool,
    /// Export demandé au clavier, exécuté au prochain tour de boucle.
    pending_export: Option<ExportFormat>,
    pipeline_error_shown: bool,
}

impl App {
    #[must_use]
    pub fn new(
        settings: Arc<ArcSwap<EditorSettings>>,
        source: Option<LiveSource>,
        source_label: String,
        options: AppOptions,
    ) -> Self {
        let fps_cap = settings.load().fps_cap;
        Self {
            settings,
            options,
            source,
            source_label,
            current_frame: None,
            ascii: None,
            compositor: Compositor::new(),
            limiter: FrameLimiter::new(fps_cap),
            stats: StatsMeter::new(Instant::now()),
            rng: fastrand::Rng::new(),
            status: None,
            show_help: false,
            quit: false,
            pending_export: None,
            pipeline_error_shown: false,
        }
    }

    /// Message affiché dans la barre d'état jusqu'au suivant.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    /// Boucle principale : événements, pipeline, rendu, au plafond fps courant.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be polled or drawn.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.quit {
            let fps_cap = self.settings.load().fps_cap;
            self.limiter.set_cap(fps_cap);

            let now = Instant::now();
            if !self.limiter.try_begin(now) {
                // Dormir le temps restant, mais rester réactif aux événements
                if event::poll(self.limiter.remaining(now))? {
                    self.handle_event(&event::read()?);
                }
                continue;
            }

            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }
            if let Some(format) = self.pending_export.take() {
                self.export(&mut terminal, format);
                continue;
            }

            // Instantané des réglages pour tout le tick.
            let settings = self.settings.load_full();
            let start = Instant::now();
            self.process_frame(&settings);
            let view = self.view(&settings);
            terminal.draw(|f| ui::draw(f, &view))?;
            self.record_stats(now, start);
        }
        self.shutdown();
        Ok(())
    }

    fn view<'a>(&'a self, settings: &'a EditorSettings) -> UiView<'a> {
        let state = if self.source.as_ref().is_some_and(LiveSource::is_paused) {
            RenderState::Paused
        } else {
            RenderState::Running
        };
        UiView {
            ascii: self.ascii.as_ref(),
            settings,
            stats: self.stats.latest(),
            state,
            position: self.source.as_ref().map_or(0.0, LiveSource::position),
            duration: self.source.as_ref().map_or(0.0, LiveSource::duration),
            source_label: &self.source_label,
            status: self.status.as_deref(),
            export_progress: None,
            show_help: self.show_help,
        }
    }

    /// Passe la frame source courante dans le pipeline.
    fn process_frame(&mut self, settings: &EditorSettings) {
        if let Some(frame) = self.source.as_ref().and_then(LiveSource::latest_frame) {
            self.current_frame = Some(frame);
        }
        let Some(frame) = self.current_frame.as_ref() else {
            return;
        };
        match self.compositor.process(frame, &settings.pipeline_config()) {
            Ok(ascii) => {
                self.ascii = Some(ascii);
                self.pipeline_error_shown = false;
            }
            Err(e) => {
                if !self.pipeline_error_shown {
                    log::warn!("Pipeline : {e:#}");
                    self.status = Some(format!("Pipeline : {e}"));
                    self.pipeline_error_shown = true;
                }
            }
        }
    }

    fn record_stats(&mut self, now: Instant, start: Instant) {
        let (Some(frame), Some(ascii)) = (self.current_frame.as_ref(), self.ascii.as_ref()) else {
            return;
        };
        let render_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.stats.record(
            now,
            render_ms,
            (frame.width, frame.height),
            (ascii.cols(), ascii.rows()),
        );
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = *event
        {
            self.handle_key(code, modifiers);
        }
    }

    /// Dispatch d'une touche pressée.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            if code == KeyCode::Char('c') {
                self.quit = true;
            }
            return;
        }
        if self.show_help {
            if matches!(code, KeyCode::Char('?' | 'q') | KeyCode::Esc) {
                self.show_help = false;
            }
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => self.handle_playback_key(code),
            KeyCode::Char('x' | 'w' | 'm' | 'h') => self.handle_export_key(code),
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                self.apply_preset(presets::PRESET_IDS[idx]);
            }
            KeyCode::Char('r') => {
                let current = self.settings.load_full();
                let random = generative::random_settings(&mut self.rng, &current);
                self.settings.store(Arc::new(random));
                self.status = Some("Preset aléatoire".into());
            }
            KeyCode::Char(_) => self.handle_render_key(code),
            _ => {}
        }
    }

    fn handle_playback_key(&mut self, code: KeyCode) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        match code {
            KeyCode::Char(' ') => {
                if source.is_paused() {
                    source.send(VideoCommand::Play);
                } else {
                    source.send(VideoCommand::Pause);
                }
            }
            KeyCode::Left => source.send(VideoCommand::Seek(-SEEK_STEP)),
            KeyCode::Right => source.send(VideoCommand::Seek(SEEK_STEP)),
            _ => {}
        }
    }

    fn handle_export_key(&mut self, code: KeyCode) {
        self.pending_export = match code {
            KeyCode::Char('x') => Some(ExportFormat::Gif),
            KeyCode::Char('w') => Some(ExportFormat::Webm),
            KeyCode::Char('m') => Some(ExportFormat::Mp4),
            KeyCode::Char('h') => Some(ExportFormat::Html),
            _ => None,
        };
    }

    fn handle_render_key(&mut self, code: KeyCode) {
        let KeyCode::Char(c) = code else {
            return;
        };
        match c {
            '+' | '=' => self.update(|s| s.cols = s.cols.saturating_add(10)),
            '-' => self.update(|s| s.cols = s.cols.saturating_sub(10)),
            's' => self.update(|s| s.charset_id = s.charset_id.next()),
            '{' => self.update(|s| s.brightness -= 5.0),
            '}' => self.update(|s| s.brightness += 5.0),
            '[' => self.update(|s| s.contrast -= 5.0),
            ']' => self.update(|s| s.contrast += 5.0),
            'g' => self.update(|s| s.gamma -= 0.1),
            'G' => self.update(|s| s.gamma += 0.1),
            'i' => self.update(|s| s.invert = !s.invert),
            'b' => self.update(|s| s.blur -= 0.5),
            'B' => self.update(|s| s.blur += 0.5),
            'e' => self.update(|s| s.edge_mode = s.edge_mode.next()),
            't' => self.update(|s| s.edge_threshold -= 5.0),
            'T' => self.update(|s| s.edge_threshold += 5.0),
            'd' => self.update(|s| s.dither = s.dither.next()),
            'c' => self.update(|s| s.color_enabled = !s.color_enabled),
            'p' => self.update(|s| s.palette_mode = !s.palette_mode),
            _ => {}
        }
    }

    /// Modifie un réglage : clamp + preset actif effacé, puis publication.
    fn update(&self, mutate: impl FnOnce(&mut EditorSettings)) {
        let mut new = EditorSettings::clone(&self.settings.load());
        new.edit(mutate);
        self.settings.store(Arc::new(new));
    }

    fn apply_preset(&mut self, id: &str) {
        let Some(p) = presets::preset(id) else {
            return;
        };
        let mut new = EditorSettings::clone(&self.settings.load());
        presets::apply_preset(&mut new, &p);
        self.settings.store(Arc::new(new));
        self.status = Some(format!("Preset : {}", p.label));
    }

    /// Collecte + export avec progression à l'écran. Bloquant : la lecture est
    /// mise en pause pendant la collecte puis reprise si elle tournait.
    pub fn export<B: Backend>(&mut self, terminal: &mut Terminal<B>, format: ExportFormat) {
        // Refus immédiat si le format n'est pas exportable ici.
        if let Err(e) = am_export::probe(format, self.options.font.as_deref()) {
            log::warn!("Export {format} refusé : {e}");
            self.status = Some(e.to_string());
            return;
        }
        let Some(source) = self.source.as_mut() else {
            self.status = Some("Aucune source chargée".into());
            return;
        };

        let was_playing = matches!(source, LiveSource::Video { .. }) && !source.is_paused();
        if was_playing {
            source.send(VideoCommand::Pause);
        }
        let position = source.position();
        let duration = source.duration();

        // Réglages figés pour tout l'export.
        let settings = self.settings.load_full();
        let job = ExportJob {
            format,
            out: self
                .options
                .export_dir
                .join(format!("asciimation.{}", format.extension())),
            font: self.options.font.clone(),
        };
        let stats = self.stats.latest();
        let ascii = self.ascii.as_ref();
        let label = self.source_label.as_str();
        let status_line = format!("Export {format}…");

        let mut drawn = -1.0f32;
        let mut on_progress = |p: f32| {
            if p - drawn < 0.01 && p < 1.0 {
                return;
            }
            drawn = p;
            let view = UiView {
                ascii,
                settings: &settings,
                stats,
                state: RenderState::Exporting,
                position,
                duration,
                source_label: label,
                status: Some(&status_line),
                export_progress: Some(p),
                show_help: false,
            };
            let _ = terminal.draw(|f| ui::draw(f, &view));
        };
        // Pas d'annulation : on vide seulement la file d'entrée.
        let mut drain_input = || {
            while matches!(event::poll(Duration::ZERO), Ok(true)) {
                let _ = event::read();
            }
        };

        let result = batch::run_export(
            source.frame_source(),
            &mut self.compositor,
            &settings,
            &job,
            &mut on_progress,
            &mut drain_input,
        );

        if was_playing {
            source.send(VideoCommand::Play);
        }
        self.status = Some(match result {
            Ok(n) => format!("Export {format} : {n} frames → {}", job.out.display()),
            Err(BatchError::NoFramesCollected) => {
                log::warn!("Export {format} annulé : aucune frame collectée");
                "Export annulé : aucune frame collectée".to_string()
            }
            Err(e) => {
                log::error!("Export {format} échoué : {e}");
                format!("Export {format} échoué : {e}")
            }
        });
    }

    /// Sauvegarde des réglages (jamais des stats ni de l'état d'export).
    fn shutdown(&mut self) {
        if let Err(e) = save_settings(&self.options.settings_path, &self.settings.load()) {
            log::warn!("Réglages non sauvegardés : {e:#}");
        }
        // Le drop de Playback arrête et rejoint le thread vidéo.
        self.source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn app_with(source: Option<LiveSource>, dir: &Path) -> App {
        let settings = Arc::new(ArcSwap::from_pointee(EditorSettings::default()));
        App::new(
            settings,
            source,
            "test".into(),
            AppOptions {
                settings_path: dir.join("settings.json"),
                export_dir: dir.to_path_buf(),
                font: None,
            },
        )
    }

    fn press(app: &mut App, c: char) {
        app.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
    }

    fn still() -> LiveSource {
        let mut fb = FrameBuffer::new(32, 16);
        fb.fill((200, 120, 40));
        LiveSource::Image(ImageSource::from_frame(fb))
    }

    #[test]
    fn render_keys_edit_and_clamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        press(&mut app, '}');
        press(&mut app, ']');
        press(&mut app, 'G');
        assert!((app.settings.load().brightness - 5.0).abs() < f32::EPSILON);
        assert!((app.settings.load().contrast - 5.0).abs() < f32::EPSILON);
        assert!((app.settings.load().gamma - 1.1).abs() < 1e-6);
        for _ in 0..50 {
            press(&mut app, '-');
        }
        assert_eq!(app.settings.load().cols, 20);
        press(&mut app, 'b');
        assert!(app.settings.load().blur.abs() < f32::EPSILON);
    }

    #[test]
    fn preset_keys_then_manual_edit_clears_preset() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        press(&mut app, '6');
        assert_eq!(app.settings.load().active_preset.as_deref(), Some("edge_glow"));
        press(&mut app, 'i');
        assert!(app.settings.load().active_preset.is_none());
    }

    #[test]
    fn random_key_produces_bounded_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        press(&mut app, 'r');
        let s = app.settings.load();
        assert!((80..180).contains(&s.cols));
        assert!(s.active_preset.is_none());
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        press(&mut app, '?');
        assert!(app.show_help);
        press(&mut app, 'c');
        assert!(!app.settings.load().color_enabled);
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.show_help && !app.quit);
        press(&mut app, 'q');
        assert!(app.quit);
    }

    #[test]
    fn ctrl_c_quits() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.quit);
        assert!(!app.settings.load().color_enabled);
    }

    #[test]
    fn export_keys_queue_a_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        press(&mut app, 'w');
        assert_eq!(app.pending_export, Some(ExportFormat::Webm));
        press(&mut app, 'h');
        assert_eq!(app.pending_export, Some(ExportFormat::Html));
    }

    #[test]
    fn tick_processes_still_image_with_current_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Some(still()), dir.path());
        let settings = app.settings.load_full();
        app.process_frame(&settings);
        assert_eq!(app.ascii.as_ref().map(AsciiFrame::cols), Some(120));

        press(&mut app, '-');
        let settings = app.settings.load_full();
        app.process_frame(&settings);
        assert_eq!(app.ascii.as_ref().map(AsciiFrame::cols), Some(110));

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let view = app.view(&settings);
        terminal.draw(|f| ui::draw(f, &view)).unwrap();
    }

    #[test]
    fn export_without_source_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        app.export(&mut terminal, ExportFormat::Html);
        assert_eq!(app.status.as_deref(), Some("Aucune source chargée"));
    }

    #[test]
    fn html_export_from_still_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Some(still()), dir.path());
        app.update(|s| {
            s.export_fps = 4;
            s.export_duration = 0.5;
        });
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        app.export(&mut terminal, ExportFormat::Html);

        assert!(dir.path().join("asciimation.html").is_file());
        assert!(dir.path().join("frames.js").is_file());
        let status = app.status.clone().unwrap_or_default();
        assert!(status.contains("2 frames"), "{status}");
    }

    #[test]
    fn shutdown_persists_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(None, dir.path());
        press(&mut app, 'p');
        app.shutdown();
        let saved = am_core::settings::load_settings(&dir.path().join("settings.json"));
        assert!(saved.palette_mode);
    }
}
