//! Collecte de frames par seek successifs, puis export.
//!
//! Progression globale : collecte sur `[0, 0.5]`, encodage sur `[0.5, 1]`.

use std::path::PathBuf;
use std::time::Duration;

use am_ascii::Compositor;
use am_core::config::{EditorSettings, PipelineConfig};
use am_core::frame::AsciiFrame;
use am_core::traits::FrameSource;
use am_export::{ExportError, ExportFormat, ExportOptions};
use thiserror::Error;

/// Délai maximal d'un seek + capture.
pub const SEEK_TIMEOUT: Duration = Duration::from_secs(5);
/// La collecte rend la main à l'hôte toutes les N frames.
pub const COLLECT_YIELD_EVERY: usize = 3;

/// Échec d'un export, par étape.
#[derive(Error, Debug)]
pub enum BatchError {
    /// La collecte n'a produit aucune frame : l'encodeur n'est jamais appelé.
    #[error("Aucune frame collectée")]
    NoFramesCollected,

    /// Seek, décodage ou pipeline en échec pendant la collecte.
    #[error("Collecte interrompue : {0:#}")]
    Source(anyhow::Error),

    /// Sonde, encodage ou écriture en échec.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Une demande d'export.
#[derive(Clone, Debug)]
pub struct ExportJob {
    pub format: ExportFormat,
    pub out: PathBuf,
    /// Police explicite (`--font`), sinon recherche système.
    pub font: Option<PathBuf>,
}

/// Fenêtre de collecte en secondes.
///
/// Vidéo : `min(export, vidéo)`, ou toute la vidéo si `export_duration` vaut 0.
/// Image fixe (durée source 0) : `export_duration`, ou une seule frame.
///
/// # Example
/// ```
/// use am_app::batch::collection_window;
/// assert_eq!(collection_window(10.0, 4.0, 15), 4.0);
/// assert_eq!(collection_window(0.0, 4.0, 15), 4.0);
/// assert_eq!(collection_window(2.0, 0.0, 10), 2.0);
/// assert_eq!(collection_window(0.0, 0.0, 10), 0.1);
/// ```
#[must_use]
pub fn collection_window(export_duration: f64, source_duration: f64, fps: u32) -> f64 {
    let source_is_still = source_duration.abs() < f64::EPSILON;
    match (export_duration > 0.0, source_is_still) {
        (true, true) => export_duration,
        (false, true) => 1.0 / f64::from(fps.max(1)),
        (true, false) => export_duration.min(source_duration),
        (false, false) => source_duration,
    }
}

/// Nombre de timestamps `i / fps` strictement inférieurs à `window`.
///
/// # Example
/// ```
/// use am_app::batch::frame_count;
/// assert_eq!(frame_count(10.0, 15), 150);
/// assert_eq!(frame_count(0.25, 10), 3);
/// assert_eq!(frame_count(f64::NAN, 10), 0);
/// // 16.6 × 15 vaut 249.00000000000003 en flottant : 249 frames, pas 250.
/// assert_eq!(frame_count(16.6, 15), 249);
/// ```
#[must_use]
pub fn frame_count(window: f64, fps: u32) -> usize {
    if !window.is_finite() || window <= 0.0 {
        return 0;
    }
    let fps = f64::from(fps.max(1));
    let mut n = (window * fps).ceil() as usize;
    // Le produit arrondi peut tomber d'un côté ou de l'autre : on recale sur
    // la même division que les timestamps de la collecte.
    while n > 0 && (n - 1) as f64 / fps >= window {
        n -= 1;
    }
    while (n as f64 / fps) < window {
        n += 1;
    }
    n
}

/// Parcourt la source de `t = 0` par pas de `1 / fps` et passe chaque frame
/// dans le pipeline avec la même configuration.
///
/// `progress` reçoit `(t / fenêtre) · 0.5` après chaque frame ; `yield_now`
/// est appelé toutes les [`COLLECT_YIELD_EVERY`] frames.
///
/// # Errors
/// [`BatchError::NoFramesCollected`] si la fenêtre est vide,
/// [`BatchError::Source`] au premier seek ou traitement en échec.
pub fn collect_frames(
    source: &mut dyn FrameSource,
    compositor: &mut Compositor,
    config: &PipelineConfig,
    export_duration: f64,
    fps: u32,
    progress: &mut dyn FnMut(f32),
    yield_now: &mut dyn FnMut(),
) -> Result<Vec<AsciiFrame>, BatchError> {
    let fps = fps.max(1);
    let window = collection_window(export_duration, source.duration_secs(), fps);
    let count = frame_count(window, fps);
    if count == 0 {
        return Err(BatchError::NoFramesCollected);
    }
    log::info!("Collecte : {count} frames sur {window:.2}s @ {fps} fps");

    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        let t = i as f64 / f64::from(fps);
        let pixels = source
            .seek_and_capture(t, SEEK_TIMEOUT)
            .map_err(BatchError::Source)?;
        let frame = compositor
            .process(&pixels, config)
            .map_err(BatchError::Source)?;
        frames.push(frame);

        progress(((t / window) * 0.5) as f32);
        if frames.len().is_multiple_of(COLLECT_YIELD_EVERY) {
            yield_now();
        }
    }
    Ok(frames)
}

/// Sonde → collecte → export. Retourne le nombre de frames exportées.
///
/// La configuration est figée au démarrage : une modification des réglages
/// pendant l'export n'a pas d'effet sur lui.
///
/// # Errors
/// [`BatchError`] : format refusé par la sonde (avant toute collecte),
/// collecte vide ou en échec, encodage en échec.
pub fn run_export(
    source: &mut dyn FrameSource,
    compositor: &mut Compositor,
    settings: &EditorSettings,
    job: &ExportJob,
    progress: &mut dyn FnMut(f32),
    yield_now: &mut dyn FnMut(),
) -> Result<usize, BatchError> {
    am_export::probe(job.format, job.font.as_deref())?;

    let config = settings.pipeline_config();
    progress(0.0);
    let frames = collect_frames(
        source,
        compositor,
        &config,
        settings.export_duration,
        settings.export_fps,
        progress,
        yield_now,
    )?;

    let opts = ExportOptions::new(settings.export_fps, settings.color_enabled);
    am_export::export_frames(
        &frames,
        job.format,
        &job.out,
        &opts,
        job.font.as_deref(),
        &mut |p| progress(0.5 + p * 0.5),
    )?;
    Ok(frames.len())
}

/// Export sans interface : la progression est journalisée par paliers de 10 %.
///
/// # Errors
/// See [`run_export`].
pub fn run_headless(
    source: &mut dyn FrameSource,
    settings: &EditorSettings,
    job: &ExportJob,
) -> Result<usize, BatchError> {
    let mut compositor = Compositor::new();
    let mut last_step = -1i32;
    let mut log_progress = |p: f32| {
        let step = (p * 10.0).floor() as i32;
        if step > last_step {
            last_step = step;
            log::info!("Export {} : {:.0}%", job.format, p * 100.0);
        }
    };
    let n = run_export(source, &mut compositor, settings, job, &mut log_progress, &mut || {})?;
    log::info!("{n} frames exportées → {}", job.out.display());
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use am_core::frame::FrameBuffer;
    use am_source::ImageSource;

    /// Source de test : gris uniforme dont le niveau suit le temps.
    struct Ramp {
        duration: f64,
        seeks: Vec<f64>,
        fail_at: Option<usize>,
    }

    /// Comme un flux ffmpeg : aucune frame à `t >= durée`.
    struct Clip {
        duration: f64,
        seeks: Vec<f64>,
    }

    impl FrameSource for Clip {
        fn native_size(&self) -> (u32, u32) {
            (16, 8)
        }

        fn duration_secs(&self) -> f64 {
            self.duration
        }

        fn seek_and_capture(&mut self, t: f64, _timeout: Duration) -> anyhow::Result<FrameBuffer> {
            if t >= self.duration {
                anyhow::bail!("Aucune frame à {t:.3}s (fin du flux)");
            }
            self.seeks.push(t);
            Ok(FrameBuffer::new(16, 8))
        }
    }

    impl Ramp {
        fn new(duration: f64) -> Self {
            Self {
                duration,
                seeks: Vec::new(),
                fail_at: None,
            }
        }
    }

    impl FrameSource for Ramp {
        fn native_size(&self) -> (u32, u32) {
            (16, 8)
        }

        fn duration_secs(&self) -> f64 {
            self.duration
        }

        fn seek_and_capture(&mut self, t: f64, _timeout: Duration) -> anyhow::Result<FrameBuffer> {
            if self.fail_at == Some(self.seeks.len()) {
                return Err(am_core::CoreError::SeekTimeout {
                    at_secs: t,
                    timeout_ms: 5,
                }
                .into());
            }
            self.seeks.push(t);
            let mut fb = FrameBuffer::new(16, 8);
            let v = (t * 50.0) as u8;
            fb.fill((v, v, v));
            Ok(fb)
        }
    }

    fn config() -> PipelineConfig {
        EditorSettings {
            cols: 20,
            ..EditorSettings::default()
        }
        .pipeline_config()
    }

    fn collect(source: &mut dyn FrameSource, duration: f64, fps: u32) -> Result<Vec<AsciiFrame>, BatchError> {
        collect_frames(source, &mut Compositor::new(), &config(), duration, fps, &mut |_| {}, &mut || {})
    }

    #[test]
    fn frame_count_stays_strictly_inside_window() {
        assert_eq!(frame_count(16.6, 15), 249);
        assert_eq!(frame_count(2.2, 25), 55);
        for fps in [10, 12, 15, 24, 25, 30] {
            for k in 1..2000 {
                let window = f64::from(k) / 100.0;
                let n = frame_count(window, fps);
                let step = f64::from(fps);
                assert!((n - 1) as f64 / step < window, "{window}s @ {fps}");
                assert!(n as f64 / step >= window, "{window}s @ {fps}");
            }
        }
    }

    #[test]
    fn whole_clip_never_seeks_past_the_end() {
        let mut src = Clip {
            duration: 16.6,
            seeks: Vec::new(),
        };
        let frames = collect(&mut src, 0.0, 15).unwrap();
        assert_eq!(frames.len(), 249);
        assert!(src.seeks.last().is_some_and(|&t| t < 16.6));

        let mut src = Clip {
            duration: 2.2,
            seeks: Vec::new(),
        };
        assert_eq!(collect(&mut src, 0.0, 25).unwrap().len(), 55);
    }

    #[test]
    fn whole_video_when_duration_is_zero() {
        let mut src = Ramp::new(2.0);
        let frames = collect(&mut src, 0.0, 2).unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(src.seeks, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn export_duration_caps_the_window() {
        let mut src = Ramp::new(60.0);
        let frames = collect(&mut src, 1.0, 5).unwrap();
        assert_eq!(frames.len(), 5);
        assert!(src.seeks.iter().all(|&t| t < 1.0));
    }

    #[test]
    fn still_image_repeats_for_export_duration() {
        let mut src = ImageSource::from_frame(FrameBuffer::new(8, 8));
        assert_eq!(collect(&mut src, 1.0, 4).unwrap().len(), 4);
        assert_eq!(collect(&mut src, 0.0, 4).unwrap().len(), 1);
    }

    #[test]
    fn frames_follow_the_source_and_share_dimensions() {
        let mut src = Ramp::new(3.0);
        let frames = collect(&mut src, 0.0, 1).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.cols() == 20 && f.rows() == frames[0].rows()));
        // Gris croissant : le premier (noir) et le dernier diffèrent.
        assert_ne!(frames[0], frames[2]);
    }

    #[test]
    fn progress_covers_first_half_and_yields_every_three() {
        let mut src = Ramp::new(1.0);
        let mut seen = Vec::new();
        let mut yields = 0;
        let frames = collect_frames(
            &mut src,
            &mut Compositor::new(),
            &config(),
            0.0,
            10,
            &mut |p| seen.push(p),
            &mut || yields += 1,
        )
        .unwrap();
        assert_eq!(frames.len(), 10);
        assert_eq!(yields, 3);
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|&p| (0.0..0.5).contains(&p)));
    }

    #[test]
    fn empty_window_is_no_frames_collected() {
        let mut src = Ramp::new(f64::NAN);
        assert!(matches!(collect(&mut src, 0.0, 15), Err(BatchError::NoFramesCollected)));
        assert!(src.seeks.is_empty());
    }

    #[test]
    fn seek_failure_aborts_as_source_error() {
        let mut src = Ramp::new(2.0);
        src.fail_at = Some(2);
        let err = collect(&mut src, 0.0, 2).err();
        let Some(BatchError::Source(e)) = err else {
            panic!("erreur de source attendue");
        };
        assert!(matches!(
            e.downcast_ref::<am_core::CoreError>(),
            Some(am_core::CoreError::SeekTimeout { .. })
        ));
    }

    #[test]
    fn html_export_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob {
            format: ExportFormat::Html,
            out: dir.path().join("clip.html"),
            font: None,
        };
        let settings = EditorSettings {
            cols: 20,
            export_fps: 4,
            export_duration: 0.0,
            ..EditorSettings::default()
        };
        let mut src = Ramp::new(1.0);
        let mut last = 0.0;
        let n = run_export(
            &mut src,
            &mut Compositor::new(),
            &settings,
            &job,
            &mut |p| last = p,
            &mut || {},
        )
        .unwrap();
        assert_eq!(n, 4);
        assert!((last - 1.0).abs() < f32::EPSILON);
        let js = std::fs::read_to_string(dir.path().join("frames.js")).unwrap();
        assert!(js.starts_with("const fps = 4;"));
        assert_eq!(js.matches("`,\n").count(), 4);
    }

    #[test]
    fn headless_reports_no_frames_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob {
            format: ExportFormat::Html,
            out: dir.path().join("clip.html"),
            font: None,
        };
        let mut src = Ramp::new(-1.0);
        let err = run_headless(&mut src, &EditorSettings::default(), &job).err();
        assert!(matches!(err, Some(BatchError::NoFramesCollected)));
        assert!(!job.out.exists());
    }

    #[test]
    fn unsupported_format_is_refused_before_collection() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob {
            format: ExportFormat::Gif,
            out: dir.path().join("clip.gif"),
            font: Some(dir.path().join("missing.ttf")),
        };
        let mut src = Ramp::new(1.0);
        let err = run_headless(&mut src, &EditorSettings::default(), &job).err();
        assert!(matches!(err, Some(BatchError::Export(ExportError::FontUnavailable))));
        assert!(src.seeks.is_empty());
    }
}
