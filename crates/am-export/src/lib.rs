//! Export encoders for ascii-mation: GIF, WebM, MP4 and a standalone HTML player.
//!
//! Raster formats render each [`AsciiFrame`] with [`rasterizer::Rasterizer`];
//! WebM and MP4 are piped into an `ffmpeg` process. Every export goes through
//! [`export_frames`], which writes to a temporary path and renames on success.
pub mod error;
pub mod gif;
pub mod html;
pub mod muxer;
pub mod rasterizer;

use std::fmt;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use am_core::frame::AsciiFrame;

pub use error::ExportError;

/// DejaVu Sans Mono, embarquée pour les tests raster (licence à côté du fichier).
#[cfg(test)]
pub(crate) const TEST_FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSansMono.ttf");
use muxer::{FfmpegMuxer, VideoCodec};
use rasterizer::Rasterizer;

/// Polices monospace cherchées quand `--font` n'est pas fourni.
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansMono-Regular.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/Library/Fonts/Courier New.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
];

/// Formats d'export disponibles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Gif,
    Webm,
    Mp4,
    Html,
}

impl ExportFormat {
    pub const ALL: [Self; 4] = [Self::Gif, Self::Webm, Self::Mp4, Self::Html];

    /// Extension de fichier canonique.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Html => "html",
        }
    }

    /// Déduit le format depuis l'extension d'un chemin (insensible à la casse).
    ///
    /// # Example
    /// ```
    /// use am_export::ExportFormat;
    /// use std::path::Path;
    /// assert_eq!(ExportFormat::from_path(Path::new("out/clip.GIF")), Some(ExportFormat::Gif));
    /// assert_eq!(ExportFormat::from_path(Path::new("clip")), None);
    /// ```
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }

    fn needs_font(self) -> bool {
        !matches!(self, Self::Html)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gif => "GIF",
            Self::Webm => "WebM",
            Self::Mp4 => "MP4",
            Self::Html => "HTML",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gif" => Ok(Self::Gif),
            "webm" => Ok(Self::Webm),
            "mp4" => Ok(Self::Mp4),
            "html" | "htm" => Ok(Self::Html),
            other => Err(format!("format d'export inconnu : {other}")),
        }
    }
}

/// Paramètres d'un export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub fps: u32,
    pub color_enabled: bool,
    /// Taille raster forcée ; `None` = taille par défaut du format.
    pub size: Option<(u32, u32)>,
}

impl ExportOptions {
    #[must_use]
    pub fn new(fps: u32, color_enabled: bool) -> Self {
        Self {
            fps,
            color_enabled,
            size: None,
        }
    }
}

/// Taille raster par défaut pour une grille `cols × rows`.
///
/// GIF : `min(cols·8, 1200) × min(rows·8, 900)`. Vidéo : `min(cols·8, 1920) ×
/// min(rows·8, 1080)`, arrondi au pair inférieur (exigence yuv420p).
///
/// # Example
/// ```
/// use am_export::{ExportFormat, raster_size};
/// assert_eq!(raster_size(ExportFormat::Gif, 120, 37), (960, 296));
/// assert_eq!(raster_size(ExportFormat::Mp4, 400, 123), (1920, 984));
/// ```
#[must_use]
pub fn raster_size(format: ExportFormat, cols: usize, rows: usize) -> (u32, u32) {
    let w = u32::try_from(cols.saturating_mul(8)).unwrap_or(u32::MAX);
    let h = u32::try_from(rows.saturating_mul(8)).unwrap_or(u32::MAX);
    match format {
        ExportFormat::Gif | ExportFormat::Html => (w.clamp(1, 1200), h.clamp(1, 900)),
        ExportFormat::Webm | ExportFormat::Mp4 => (even(w.min(1920)), even(h.min(1080))),
    }
}

fn even(v: u32) -> u32 {
    (v & !1).max(2)
}

/// Cherche une police monospace : `explicit` s'il existe, sinon les emplacements connus.
#[must_use]
pub fn find_font(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        log::warn!("Police introuvable : {}", path.display());
        return None;
    }
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Décide si `format` est exportable avec ces capacités. Pure, sans I/O.
///
/// # Errors
/// [`ExportError::FontUnavailable`] ou [`ExportError::Unsupported`].
pub fn check_support(
    format: ExportFormat,
    font_available: bool,
    encoders: &[String],
) -> Result<Option<VideoCodec>, ExportError> {
    if format.needs_font() && !font_available {
        return Err(ExportError::FontUnavailable);
    }
    let has = |name: &str| encoders.iter().any(|e| e == name);
    let codec = match format {
        ExportFormat::Gif | ExportFormat::Html => return Ok(None),
        ExportFormat::Mp4 if has("libx264") => VideoCodec::H264,
        ExportFormat::Webm if has("libvpx-vp9") => VideoCodec::Vp9,
        ExportFormat::Webm if has("libvpx") => VideoCodec::Vp8,
        ExportFormat::Mp4 | ExportFormat::Webm => {
            let reason = if encoders.is_empty() {
                "ffmpeg introuvable".to_string()
            } else {
                let wanted = if format == ExportFormat::Mp4 {
                    "libx264"
                } else {
                    "libvpx-vp9 / libvpx"
                };
                format!("encodeur {wanted} absent de ffmpeg")
            };
            return Err(ExportError::Unsupported { format, reason });
        }
    };
    Ok(Some(codec))
}

/// Sonde de capacités : à appeler avant de lancer un export.
///
/// HTML est toujours disponible ; GIF exige une police ; MP4/WebM exigent en
/// plus un `ffmpeg` exposant l'encodeur voulu.
///
/// # Errors
/// Voir [`check_support`].
pub fn probe(format: ExportFormat, font: Option<&Path>) -> Result<Option<VideoCodec>, ExportError> {
    let font_available = !format.needs_font() || find_font(font).is_some();
    let encoders = match format {
        ExportFormat::Mp4 | ExportFormat::Webm => muxer::available_encoders(),
        ExportFormat::Gif | ExportFormat::Html => Vec::new(),
    };
    check_support(format, font_available, &encoders)
}

/// Chemin temporaire voisin de `out` ; renommé en `out` seulement en cas de succès.
#[must_use]
pub fn partial_path(out: &Path) -> PathBuf {
    let mut name = out.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    out.with_file_name(name)
}

/// Exporte `frames` vers `out`.
///
/// `progress` reçoit l'avancement de l'encodage dans `[0, 1]`. Une séquence
/// vide est rejetée avant toute sonde ou écriture. En cas d'échec, aucun
/// fichier partiel ne subsiste.
///
/// Pour HTML, `out` reçoit la page et `frames.js` est écrit à côté.
///
/// # Errors
/// [`ExportError`] : séquence vide, capacité manquante, échec d'encodage ou d'I/O.
pub fn export_frames(
    frames: &[AsciiFrame],
    format: ExportFormat,
    out: &Path,
    opts: &ExportOptions,
    font: Option<&Path>,
    progress: &mut dyn FnMut(f32),
) -> Result<(), ExportError> {
    let Some(first) = frames.first() else {
        return Err(ExportError::NoFrames);
    };
    let codec = probe(format, font)?;
    log::info!(
        "Export {format} : {} frames @ {} fps → {}",
        frames.len(),
        opts.fps,
        out.display()
    );

    let result = match format {
        ExportFormat::Html => export_html(frames, out, opts.fps, progress),
        ExportFormat::Gif | ExportFormat::Webm | ExportFormat::Mp4 => {
            let font_path = find_font(font).ok_or(ExportError::FontUnavailable)?;
            let mut raster = Rasterizer::from_path(&font_path)?;
            let size = opts
                .size
                .unwrap_or_else(|| raster_size(format, first.cols(), first.rows()));
            let tmp = partial_path(out);
            let encoded = match codec {
                Some(codec) => encode_video(frames, &tmp, codec, &mut raster, opts, size, progress),
                None => fs::File::create(&tmp).map_err(ExportError::from).and_then(|file| {
                    gif::write_gif(
                        BufWriter::new(file),
                        frames,
                        &mut raster,
                        opts.fps,
                        opts.color_enabled,
                        size,
                        progress,
                    )
                }),
            };
            commit(&tmp, out, encoded)
        }
    };

    match &result {
        Ok(()) => log::info!("Export terminé : {}", out.display()),
        Err(e) => log::error!("Export {format} échoué : {e}"),
    }
    result
}

fn encode_video(
    frames: &[AsciiFrame],
    tmp: &Path,
    codec: VideoCodec,
    raster: &mut Rasterizer,
    opts: &ExportOptions,
    size: (u32, u32),
    progress: &mut dyn FnMut(f32),
) -> Result<(), ExportError> {
    let size = (even(size.0), even(size.1));
    let mut muxer = FfmpegMuxer::new(tmp, codec, size, opts.fps)?;
    let mut canvas = image::RgbaImage::new(size.0, size.1);
    for (i, frame) in frames.iter().enumerate() {
        raster.render_into(frame, opts.color_enabled, &mut canvas);
        muxer.write_frame(canvas.as_raw())?;
        progress((i + 1) as f32 / frames.len() as f32);
    }
    muxer.finish()
}

fn export_html(
    frames: &[AsciiFrame],
    out: &Path,
    fps: u32,
    progress: &mut dyn FnMut(f32),
) -> Result<(), ExportError> {
    let js_path = out.with_file_name(html::FRAMES_JS);
    let js_tmp = partial_path(&js_path);
    let page_tmp = partial_path(out);

    let written = fs::write(&js_tmp, html::build_frames_js(frames, fps))
        .and_then(|()| fs::write(&page_tmp, html::build_animation_html()))
        .map_err(ExportError::from);
    if let Err(e) = written {
        let _ = fs::remove_file(&js_tmp);
        let _ = fs::remove_file(&page_tmp);
        return Err(e);
    }
    progress(0.5);
    if let Err(e) = commit(&js_tmp, &js_path, Ok(())) {
        let _ = fs::remove_file(&page_tmp);
        return Err(e);
    }
    commit(&page_tmp, out, Ok(()))?;
    progress(1.0);
    Ok(())
}

/// Renomme `tmp` en `out` si l'encodage a réussi ; supprime `tmp` sinon.
fn commit(tmp: &Path, out: &Path, encoded: Result<(), ExportError>) -> Result<(), ExportError> {
    let renamed = encoded.and_then(|()| fs::rename(tmp, out).map_err(ExportError::from));
    if renamed.is_err()
        && tmp.exists()
        && let Err(e) = fs::remove_file(tmp)
    {
        log::warn!("Suppression de {} impossible : {e}", tmp.display());
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use am_core::frame::ColorGrid;

    fn frame(text: &str) -> AsciiFrame {
        let cols = text.chars().count();
        AsciiFrame::new(vec![text.to_string()], ColorGrid::new(cols, 1))
    }

    #[test]
    fn format_parsing() {
        for f in ExportFormat::ALL {
            assert_eq!(f.extension().parse::<ExportFormat>(), Ok(f));
        }
        assert!("avi".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Webm.to_string(), "WebM");
    }

    #[test]
    fn gif_size_is_capped() {
        assert_eq!(raster_size(ExportFormat::Gif, 400, 200), (1200, 900));
        assert_eq!(raster_size(ExportFormat::Gif, 20, 7), (160, 56));
    }

    #[test]
    fn video_size_is_even() {
        assert_eq!(raster_size(ExportFormat::Webm, 121, 37), (968, 296));
        assert_eq!(raster_size(ExportFormat::Mp4, 300, 200), (1920, 1080));
        let (w, h) = raster_size(ExportFormat::Mp4, 1, 1);
        assert_eq!((w % 2, h % 2), (0, 0));
    }

    #[test]
    fn html_never_needs_anything() {
        assert!(matches!(check_support(ExportFormat::Html, false, &[]), Ok(None)));
    }

    #[test]
    fn raster_formats_need_a_font() {
        for f in [ExportFormat::Gif, ExportFormat::Mp4, ExportFormat::Webm] {
            assert!(matches!(
                check_support(f, false, &["libx264".into()]),
                Err(ExportError::FontUnavailable)
            ));
        }
        assert!(matches!(check_support(ExportFormat::Gif, true, &[]), Ok(None)));
    }

    #[test]
    fn video_formats_pick_an_encoder() {
        let all: Vec<String> = ["libx264", "libvpx", "libvpx-vp9"].map(String::from).to_vec();
        assert!(matches!(
            check_support(ExportFormat::Mp4, true, &all),
            Ok(Some(VideoCodec::H264))
        ));
        assert!(matches!(
            check_support(ExportFormat::Webm, true, &all),
            Ok(Some(VideoCodec::Vp9))
        ));
        assert!(matches!(
            check_support(ExportFormat::Webm, true, &["libvpx".into()]),
            Ok(Some(VideoCodec::Vp8))
        ));
        assert!(matches!(
            check_support(ExportFormat::Mp4, true, &["libvpx".into()]),
            Err(ExportError::Unsupported { format: ExportFormat::Mp4, .. })
        ));
        assert!(matches!(
            check_support(ExportFormat::Webm, true, &[]),
            Err(ExportError::Unsupported { .. })
        ));
    }

    #[test]
    fn zero_frames_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        for format in ExportFormat::ALL {
            let out = dir.path().join(format!("clip.{}", format.extension()));
            let err = export_frames(&[], format, &out, &ExportOptions::new(15, false), None, &mut |_| {});
            assert!(matches!(err, Err(ExportError::NoFrames)));
            assert!(!out.exists());
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn html_export_writes_page_and_script() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("player.html");
        let mut seen = Vec::new();
        export_frames(
            &[frame("@ "), frame(" @")],
            ExportFormat::Html,
            &out,
            &ExportOptions::new(10, false),
            None,
            &mut |p| seen.push(p),
        )
        .unwrap();

        let js = fs::read_to_string(dir.path().join("frames.js")).unwrap();
        assert!(js.starts_with("const fps = 10;\n"));
        assert!(js.contains("`@ `,\n` @`,\n"));
        assert!(fs::read_to_string(&out).unwrap().contains("frames.js"));
        assert_eq!(seen.last().copied(), Some(1.0));
        // Aucun fichier temporaire ne reste.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn gif_export_with_bundled_font() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clip.gif");
        let font = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSansMono.ttf"));
        export_frames(
            &[frame("@ "), frame(" @"), frame("@@")],
            ExportFormat::Gif,
            &out,
            &ExportOptions::new(12, false),
            Some(font),
            &mut |_| {},
        )
        .unwrap();
        let bytes = fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        assert!(!partial_path(&out).exists());
    }

    #[test]
    fn failed_encode_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clip.gif");
        let tmp = partial_path(&out);
        fs::write(&tmp, b"half").unwrap();
        let res = commit(&tmp, &out, Err(ExportError::Encoder("boom".into())));
        assert!(matches!(res, Err(ExportError::Encoder(_))));
        assert!(!tmp.exists());
        assert!(!out.exists());
    }

    #[test]
    fn partial_path_keeps_directory() {
        assert_eq!(
            partial_path(Path::new("/tmp/out/a.gif")),
            PathBuf::from("/tmp/out/a.gif.part")
        );
    }

    #[test]
    fn explicit_missing_font_is_none() {
        assert!(find_font(Some(Path::new("/nope/font.ttf"))).is_none());
    }
}
