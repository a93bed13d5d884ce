// Décodage vidéo par subprocess ffmpeg (std::process::Command), aucune lib C liée.
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
// Architecture :
//   - `probe_video`       : interroge ffprobe (dimensions, fps, durée), timeout 15 s
//   - `spawn_ffmpeg_pipe` : lance ffmpeg → flux raw RGBA sur stdout
//   - `VideoSource::spawn_playback` : thread de lecture en boucle, piloté par commandes
//   - `VideoSource::seek_and_capture` : une frame à un instant donné, avec timeout

use anyhow::{Context, Result};
use flume::{Receiver, RecvTimeoutError, Sender};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use am_core::error::CoreError;
use am_core::frame::FrameBuffer;
use am_core::traits::FrameSource;

/// Délai maximal de chargement d'une vidéo (lecture des métadonnées).
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Largeur maximale décodée : la grille ASCII ne dépasse jamais quelques
/// centaines de colonnes.
pub const MAX_DECODE_WIDTH: u32 = 640;

/// Taille du pool de frames pré-allouées.
/// Doit être > capacité du canal (3) pour garantir un slot libre sans allocation.
const POOL_SIZE: usize = 6;

/// Capacité du canal de frames de lecture.
const FRAME_CHANNEL_CAP: usize = 3;

/// Commandes interactives pour le thread de lecture.
///
/// # Example
/// ```
/// use am_source::video::VideoCommand;
/// let cmd = VideoCommand::Seek(5.0);
/// assert!(matches!(cmd, VideoCommand::Seek(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoCommand {
    /// Reprendre la lecture.
    Play,
    /// Mettre en pause.
    Pause,
    /// Sauter de `delta` secondes (positif = avance, négatif = recul).
    Seek(f64),
    /// Arrêter le thread proprement.
    Quit,
}

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0, 60.0).
    pub fps: f64,
    /// Durée en secondes, 0 si inconnue.
    pub duration: f64,
}

impl VideoInfo {
    /// Dimensions de décodage : largeur bornée à [`MAX_DECODE_WIDTH`],
    /// rapport d'aspect conservé.
    ///
    /// # Example
    /// ```
    /// use am_source::video::VideoInfo;
    /// let info = VideoInfo { width: 1920, height: 1080, fps: 24.0, duration: 10.0 };
    /// assert_eq!(info.decode_size(), (640, 360));
    /// ```
    #[must_use]
    pub fn decode_size(&self) -> (u32, u32) {
        let w = self.width.clamp(1, MAX_DECODE_WIDTH);
        let h = (f64::from(self.height) * f64::from(w) / f64::from(self.width.max(1))).round();
        (w, (h as u32).max(1))
    }
}

/// Parse la sortie `key=value` de ffprobe.
fn parse_probe_output(text: &str) -> VideoInfo {
    let mut info = VideoInfo {
        width: 0,
        height: 0,
        fps: 30.0,
        duration: 0.0,
    };

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            info.width = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("height=") {
            info.height = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(30.0);
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            if den > 0.0 && num > 0.0 {
                info.fps = num / den;
            }
        } else if let Some(val) = line.strip_prefix("duration=") {
            // "N/A" pour certains flux
            if let Ok(d) = val.trim().parse::<f64>()
                && d.is_finite()
                && d > info.duration
            {
                info.duration = d;
            }
        }
    }
    info
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Retourne une erreur si le fichier est introuvable, si `ffprobe` est
/// absent, ne répond pas dans [`LOAD_TIMEOUT`], ou ne trouve aucun flux vidéo.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let mut child = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate:format=duration",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    let mut stdout = child.stdout.take().context("stdout ffprobe indisponible")?;
    let (tx, rx) = flume::bounded(1);
    thread::spawn(move || {
        let mut text = String::new();
        let res = stdout.read_to_string(&mut text).map(|_| text);
        let _ = tx.send(res);
    });

    let text = match rx.recv_timeout(LOAD_TIMEOUT) {
        Ok(res) => res.context("Lecture de la sortie ffprobe")?,
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!(
                "Chargement de {} expiré après {} s",
                path.display(),
                LOAD_TIMEOUT.as_secs()
            );
        }
    };
    let _ = child.wait();

    let info = parse_probe_output(&text);
    if info.width == 0 || info.height == 0 {
        anyhow::bail!(
            "ffprobe n'a trouvé aucun flux vidéo dans {}",
            path.display()
        );
    }

    log::info!(
        "Vidéo : {}x{} @ {:.3}fps, {:.1}s : {}",
        info.width,
        info.height,
        info.fps,
        info.duration,
        path.display()
    );
    Ok(info)
}

/// Lance un processus `ffmpeg` qui écrit des frames RGBA brutes sur stdout.
///
/// Chaque frame = `w × h × 4` bytes (RGBA row-major, sans padding).
/// `-ss` avant `-i` = seek rapide. `max_frames` limite la sortie
/// (`Some(1)` pour une capture).
///
/// Retourne `None` si le spawn échoue (log::warn émis).
#[must_use]
pub fn spawn_ffmpeg_pipe(
    path: &Path,
    (w, h): (u32, u32),
    pos_secs: f64,
    target_fps: u32,
    max_frames: Option<u32>,
) -> Option<Child> {
    let Some(path_str) = path.to_str() else {
        log::warn!("spawn_ffmpeg_pipe: chemin non-UTF8");
        return None;
    };

    let scale_filter = format!("scale={w}:{h}:flags=bilinear");
    let fps_str = target_fps.to_string();
    let pos_str = format!("{pos_secs:.3}");

    let mut cmd = Command::new("ffmpeg");
    cmd.args([
        "-ss",
        &pos_str,
        "-i",
        path_str,
        "-vf",
        &scale_filter,
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-r",
        &fps_str,
        "-an",
        "-hide_banner",
        "-loglevel",
        "error",
    ]);
    if let Some(n) = max_frames {
        cmd.args(["-frames:v", &n.to_string()]);
    }
    cmd.arg("pipe:1");

    match cmd
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            log::debug!("ffmpeg spawné: {w}x{h} @ {target_fps}fps depuis {pos_secs:.1}s");
            Some(child)
        }
        Err(e) => {
            log::warn!("spawn_ffmpeg_pipe: impossible de lancer ffmpeg: {e}");
            None
        }
    }
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// # Errors
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion,
/// `Err` sur erreur I/O fatale.
///
/// # Example
/// ```
/// use am_source::video::read_exact_or_eof;
/// let mut buf = [0u8; 4];
/// assert!(read_exact_or_eof(&mut &b"abcdef"[..], &mut buf).unwrap());
/// assert!(!read_exact_or_eof(&mut &b"ab"[..], &mut buf).unwrap());
/// ```
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Source vidéo fichier. Les frames sont décodées à [`VideoInfo::decode_size`].
pub struct VideoSource {
    path: PathBuf,
    info: VideoInfo,
}

impl VideoSource {
    /// Ouvre et sonde une vidéo.
    ///
    /// # Errors
    /// See [`probe_video`].
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe_video(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    /// Métadonnées sondées.
    #[must_use]
    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Chemin du fichier.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Démarre la lecture en boucle sur un thread dédié.
    ///
    /// # Errors
    /// Retourne une erreur si le thread ne peut pas être créé.
    pub fn spawn_playback(&self) -> Result<Playback> {
        let (frame_tx, frames) = flume::bounded(FRAME_CHANNEL_CAP);
        let (commands, cmd_rx) = flume::unbounded();
        let position = Arc::new(AtomicU64::new(0f64.to_bits()));
        let paused = Arc::new(AtomicBool::new(false));

        let ctx = PlaybackCtx {
            path: self.path.clone(),
            info: self.info,
            position: Arc::clone(&position),
            paused: Arc::clone(&paused),
        };
        let handle = thread::Builder::new()
            .name("am-video".to_string())
            .spawn(move || playback_loop(&ctx, &frame_tx, &cmd_rx))
            .context("Impossible de spawner le thread vidéo")?;

        Ok(Playback {
            frames,
            commands,
            position,
            paused,
            handle: Some(handle),
        })
    }
}

impl FrameSource for VideoSource {
    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn duration_secs(&self) -> f64 {
        self.info.duration
    }

    /// Capture une frame par un ffmpeg éphémère (`-ss t -frames:v 1`).
    ///
    /// Le processus est tué si la frame n'arrive pas dans `timeout`.
    fn seek_and_capture(&mut self, t: f64, timeout: Duration) -> Result<FrameBuffer> {
        let (w, h) = self.info.decode_size();
        let fps = self.info.fps.clamp(1.0, 120.0).round() as u32;
        let mut child = spawn_ffmpeg_pipe(&self.path, (w, h), t.max(0.0), fps, Some(1))
            .context("ffmpeg indisponible")?;
        let mut stdout = child.stdout.take().context("stdout ffmpeg indisponible")?;

        let (tx, rx) = flume::bounded(1);
        thread::spawn(move || {
            let mut fb = FrameBuffer::new(w, h);
            let res = read_exact_or_eof(&mut stdout, &mut fb.data).map(|full| full.then_some(fb));
            let _ = tx.send(res);
        });

        let outcome = rx.recv_timeout(timeout);
        if outcome.is_err() {
            let _ = child.kill();
        }
        let _ = child.wait();

        match outcome {
            Ok(Ok(Some(fb))) => Ok(fb),
            Ok(Ok(None)) => anyhow::bail!("Aucune frame à {t:.3}s (fin du flux)"),
            Ok(Err(e)) => Err(e.context(format!("Lecture de la frame à {t:.3}s"))),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                Err(CoreError::SeekTimeout {
                    at_secs: t,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
                .into())
            }
        }
    }
}

/// Poignée de lecture : frames entrantes + canal de commandes.
///
/// Envoie `Quit` et rejoint le thread au drop.
pub struct Playback {
    /// Frames décodées, cadencées au fps de la vidéo.
    pub frames: Receiver<Arc<FrameBuffer>>,
    /// Commandes Play/Pause/Seek/Quit.
    pub commands: Sender<VideoCommand>,
    position: Arc<AtomicU64>,
    paused: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Playback {
    /// Position de lecture courante en secondes.
    #[must_use]
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    /// `true` si la lecture est en pause.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Envoie une commande (ignorée si le thread est terminé).
    pub fn send(&self, cmd: VideoCommand) {
        if self.commands.send(cmd).is_err() {
            log::debug!("Thread vidéo terminé, commande {cmd:?} ignorée");
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        let _ = self.commands.send(VideoCommand::Quit);
        // Débloque un éventuel send() en attente côté thread.
        while self.frames.try_recv().is_ok() {}
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Données partagées avec le thread de lecture.
struct PlaybackCtx {
    path: PathBuf,
    info: VideoInfo,
    position: Arc<AtomicU64>,
    paused: Arc<AtomicBool>,
}

/// État mutable centralisé du thread de lecture.
struct PlaybackState {
    w: u32,
    h: u32,
    pos_secs: f64,
    is_paused: bool,
    target_fps: u32,
    /// Pool pré-alloué de frames réutilisables (zero-alloc en hot path).
    pool: Vec<Arc<FrameBuffer>>,
}

impl PlaybackState {
    fn new(info: &VideoInfo) -> Self {
        let (w, h) = info.decode_size();
        let target_fps = info.fps.clamp(1.0, 60.0).round() as u32;
        let pool = (0..POOL_SIZE)
            .map(|_| Arc::new(FrameBuffer::new(w, h)))
            .collect();
        Self {
            w,
            h,
            pos_secs: 0.0,
            is_paused: false,
            target_fps,
            pool,
        }
    }

    fn restart(&self, path: &Path) -> Option<Child> {
        spawn_ffmpeg_pipe(path, (self.w, self.h), self.pos_secs, self.target_fps, None)
    }
}

fn kill(child: &mut Option<Child>) {
    if let Some(mut c) = child.take() {
        let _ = c.kill();
        let _ = c.wait();
    }
}

/// Retourne `true` si le thread doit quitter (Quit reçu ou canal déconnecté).
/// Redémarre ffmpeg si un Seek est reçu.
fn process_commands(
    cmd_rx: &Receiver<VideoCommand>,
    state: &mut PlaybackState,
    child: &mut Option<Child>,
    ctx: &PlaybackCtx,
) -> bool {
    let mut need_restart = false;
    loop {
        match cmd_rx.try_recv() {
            Ok(VideoCommand::Quit) | Err(flume::TryRecvError::Disconnected) => {
                kill(child);
                log::info!("Thread vidéo: arrêt demandé.");
                return true;
            }
            Ok(VideoCommand::Pause) => state.is_paused = true,
            Ok(VideoCommand::Play) => state.is_paused = false,
            Ok(VideoCommand::Seek(delta)) => {
                let mut target = (state.pos_secs + delta).max(0.0);
                if ctx.info.duration > 0.0 && target >= ctx.info.duration {
                    target = (ctx.info.duration - 0.1).max(0.0);
                }
                state.pos_secs = target;
                need_restart = true;
                log::debug!("Thread vidéo: Seek -> {:.1}s", state.pos_secs);
            }
            Err(flume::TryRecvError::Empty) => break,
        }
    }
    ctx.paused.store(state.is_paused, Ordering::Relaxed);
    if need_restart {
        kill(child);
        *child = state.restart(&ctx.path);
        ctx.position
            .store(state.pos_secs.to_bits(), Ordering::Relaxed);
    }
    false
}

/// Trouve ou crée un slot libre dans le pool.
///
/// Invariant : retourne un index `i` tel que `Arc::strong_count(&pool[i]) == 1`.
fn find_or_create_slot(pool: &mut Vec<Arc<FrameBuffer>>, w: u32, h: u32) -> usize {
    if let Some(i) = pool.iter().position(|a| Arc::strong_count(a) == 1) {
        i
    } else {
        pool.push(Arc::new(FrameBuffer::new(w, h)));
        pool.len() - 1
    }
}

/// Boucle principale du thread de lecture. Reboucle au début sur EOF.
fn playback_loop(
    ctx: &PlaybackCtx,
    frame_tx: &Sender<Arc<FrameBuffer>>,
    cmd_rx: &Receiver<VideoCommand>,
) {
    let mut state = PlaybackState::new(&ctx.info);
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(state.target_fps));
    let mut child = state.restart(&ctx.path);
    let mut last_frame = Instant::now();

    loop {
        if process_commands(cmd_rx, &mut state, &mut child, ctx) {
            return;
        }

        if state.is_paused {
            thread::sleep(Duration::from_millis(10));
            continue;
        }

        let elapsed = last_frame.elapsed();
        if let Some(remaining) = frame_period.checked_sub(elapsed) {
            thread::sleep(remaining.min(Duration::from_millis(10)));
            continue;
        }
        last_frame = Instant::now();

        let idx = find_or_create_slot(&mut state.pool, state.w, state.h);
        let Some(fb) = Arc::get_mut(&mut state.pool[idx]) else {
            continue;
        };

        let read_result = child
            .as_mut()
            .and_then(|c| c.stdout.as_mut())
            .map_or(Ok(false), |stdout| read_exact_or_eof(stdout, &mut fb.data));

        match read_result {
            Ok(true) => {
                // try_send : une frame en retard est jetée, le live n'attend pas.
                match frame_tx.try_send(Arc::clone(&state.pool[idx])) {
                    Ok(()) | Err(flume::TrySendError::Full(_)) => {}
                    Err(flume::TrySendError::Disconnected(_)) => {
                        kill(&mut child);
                        return;
                    }
                }
                state.pos_secs += 1.0 / f64::from(state.target_fps);
                ctx.position
                    .store(state.pos_secs.to_bits(), Ordering::Relaxed);
            }
            Ok(false) => {
                log::debug!("Thread vidéo: EOF à {:.1}s, reprise au début.", state.pos_secs);
                kill(&mut child);
                state.pos_secs = 0.0;
                ctx.position.store(0f64.to_bits(), Ordering::Relaxed);
                child = state.restart(&ctx.path);
                if child.is_none() {
                    // ffmpeg indisponible : inutile de boucler à vide.
                    thread::sleep(Duration::from_millis(500));
                }
            }
            Err(e) => {
                log::warn!("Thread vidéo: erreur lecture pipe: {e}");
                kill(&mut child);
                thread::sleep(Duration::from_millis(100));
                child = state.restart(&ctx.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_is_parsed() {
        let text = "width=1280\nheight=720\nr_frame_rate=30000/1001\nduration=12.5\n";
        let info = parse_probe_output(text);
        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!((info.duration - 12.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_duration_is_zero() {
        let info = parse_probe_output("width=2\nheight=2\nr_frame_rate=0/0\nduration=N/A\n");
        assert!(info.duration.abs() < f64::EPSILON);
        assert!((info.fps - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_size_keeps_aspect_and_small_sources() {
        let portrait = VideoInfo {
            width: 1080,
            height: 1920,
            fps: 30.0,
            duration: 1.0,
        };
        assert_eq!(portrait.decode_size(), (640, 1138));
        let small = VideoInfo {
            width: 320,
            height: 240,
            ..portrait
        };
        assert_eq!(small.decode_size(), (320, 240));
    }

    #[test]
    fn missing_video_is_file_not_found() {
        let err = probe_video(Path::new("/no/such/clip.mp4")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::FileNotFound { .. })
        ));
    }

    #[test]
    fn pool_reuses_free_slots() {
        let mut pool: Vec<Arc<FrameBuffer>> =
            (0..2).map(|_| Arc::new(FrameBuffer::new(1, 1))).collect();
        let held = Arc::clone(&pool[0]);
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 1);
        let held2 = Arc::clone(&pool[1]);
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 2);
        drop((held, held2));
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 0);
    }
}
