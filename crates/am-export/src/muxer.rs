use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::ExportError;

/// Débit cible des exports vidéo.
pub const VIDEO_BITRATE: &str = "8M";

/// Codec vidéo effectivement utilisé, choisi par la sonde de capacités.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264 (`libx264`) dans un conteneur MP4.
    H264,
    /// VP9 (`libvpx-vp9`) dans un conteneur WebM.
    Vp9,
    /// VP8 (`libvpx`) dans un conteneur WebM, repli quand VP9 manque.
    Vp8,
}

impl VideoCodec {
    /// Nom de l'encodeur ffmpeg.
    #[must_use]
    pub fn encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
        }
    }

    /// Nom du muxer ffmpeg (`-f`), indépendant de l'extension du fichier temporaire.
    #[must_use]
    pub fn container(self) -> &'static str {
        match self {
            Self::H264 => "mp4",
            Self::Vp9 | Self::Vp8 => "webm",
        }
    }

    fn output_args(self) -> Vec<&'static str> {
        let mut args = vec!["-c:v", self.encoder(), "-b:v", VIDEO_BITRATE];
        match self {
            // yuv420p : lisible par tous les lecteurs.
            Self::H264 => args.extend(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]),
            Self::Vp9 | Self::Vp8 => args.extend(["-pix_fmt", "yuv420p"]),
        }
        args.extend(["-f", self.container()]);
        args
    }
}

/// Encode des frames RGBA brutes via un process ffmpeg alimenté sur stdin.
///
/// Au drop sans [`FfmpegMuxer::finish`], le process est tué et attendu.
pub struct FfmpegMuxer {
    ffmpeg_child: Child,
    frame_len: usize,
    /// stderr lu en continu : un encodeur bavard ne bloque pas `write_all`.
    stderr_reader: Option<JoinHandle<String>>,
    finished: bool,
}

impl FfmpegMuxer {
    /// Démarre ffmpeg pour une vidéo `width × height` à `fps` images/s.
    ///
    /// # Errors
    /// [`ExportError::Encoder`] si ffmpeg n'est pas installé ou impossible à démarrer.
    pub fn new(
        output_path: &Path,
        codec: VideoCodec,
        (width, height): (u32, u32),
        fps: u32,
    ) -> Result<Self, ExportError> {
        let mut command = Command::new("ffmpeg");
        command
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-r", &fps.max(1).to_string()])
            .args(["-i", "-"])
            .args(codec.output_args())
            .arg(output_path);

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Encoder(format!("Démarrage de ffmpeg impossible ({e}). Est-il dans PATH ?")))?;

        let stderr_reader = child.stderr.take().map(spawn_stderr_reader);

        log::info!(
            "Encodeur {} démarré : {width}x{height} @ {fps} fps → {}",
            codec.encoder(),
            output_path.display()
        );
        Ok(Self {
            ffmpeg_child: child,
            frame_len: width as usize * height as usize * 4,
            stderr_reader,
            finished: false,
        })
    }

    /// Pousse une frame RGBA dans le flux.
    ///
    /// # Errors
    /// [`ExportError::Encoder`] si la taille ne correspond pas ou si le pipe est fermé.
    pub fn write_frame(&mut self, rgba: &[u8]) -> Result<(), ExportError> {
        if rgba.len() != self.frame_len {
            return Err(ExportError::Encoder(format!(
                "frame de {} octets, {} attendus",
                rgba.len(),
                self.frame_len
            )));
        }
        let stdin = self
            .ffmpeg_child
            .stdin
            .as_mut()
            .ok_or_else(|| ExportError::Encoder("stdin de ffmpeg fermé".into()))?;
        stdin
            .write_all(rgba)
            .map_err(|e| ExportError::Encoder(format!("écriture vers ffmpeg : {e}")))
    }

    /// Ferme le flux et attend la fin de l'encodage.
    ///
    /// # Errors
    /// [`ExportError::Encoder`] si ffmpeg termine en erreur.
    pub fn finish(mut self) -> Result<(), ExportError> {
        drop(self.ffmpeg_child.stdin.take());

        let status = self.ffmpeg_child.wait()?;
        self.finished = true;
        let stderr = self
            .stderr_reader
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(ExportError::Encoder(format!("ffmpeg : {}", stderr.trim())));
        }
        Ok(())
    }
}

impl Drop for FfmpegMuxer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.ffmpeg_child.stdin.take());
        if let Err(e) = self.ffmpeg_child.kill() {
            log::debug!("ffmpeg déjà terminé : {e}");
        }
        let _ = self.ffmpeg_child.wait();
        if let Some(handle) = self.stderr_reader.take() {
            let _ = handle.join();
        }
        log::warn!("Encodeur ffmpeg interrompu avant la fin du flux");
    }
}

fn spawn_stderr_reader(mut stderr: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    })
}

/// Encodeurs vidéo listés par `ffmpeg -encoders`. Vide si ffmpeg est absent.
#[must_use]
pub fn available_encoders() -> Vec<String> {
    match Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(out) if out.status.success() => parse_encoders(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            log::warn!("ffmpeg -encoders a échoué ({})", out.status);
            Vec::new()
        }
        Err(e) => {
            log::debug!("ffmpeg introuvable : {e}");
            Vec::new()
        }
    }
}

/// Extrait les noms d'encodeurs vidéo (drapeau `V`) de la sortie de `ffmpeg -encoders`.
///
/// # Example
/// ```
/// use am_export::muxer::parse_encoders;
/// let out = " V..... = Video\n ------\n V....D libx264   H.264\n A....D aac   AAC\n";
/// assert_eq!(parse_encoders(out), vec!["libx264".to_string()]);
/// ```
#[must_use]
pub fn parse_encoders(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            flags.starts_with('V').then(|| name.to_string())
        })
        .collect()
}
