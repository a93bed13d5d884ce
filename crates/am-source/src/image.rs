use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use am_core::error::CoreError;
use am_core::frame::FrameBuffer;
use am_core::traits::FrameSource;
use anyhow::{Context, Result};

/// Source d'image statique. Retourne toujours la même frame.
///
/// # Example
/// ```
/// use am_source::image::ImageSource;
/// use am_core::frame::FrameBuffer;
/// use am_core::traits::FrameSource;
/// let source = ImageSource::from_frame(FrameBuffer::new(8, 4));
/// assert_eq!(source.native_size(), (8, 4));
/// ```
pub struct ImageSource {
    frame: Arc<FrameBuffer>,
}

impl ImageSource {
    /// Load an image from disk and create a source.
    ///
    /// # Errors
    /// [`CoreError::FileNotFound`] if the path does not exist, or a decoding
    /// error.
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self::from_frame(load_image(path)?))
    }

    /// Wrap an already decoded surface.
    #[must_use]
    pub fn from_frame(frame: FrameBuffer) -> Self {
        Self {
            frame: Arc::new(frame),
        }
    }

    /// Frame partagée (boucle live).
    #[must_use]
    pub fn frame(&self) -> Arc<FrameBuffer> {
        Arc::clone(&self.frame)
    }
}

impl FrameSource for ImageSource {
    fn native_size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn duration_secs(&self) -> f64 {
        0.0
    }

    fn seek_and_capture(&mut self, _t: f64, _timeout: Duration) -> Result<FrameBuffer> {
        Ok(FrameBuffer::clone(&self.frame))
    }
}

/// Décode une image (PNG, JPEG, BMP, GIF) en surface RGBA.
///
/// # Errors
/// Returns an error if the file is missing, has an extension no enabled
/// decoder reads ([`CoreError::UnsupportedFormat`]), is empty, or cannot be decoded.
pub fn load_image(path: &Path) -> Result<FrameBuffer> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    // image::open choisit le décodeur d'après l'extension.
    let readable = image::ImageFormat::from_path(path).is_ok_and(|f| f.reading_enabled());
    if !readable {
        return Err(CoreError::UnsupportedFormat {
            format: path
                .extension()
                .map_or_else(|| "(sans extension)".to_string(), |e| e.to_string_lossy().into_owned()),
        }
        .into());
    }
    let img = image::open(path).with_context(|| format!("Impossible de charger {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidDimensions { width, height }.into());
    }
    log::info!("Image chargée : {width}x{height} : {}", path.display());
    Ok(FrameBuffer {
        data: rgba.into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_roundtrip_through_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let mut source = ImageSource::new(&path).unwrap();
        assert_eq!(source.native_size(), (3, 2));
        assert!(source.duration_secs().abs() < f64::EPSILON);
        let frame = source.seek_and_capture(42.0, Duration::from_millis(1)).unwrap();
        assert_eq!(frame.pixel(2, 1), (10, 20, 30, 255));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = load_image(Path::new("/definitely/not/here.png")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::FileNotFound { .. })
        ));
    }

    #[test]
    fn unknown_extension_is_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["still.xyz", "still"] {
            let path = dir.path().join(name);
            image::RgbaImage::new(2, 2)
                .save_with_format(&path, image::ImageFormat::Png)
                .unwrap();
            let err = load_image(&path).err().unwrap();
            assert!(
                matches!(
                    err.downcast_ref::<CoreError>(),
                    Some(CoreError::UnsupportedFormat { .. })
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(load_image(&path).is_err());
    }
}
