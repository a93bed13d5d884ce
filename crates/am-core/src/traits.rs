use std::time::Duration;

use anyhow::Result;

use crate::frame::FrameBuffer;

/// Fournit des frames pixel au pipeline, à un instant donné.
///
/// Implémenté par : `ImageSource`, `VideoSource`.
///
/// # Example
/// ```
/// use am_core::traits::FrameSource;
/// use am_core::frame::FrameBuffer;
/// use std::time::Duration;
///
/// struct Flat;
/// impl FrameSource for Flat {
///     fn native_size(&self) -> (u32, u32) { (4, 4) }
///     fn duration_secs(&self) -> f64 { 0.0 }
///     fn seek_and_capture(&mut self, _t: f64, _timeout: Duration) -> anyhow::Result<FrameBuffer> {
///         Ok(FrameBuffer::new(4, 4))
///     }
/// }
/// assert_eq!(Flat.native_size(), (4, 4));
/// ```
pub trait FrameSource: Send {
    /// Dimensions natives (avant échantillonnage).
    fn native_size(&self) -> (u32, u32);

    /// Durée en secondes. 0 pour une image fixe.
    fn duration_secs(&self) -> f64;

    /// Positionne la source à `t` secondes et retourne la frame affichée.
    ///
    /// # Errors
    /// [`crate::error::CoreError::SeekTimeout`] si la source ne répond pas
    /// dans `timeout`, ou toute erreur de décodage.
    fn seek_and_capture(&mut self, t: f64, timeout: Duration) -> Result<FrameBuffer>;
}
