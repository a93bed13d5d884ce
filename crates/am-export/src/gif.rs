use std::io::Write;

use am_core::frame::AsciiFrame;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::error::ExportError;
use crate::rasterizer::Rasterizer;

/// Vitesse NeuQuant (1 = meilleure qualité, 30 = plus rapide).
const QUANTIZER_SPEED: i32 = 10;

/// Délai entre frames en millisecondes : `round(1000 / fps)`.
///
/// # Example
/// ```
/// use am_export::gif::frame_delay_ms;
/// assert_eq!(frame_delay_ms(15), 67);
/// assert_eq!(frame_delay_ms(24), 42);
/// ```
#[must_use]
pub fn frame_delay_ms(fps: u32) -> u32 {
    (1000.0 / f64::from(fps.max(1))).round() as u32
}

/// Encode une séquence en GIF animé bouclant indéfiniment, palette par frame.
///
/// # Errors
/// [`ExportError::NoFrames`] pour une séquence vide (rien n'est écrit),
/// [`ExportError::Encoder`] si l'encodeur échoue.
pub fn write_gif<W: Write>(
    out: W,
    frames: &[AsciiFrame],
    raster: &mut Rasterizer,
    fps: u32,
    color_enabled: bool,
    (width, height): (u32, u32),
    progress: &mut dyn FnMut(f32),
) -> Result<(), ExportError> {
    if frames.is_empty() {
        return Err(ExportError::NoFrames);
    }
    let encoder_err = |e: image::ImageError| ExportError::Encoder(e.to_string());

    let mut encoder = GifEncoder::new_with_speed(out, QUANTIZER_SPEED);
    encoder.set_repeat(Repeat::Infinite).map_err(encoder_err)?;
    let delay = Delay::from_numer_denom_ms(frame_delay_ms(fps), 1);

    let mut canvas = RgbaImage::new(width, height);
    for (i, frame) in frames.iter().enumerate() {
        raster.render_into(frame, color_enabled, &mut canvas);
        encoder
            .encode_frame(Frame::from_parts(canvas.clone(), 0, 0, delay))
            .map_err(encoder_err)?;
        progress((i + 1) as f32 / frames.len() as f32);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_rounds_to_nearest_ms() {
        assert_eq!(frame_delay_ms(1), 1000);
        assert_eq!(frame_delay_ms(30), 33);
        assert_eq!(frame_delay_ms(60), 17);
        // fps 0 traité comme 1.
        assert_eq!(frame_delay_ms(0), 1000);
    }

    #[test]
    fn empty_sequence_writes_nothing() {
        let mut raster = Rasterizer::new(crate::TEST_FONT.to_vec()).unwrap();
        let mut out = Vec::new();
        let err = write_gif(&mut out, &[], &mut raster, 15, false, (16, 16), &mut |_| {}).err();
        assert!(matches!(err, Some(ExportError::NoFrames)));
        assert!(out.is_empty());
    }

    #[test]
    fn encodes_a_decodable_animated_gif() {
        use am_core::frame::ColorGrid;
        use image::AnimationDecoder;
        use image::codecs::gif::GifDecoder;

        let mut raster = Rasterizer::new(crate::TEST_FONT.to_vec()).unwrap();
        let frames = vec![
            AsciiFrame::new(vec!["@ ".into()], ColorGrid::new(2, 1)),
            AsciiFrame::new(vec![" @".into()], ColorGrid::new(2, 1)),
        ];
        let mut out = Vec::new();
        let mut last = 0.0;
        write_gif(&mut out, &frames, &mut raster, 10, false, (16, 8), &mut |p| last = p).unwrap();
        assert!((last - 1.0).abs() < f32::EPSILON);

        let decoded = GifDecoder::new(std::io::Cursor::new(out))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].buffer().dimensions(), (16, 8));
    }
}
