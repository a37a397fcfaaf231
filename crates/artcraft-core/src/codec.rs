//! PNG snapshot encoding and `data:` URL framing.

use crate::color::Rgb;
use crate::surface::Surface;
use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Prefix of a PNG data URL, as produced by `canvas.toDataURL()`.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Snapshot codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("PNG decoding failed: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("Unsupported PNG color type: {0:?}")]
    UnsupportedColor(png::ColorType),
    #[error("Not a PNG data URL")]
    NotDataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A decoded image, normalized to 8-bit RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Encode a surface as an 8-bit RGB PNG.
///
/// The output is deterministic for a given surface, so equal surfaces
/// always encode to equal bytes.
pub fn encode_png(surface: &Surface) -> CodecResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, surface.width(), surface.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(surface.as_bytes())?;
        writer.finish()?;
    }
    Ok(png_data)
}

/// Decode PNG bytes into RGBA.
pub fn decode_png(bytes: &[u8]) -> CodecResult<DecodedImage> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        other => return Err(CodecError::UnsupportedColor(other)),
    };

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        rgba,
    })
}

/// Wrap PNG bytes in a `data:image/png;base64,` URL.
pub fn to_data_url(png_bytes: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png_bytes))
}

/// Extract the PNG bytes from a data URL.
pub fn from_data_url(url: &str) -> CodecResult<Vec<u8>> {
    let payload = url
        .trim()
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or(CodecError::NotDataUrl)?;
    Ok(STANDARD.decode(payload)?)
}

/// Encode a surface straight to a data URL.
pub fn surface_to_data_url(surface: &Surface) -> CodecResult<String> {
    Ok(to_data_url(&encode_png(surface)?))
}

/// Replace the surface contents with a PNG image.
///
/// The surface is whitened and the image composited at the origin. Decoding
/// happens first; on error the surface is left untouched.
pub fn restore_png(surface: &mut Surface, png_bytes: &[u8]) -> CodecResult<()> {
    let image = decode_png(png_bytes)?;
    surface.fill(Rgb::WHITE);
    surface.draw_rgba(&image.rgba, image.width, image.height);
    Ok(())
}
