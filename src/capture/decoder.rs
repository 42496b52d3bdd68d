//! Raw frame decoding and picture loading

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use tracing::debug;

use super::frame::PixelFormat;
use crate::error::CaptureError;
use crate::reduce::PixelBuffer;

/// Decode a raw device frame into an RGB picture.
///
/// `stride` is the driver's bytes per line; 0 means rows are tightly packed.
pub fn decode_frame(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
) -> Result<RgbImage, CaptureError> {
    let (width, height, rgb) = match format {
        PixelFormat::Mjpeg => {
            let mut decoder = zune_jpeg::JpegDecoder::new(data);
            let rgb = decoder
                .decode()
                .map_err(|e| CaptureError::Decode(format!("{e:?}")))?;
            // MJPEG carries its own geometry, which may differ from the negotiated one
            let (w, h) = decoder
                .dimensions()
                .ok_or_else(|| CaptureError::Decode("jpeg without dimensions".into()))?;
            (w as u32, h as u32, rgb)
        }
        PixelFormat::Rgb24 => (width, height, packed_rows(data, width * 3, stride, height)?),
        PixelFormat::Bgr24 => {
            let packed = packed_rows(data, width * 3, stride, height)?;
            let mut rgb = Vec::with_capacity(packed.len());
            for px in packed.chunks_exact(3) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
            (width, height, rgb)
        }
        PixelFormat::Yuyv4 => {
            let packed = packed_rows(data, width * 2, stride, height)?;
            (width, height, yuyv_to_rgb(&packed))
        }
    };

    RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
        CaptureError::Decode(format!("decoded frame is not {width}x{height} RGB"))
    })
}

/// Copy `height` rows of `row_len` bytes out of a buffer whose rows are `stride` apart.
fn packed_rows(
    data: &[u8],
    row_len: u32,
    stride: u32,
    height: u32,
) -> Result<Vec<u8>, CaptureError> {
    let row_len = row_len as usize;
    let stride = if stride == 0 { row_len } else { stride as usize };
    if stride < row_len {
        return Err(CaptureError::Decode(format!(
            "stride {stride} shorter than row of {row_len} bytes"
        )));
    }

    let rows = height as usize;
    // The last row need not carry its padding
    let expected = if rows == 0 { 0 } else { stride * (rows - 1) + row_len };
    if data.len() < expected {
        return Err(CaptureError::Decode(format!(
            "short frame: {} bytes, expected {}",
            data.len(),
            expected
        )));
    }

    let mut packed = Vec::with_capacity(row_len * rows);
    for row in 0..rows {
        let start = row * stride;
        packed.extend_from_slice(&data[start..start + row_len]);
    }
    Ok(packed)
}

/// BT.601 YUYV to RGB in fixed point.
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);
    for chunk in yuyv.chunks_exact(4) {
        let u = i32::from(chunk[1]) - 128;
        let v = i32::from(chunk[3]) - 128;
        for y in [i32::from(chunk[0]), i32::from(chunk[2])] {
            let r = y + ((v * 359) >> 8);
            let g = y - ((u * 88 + v * 183) >> 8);
            let b = y + ((u * 454) >> 8);
            rgb.push(r.clamp(0, 255) as u8);
            rgb.push(g.clamp(0, 255) as u8);
            rgb.push(b.clamp(0, 255) as u8);
        }
    }
    rgb
}

/// Load a saved picture scaled to fit `width` x `height`, keeping its aspect ratio.
///
/// Any failure yields `None`; callers report that as the no-frame sentinel.
pub fn load_pixel_buffer(path: &Path, width: u32, height: u32) -> Option<PixelBuffer> {
    if width == 0 || height == 0 {
        return None;
    }

    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            debug!("could not decode {}: {}", path.display(), e);
            return None;
        }
    };

    let rgb = img.resize(width, height, FilterType::Triangle).to_rgb8();
    PixelBuffer::from_rgb(rgb.as_raw()).ok()
}
