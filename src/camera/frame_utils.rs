//! Synthetic frame generation.

use super::types::{PixelFormat, Resolution};

/// Moving diagonal gradient in the requested pixel format.
///
/// The pattern shifts by one pixel per `sequence` step so consecutive frames differ.
pub fn test_pattern(resolution: Resolution, format: PixelFormat, sequence: u64) -> Vec<u8> {
    let width = resolution.width as usize;
    let height = resolution.height as usize;
    let shift = sequence as usize;
    let luma = |x: usize, y: usize| ((x + y + shift) % 256) as u8;

    match format {
        PixelFormat::Nv12FullRange | PixelFormat::Nv12VideoRange => {
            let mut data = Vec::with_capacity(format.frame_len(resolution));
            for y in 0..height {
                for x in 0..width {
                    data.push(luma(x, y));
                }
            }
            // Neutral chroma: grey gradient
            data.resize(format.frame_len(resolution), 128);
            data
        }
        PixelFormat::Rgb | PixelFormat::Bgra => {
            let bpp = format.bytes_per_pixel().unwrap_or(3);
            let mut data = Vec::with_capacity(resolution.pixel_count() * bpp);
            for y in 0..height {
                for x in 0..width {
                    let v = luma(x, y);
                    data.extend_from_slice(&[v, v, v]);
                    if bpp == 4 {
                        data.push(255);
                    }
                }
            }
            data
        }
    }
}
