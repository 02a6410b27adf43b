//! Image tiles decoded to RGBA8.

use ::image::RgbaImage;
use bytes::Bytes;

use super::{DecodeError, DecodedTile, TileDecoder, TileSource};
use crate::cache::Transparency;

/// Decodes JPEG, PNG and WebP tiles into RGBA8 images.
///
/// Tiles (not allsky mosaics) also get a transparency mask: child quadrant
/// `i` covers columns starting at `(i >> 1) * w / 2` and rows starting at
/// `(i & 1) * h / 2`, and is marked empty when every pixel in it has zero
/// alpha.
#[derive(Debug, Default, Clone, Copy)]
pub struct RgbaImageDecoder;

impl TileDecoder<RgbaImage> for RgbaImageDecoder {
    fn decode(
        &self,
        source: TileSource,
        data: Bytes,
    ) -> Result<DecodedTile<RgbaImage>, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::Empty);
        }
        let image = ::image::load_from_memory(&data)
            .map_err(|e| DecodeError::Image(e.to_string()))?
            .into_rgba8();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::Dimensions { width, height });
        }

        let transparency = match source {
            TileSource::Tile(_) => transparency_mask(&image),
            TileSource::Allsky { .. } => Transparency::OPAQUE,
        };

        Ok(DecodedTile {
            cost: u64::from(width) * u64::from(height) * 4,
            payload: image,
            transparency,
        })
    }
}

fn transparency_mask(image: &RgbaImage) -> Transparency {
    let (width, height) = image.dimensions();
    let (half_w, half_h) = (width / 2, height / 2);
    if half_w == 0 || half_h == 0 {
        return Transparency::OPAQUE;
    }

    (0..4u8).fold(Transparency::OPAQUE, |mask, i| {
        let x0 = u32::from(i >> 1) * half_w;
        let y0 = u32::from(i & 1) * half_h;
        let empty = (y0..y0 + half_h)
            .all(|y| (x0..x0 + half_w).all(|x| image.get_pixel(x, y)[3] == 0));
        if empty {
            mask.with_empty_child(i)
        } else {
            mask
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healpix::HealpixAddress;
    use ::image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn encode_png(image: &RgbaImage) -> Bytes {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    fn tile() -> TileSource {
        TileSource::Tile(HealpixAddress::new(3, 0).unwrap())
    }

    #[test]
    fn test_decode_opaque_png() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let decoded = RgbaImageDecoder.decode(tile(), encode_png(&image)).unwrap();
        assert_eq!(decoded.payload.dimensions(), (8, 8));
        assert_eq!(decoded.cost, 8 * 8 * 4);
        assert_eq!(decoded.transparency, Transparency::OPAQUE);
        assert!(!RgbaImageDecoder.passthrough());
    }

    #[test]
    fn test_transparent_quadrants() {
        // Opaque only in the quadrant at columns 4..8, rows 0..4 (child 2).
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        for y in 0..4 {
            for x in 4..8 {
                image.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let decoded = RgbaImageDecoder.decode(tile(), encode_png(&image)).unwrap();
        assert!(decoded.transparency.is_child_empty(0));
        assert!(decoded.transparency.is_child_empty(1));
        assert!(!decoded.transparency.is_child_empty(2));
        assert!(decoded.transparency.is_child_empty(3));
    }

    #[test]
    fn test_allsky_has_no_mask() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let decoded = RgbaImageDecoder
            .decode(TileSource::Allsky { order: 3 }, encode_png(&image))
            .unwrap();
        assert_eq!(decoded.transparency, Transparency::OPAQUE);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = RgbaImageDecoder
            .decode(tile(), Bytes::from_static(b"not an image"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
        assert_eq!(
            RgbaImageDecoder.decode(tile(), Bytes::new()).unwrap_err(),
            DecodeError::Empty
        );
    }
}
