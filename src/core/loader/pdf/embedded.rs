//! Embedded-image page rendering.
//!
//! Decodes the page's largest raster image and resamples it to the page box.
//! Handles DCTDecode (JPEG), FlateDecode with or without PNG predictors, and
//! uncompressed 8-bit Gray/RGB/CMYK samples. Inflation is bounded by the
//! image's declared size, so a small stream cannot expand past what the page
//! claims to hold.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::ZlibDecoder;
use image::RgbImage;
use lopdf::{Dictionary, Document, Object};

use super::objects::{dict_u32, filter_names, resolve, PageImage};
use super::pdf_error;
use crate::core::loader::decode::ImageDecoder;
use crate::core::loader::resize::{fit_within, resize_rgb};
use crate::core::metadata::{extract_metadata, EmbeddedMetadata};
use crate::error::LoadError;

/// Compressed JPEG data may not exceed this many bytes per declared pixel
const MAX_JPEG_BYTES_PER_PIXEL: u64 = 4;
/// PNG predictors start at 10 in PDF DecodeParms
const PNG_PREDICTOR_MIN: i64 = 10;

/// Decode `image` and fit it into `bounds`
pub(super) fn render(
    doc: &Document,
    image: &PageImage<'_>,
    bounds: (u32, u32),
    max_pixels: u64,
) -> Result<RgbImage, LoadError> {
    let pixels = decode_page_image(doc, image, max_pixels)?;
    let (width, height) = fit_within(pixels.dimensions(), bounds);
    resize_rgb(&pixels, width, height).map_err(pdf_error)
}

/// EXIF carried by a page image stored as a plain JPEG
pub(super) fn image_metadata(image: &PageImage<'_>) -> EmbeddedMetadata {
    let filters = filter_names(&image.stream.dict);
    if filters.len() == 1 && filters[0] == b"DCTDecode" {
        extract_metadata(&image.stream.content)
    } else {
        EmbeddedMetadata::default()
    }
}

fn decode_page_image(
    doc: &Document,
    image: &PageImage<'_>,
    max_pixels: u64,
) -> Result<RgbImage, LoadError> {
    let dict = &image.stream.dict;
    let filters = filter_names(dict);
    let mut data: Cow<'_, [u8]> = Cow::Borrowed(&image.stream.content);

    for (index, filter) in filters.iter().enumerate() {
        let last = index + 1 == filters.len();
        match filter.as_slice() {
            b"FlateDecode" if last => {
                let raw = RawLayout::of(doc, image)?;
                let inflated = inflate(&data, raw.encoded_len())?;
                let samples = raw.unpredict(inflated)?;
                return reconstruct_raw(&raw, &samples);
            }
            b"FlateDecode" => {
                let limit = image.area().min(max_pixels) * MAX_JPEG_BYTES_PER_PIXEL;
                data = Cow::Owned(inflate(&data, usize::try_from(limit).unwrap_or(usize::MAX))?);
            }
            b"DCTDecode" if last => {
                let (pixels, _mode) = ImageDecoder::decode_any(&data)
                    .map_err(|e| pdf_error(format!("embedded JPEG: {e}")))?;
                return Ok(pixels);
            }
            b"JPXDecode" => return Err(pdf_error("JPEG 2000 page images are not supported")),
            other => {
                return Err(pdf_error(format!(
                    "unsupported page image filter {}",
                    String::from_utf8_lossy(other)
                )))
            }
        }
    }

    let raw = RawLayout::of(doc, image)?;
    reconstruct_raw(&raw, &data)
}

/// Inflate a zlib stream, stopping after `limit` output bytes
fn inflate(data: &[u8], limit: usize) -> Result<Vec<u8>, LoadError> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(limit as u64)
        .read_to_end(&mut out)
        .map_err(|e| pdf_error(format!("cannot decompress page image: {e}")))?;
    Ok(out)
}

/// Sample layout of an uncompressed (or deflated) page image
struct RawLayout {
    width: u32,
    height: u32,
    channels: usize,
    png_predictor: bool,
}

impl RawLayout {
    fn of(doc: &Document, image: &PageImage<'_>) -> Result<Self, LoadError> {
        let dict = &image.stream.dict;
        let bpc = dict_u32(doc, dict, b"BitsPerComponent").unwrap_or(8);
        if bpc != 8 {
            return Err(pdf_error(format!(
                "unsupported page image depth: {bpc} bits per component"
            )));
        }

        let predictor = decode_parms(doc, dict)
            .and_then(|parms| parms.get(b"Predictor").ok())
            .and_then(|p| p.as_i64().ok())
            .unwrap_or(1);
        if predictor > 1 && predictor < PNG_PREDICTOR_MIN {
            return Err(pdf_error(format!("unsupported predictor {predictor}")));
        }

        Ok(Self {
            width: image.width,
            height: image.height,
            channels: color_channels(doc, dict)?,
            png_predictor: predictor >= PNG_PREDICTOR_MIN,
        })
    }

    fn row_len(&self) -> usize {
        self.width as usize * self.channels
    }

    /// Bytes of sample data once decoded
    fn sample_len(&self) -> usize {
        self.row_len() * self.height as usize
    }

    /// Bytes the filter output holds, including PNG row tags
    fn encoded_len(&self) -> usize {
        if self.png_predictor {
            (self.row_len() + 1) * self.height as usize
        } else {
            self.sample_len()
        }
    }

    fn unpredict(&self, data: Vec<u8>) -> Result<Vec<u8>, LoadError> {
        if self.png_predictor {
            unpredict_png(&data, self.row_len(), self.channels, self.height as usize)
        } else {
            Ok(data)
        }
    }
}

fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    match resolve(doc, dict.get(b"DecodeParms").ok()?) {
        Object::Dictionary(parms) => Some(parms),
        // One entry per filter; the predictor belongs to the last (Flate) one
        Object::Array(items) => resolve(doc, items.last()?).as_dict().ok(),
        _ => None,
    }
}

/// Undo PNG row predictors: every row starts with its filter type byte
fn unpredict_png(
    data: &[u8],
    row_len: usize,
    bpp: usize,
    rows: usize,
) -> Result<Vec<u8>, LoadError> {
    let stride = row_len + 1;
    if data.len() < stride * rows {
        return Err(pdf_error(format!(
            "page image data too short: {} bytes, expected {}",
            data.len(),
            stride * rows
        )));
    }

    let mut out = vec![0u8; row_len * rows];
    for row in 0..rows {
        let tag = data[row * stride];
        let src = &data[row * stride + 1..(row + 1) * stride];
        let (done, rest) = out.split_at_mut(row * row_len);
        let prev = row.checked_sub(1).map(|p| &done[p * row_len..]);
        let current = &mut rest[..row_len];

        for i in 0..row_len {
            let a = if i >= bpp { current[i - bpp] } else { 0 };
            let b = prev.map_or(0, |p| p[i]);
            let c = if i >= bpp { prev.map_or(0, |p| p[i - bpp]) } else { 0 };
            current[i] = match tag {
                0 => src[i],
                1 => src[i].wrapping_add(a),
                2 => src[i].wrapping_add(b),
                3 => src[i].wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => src[i].wrapping_add(paeth(a, b, c)),
                other => return Err(pdf_error(format!("invalid PNG row filter {other}"))),
            };
        }
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let (pa, pb, pc) = ((p - a as i16).abs(), (p - b as i16).abs(), (p - c as i16).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Build an RGB grid from 8-bit Gray, RGB or CMYK samples
fn reconstruct_raw(layout: &RawLayout, samples: &[u8]) -> Result<RgbImage, LoadError> {
    let expected = layout.sample_len();
    if samples.len() < expected {
        return Err(pdf_error(format!(
            "page image data too short: {} bytes, expected {} ({}x{}x{})",
            samples.len(),
            expected,
            layout.width,
            layout.height,
            layout.channels
        )));
    }

    let samples = &samples[..expected];
    let rgb: Vec<u8> = match layout.channels {
        1 => samples.iter().flat_map(|&v| [v, v, v]).collect(),
        3 => samples.to_vec(),
        _ => samples
            .chunks_exact(4)
            .flat_map(|px| {
                let k = 255 - px[3] as u16;
                let convert = |c: u8| ((255 - c as u16) * k / 255) as u8;
                [convert(px[0]), convert(px[1]), convert(px[2])]
            })
            .collect(),
    };

    RgbImage::from_raw(layout.width, layout.height, rgb)
        .ok_or_else(|| pdf_error("page image buffer size mismatch"))
}

fn color_channels(doc: &Document, dict: &Dictionary) -> Result<usize, LoadError> {
    let color_space = dict.get(b"ColorSpace").map(|cs| resolve(doc, cs));
    match color_space {
        Ok(Object::Name(name)) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Ok(1),
            b"DeviceRGB" | b"CalRGB" => Ok(3),
            b"DeviceCMYK" => Ok(4),
            other => Err(pdf_error(format!(
                "unsupported colour space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Ok(Object::Array(parts)) => {
            let family = parts.first().and_then(|o| o.as_name().ok());
            match family {
                Some(b"ICCBased") => {
                    let components = parts
                        .get(1)
                        .map(|o| resolve(doc, o))
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| dict_u32(doc, &s.dict, b"N"))
                        .unwrap_or(3);
                    match components {
                        1 | 3 | 4 => Ok(components as usize),
                        n => Err(pdf_error(format!("unsupported ICC component count {n}"))),
                    }
                }
                Some(b"CalRGB") => Ok(3),
                Some(b"CalGray") => Ok(1),
                _ => Err(pdf_error("indexed and special colour spaces are not supported")),
            }
        }
        _ => Ok(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use image::Rgb;
    use lopdf::{dictionary, Stream};
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Decode a lone image stream as if it sat on a page
    fn decode(dict: Dictionary, content: Vec<u8>) -> Result<RgbImage, LoadError> {
        let mut doc = Document::with_version("1.5");
        let width = dict.get(b"Width").unwrap().as_i64().unwrap() as u32;
        let height = dict.get(b"Height").unwrap().as_i64().unwrap() as u32;
        let id = doc.add_object(Stream::new(dict, content));
        let Object::Stream(ref stream) = doc.objects[&id] else {
            panic!("stream expected");
        };
        let image = PageImage {
            stream,
            width,
            height,
        };
        decode_page_image(&doc, &image, 1_000_000)
    }

    #[test]
    fn grayscale_samples_expand_to_rgb() {
        let rgb = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2_i64,
                "Height" => 1_i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            vec![0, 255],
        )
        .unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn cmyk_samples_convert_to_rgb() {
        let rgb = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3_i64,
                "Height" => 1_i64,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8_i64,
            },
            vec![255, 0, 0, 0, 0, 0, 0, 255, 0, 0, 0, 0],
        )
        .unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(rgb.get_pixel(2, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn flate_samples_are_inflated() {
        let samples: Vec<u8> = (0..4 * 4 * 3).map(|i| (i * 5) as u8).collect();
        let rgb = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4_i64,
                "Height" => 4_i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            },
            deflate(&samples),
        )
        .unwrap();
        assert_eq!(rgb.as_raw(), &samples);
    }

    #[test]
    fn png_predicted_rows_are_restored() {
        // Row 0 uses Sub, row 1 uses Up
        let encoded = [1, 10, 5, 5, 2, 1, 1, 1];
        let rgb = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3_i64,
                "Height" => 2_i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
                "DecodeParms" => dictionary! { "Predictor" => 15_i64, "Columns" => 3_i64 },
            },
            deflate(&encoded),
        )
        .unwrap();
        let gray: Vec<u8> = rgb.pixels().map(|p| p[0]).collect();
        assert_eq!(gray, vec![10, 15, 20, 11, 16, 21]);
    }

    #[test]
    fn inflation_stops_at_the_limit() {
        let bomb = deflate(&vec![0u8; 4 * 1024 * 1024]);
        assert!(bomb.len() < 64 * 1024);

        let out = inflate(&bomb, 4096).unwrap();
        assert_eq!(out.len(), 4096);
    }

    #[test]
    fn short_flate_data_is_rejected() {
        let err = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 16_i64,
                "Height" => 16_i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            },
            deflate(&[1, 2, 3]),
        )
        .unwrap_err();
        match err {
            LoadError::Decode { reason, .. } => assert!(reason.contains("too short")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1_i64,
                "Height" => 1_i64,
                "Filter" => "LZWDecode",
            },
            vec![0, 0, 0],
        )
        .unwrap_err();
        assert!(err.to_string().contains("LZWDecode"));
    }

    #[test]
    fn paeth_picks_nearest_neighbour() {
        assert_eq!(paeth(10, 20, 10), 20);
        assert_eq!(paeth(20, 10, 10), 20);
        assert_eq!(paeth(0, 0, 0), 0);
    }
}
