//! Image content objects embedded into the document.
//!
//! Decodes uploaded bytes or data-urls, applies EXIF auto-orientation,
//! resizes to fit inside a bounding box, and re-encodes. Formats outside
//! the known set are rerouted to PNG.

use std::io::Cursor;

use base64::Engine as _;
use image::{DynamicImage, ImageFormat};

use crate::error::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormatTag {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormatTag {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }

    fn encode_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Decoded, oriented, resized image ready for embedding.
/// `width_px`/`height_px` are the display dimensions used for the drawing
/// extent, already fitted to the requested box.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageContent {
    pub bytes: Vec<u8>,
    pub format: ImageFormatTag,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageContent {
    /// Decode raw bytes, fix orientation, and fit inside `box_w`×`box_h`.
    pub fn from_bytes(bytes: &[u8], box_w: u32, box_h: u32) -> Result<Self, ReportError> {
        let format = image::guess_format(bytes).ok();
        let img = image::load_from_memory(bytes)
            .map_err(|e| ReportError::Image(format!("decode failed: {e}")))?;

        let img = match format {
            Some(ImageFormat::Jpeg) => match exif_orientation(bytes) {
                Some(o) if o > 1 => apply_orientation(img, o),
                _ => img,
            },
            _ => img,
        };

        let resized = if img.width() > box_w || img.height() > box_h {
            img.thumbnail(box_w, box_h)
        } else {
            img
        };

        let tag = match format {
            Some(ImageFormat::Png) => ImageFormatTag::Png,
            Some(ImageFormat::Jpeg) => ImageFormatTag::Jpeg,
            Some(ImageFormat::Gif) => ImageFormatTag::Gif,
            Some(ImageFormat::Bmp) => ImageFormatTag::Bmp,
            // webp and anything exotic is converted to png
            _ => ImageFormatTag::Png,
        };

        let mut out = Cursor::new(Vec::new());
        // gif re-encoding through the generic path is lossy for animations;
        // stills are all we ever receive here.
        let encoded = match tag {
            ImageFormatTag::Jpeg => resized
                .to_rgb8()
                .write_to(&mut out, ImageFormat::Jpeg)
                .map(|_| tag),
            _ => resized.write_to(&mut out, tag.encode_format()).map(|_| tag),
        };
        let tag = match encoded {
            Ok(tag) => tag,
            Err(_) => {
                out = Cursor::new(Vec::new());
                resized
                    .write_to(&mut out, ImageFormat::Png)
                    .map_err(|e| ReportError::Image(format!("png conversion failed: {e}")))?;
                ImageFormatTag::Png
            }
        };

        Ok(Self {
            bytes: out.into_inner(),
            format: tag,
            width_px: resized.width(),
            height_px: resized.height(),
        })
    }

    /// Decode a `data:image/...;base64,` url. The display dimensions are
    /// forced to `width`×`height` (signatures and evidence images embed at
    /// fixed size).
    pub fn from_data_url(url: &str, width: u32, height: u32) -> Result<Self, ReportError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ReportError::Image("not a data-url".into()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| ReportError::Image("data-url is not base64".into()))?;
        if !mime.starts_with("image/") {
            return Err(ReportError::Image(format!("unsupported data-url mime: {mime}")));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ReportError::Image(format!("base64 decode failed: {e}")))?;

        let mut content = Self::from_bytes(&bytes, width, height)?;
        content.width_px = width;
        content.height_px = height;
        Ok(content)
    }

    /// Drawing extent in EMU (914400 per inch at 96 dpi).
    pub fn extent_emu(&self) -> (u64, u64) {
        const EMU_PER_PX: u64 = 9525;
        (
            self.width_px as u64 * EMU_PER_PX,
            self.height_px as u64 * EMU_PER_PX,
        )
    }

    #[cfg(test)]
    pub fn placeholder_for_tests() -> Self {
        Self {
            bytes: vec![0u8; 4],
            format: ImageFormatTag::Png,
            width_px: 10,
            height_px: 10,
        }
    }
}

// ── EXIF orientation ─────────────────────────────────────────

/// Read the orientation tag (0x0112) from a JPEG APP1/EXIF segment.
/// Returns None when no EXIF data or no orientation entry is present.
pub fn exif_orientation(jpeg: &[u8]) -> Option<u8> {
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return None;
        }
        let marker = jpeg[pos + 1];
        // SOS or EOI: no EXIF ahead of image data
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let seg_len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > jpeg.len() {
            return None;
        }
        if marker == 0xE1 {
            let seg = &jpeg[pos + 4..pos + 2 + seg_len];
            if seg.len() > 6 && &seg[..6] == b"Exif\0\0" {
                return tiff_orientation(&seg[6..]);
            }
        }
        pos += 2 + seg_len;
    }
    None
}

fn tiff_orientation(tiff: &[u8]) -> Option<u8> {
    if tiff.len() < 8 {
        return None;
    }
    let big_endian = match &tiff[..2] {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    let read_u16 = |b: &[u8]| -> u16 {
        if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        }
    };
    let read_u32 = |b: &[u8]| -> u32 {
        if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        }
    };

    let ifd_offset = read_u32(&tiff[4..8]) as usize;
    if ifd_offset + 2 > tiff.len() {
        return None;
    }
    let count = read_u16(&tiff[ifd_offset..ifd_offset + 2]) as usize;
    for i in 0..count {
        let entry = ifd_offset + 2 + i * 12;
        if entry + 12 > tiff.len() {
            return None;
        }
        let tag = read_u16(&tiff[entry..entry + 2]);
        if tag == 0x0112 {
            let value = read_u16(&tiff[entry + 8..entry + 10]);
            return u8::try_from(value).ok().filter(|v| (1..=8).contains(v));
        }
    }
    None
}

/// Apply an EXIF orientation (2–8) to a decoded image.
pub fn apply_orientation(img: DynamicImage, orientation: u8) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
