use std::sync::Arc;

use crate::foundation::core::Rgba8Premul;

/// What a [`Picture`] was rendered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PictureKind {
    /// Decoded from avatar image bytes.
    Image,
    /// Generated from a grapheme on a derived background colour.
    Generated {
        /// Extended grapheme cluster drawn on top; may be empty.
        grapheme: String,
        /// Background colour.
        color: Rgba8Premul,
    },
}

/// Displayable square avatar in premultiplied RGBA8. Cloning shares the pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
    /// Provenance of the pixels.
    pub kind: PictureKind,
}

impl Picture {
    pub fn is_generated(&self) -> bool {
        matches!(self.kind, PictureKind::Generated { .. })
    }

    /// Grapheme of a generated picture.
    pub fn grapheme(&self) -> Option<&str> {
        match &self.kind {
            PictureKind::Generated { grapheme, .. } => Some(grapheme),
            PictureKind::Image => None,
        }
    }

    /// Background colour of a generated picture.
    pub fn color(&self) -> Option<Rgba8Premul> {
        match &self.kind {
            PictureKind::Generated { color, .. } => Some(*color),
            PictureKind::Image => None,
        }
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the picture.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba8_premul.get(i..i + 4)?;
        Some(Rgba8Premul {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
    }

    /// Convert to a straight-alpha image for encoding.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        let mut straight = self.rgba8_premul.as_ref().clone();
        for px in straight.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, straight)
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
