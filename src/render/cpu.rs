use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::{
    foundation::{
        core::Rgba8Premul,
        error::AvatarResult,
    },
    render::{
        AvatarFont, Picture, PictureKind, Renderer, dummy,
        picture::premultiply_rgba8_in_place,
        text::{GlyphBrush, TextLayoutEngine},
    },
};

/// Largest edge accepted by the raster backend.
const MAX_EDGE: u32 = u16::MAX as u32;

const GLYPH_PADDING: f32 = 2.0;
const GLYPH_PADDING_TOP: f32 = 4.0;

/// CPU renderer: `image` for decoding and scaling, `vello_cpu` + `parley` for generated avatars.
///
/// Shaping state is kept for the renderer's lifetime, so each font is registered once.
#[derive(Default)]
pub struct CpuRenderer {
    text: Mutex<TextLayoutEngine>,
}

impl CpuRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fonts registered with the shaping engine so far.
    pub fn registered_fonts(&self) -> usize {
        self.text_engine().registrations()
    }

    fn text_engine(&self) -> std::sync::MutexGuard<'_, TextLayoutEngine> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw_grapheme(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        font: &AvatarFont,
        grapheme: &str,
        size: u32,
    ) -> AvatarResult<()> {
        let Some(font_data) = font.font_data() else {
            return Ok(());
        };
        let s = size as f32;
        let px = s * 0.85 - GLYPH_PADDING - GLYPH_PADDING_TOP;
        if px <= 0.0 {
            return Ok(());
        }

        let brush = GlyphBrush {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        };
        let layout = self.text_engine().layout_line(grapheme, font, px, brush)?;

        let box_w = s - GLYPH_PADDING * 2.0;
        let box_h = s - GLYPH_PADDING - GLYPH_PADDING_TOP;
        let dx = GLYPH_PADDING + (box_w - layout.width()) / 2.0;
        let dy = GLYPH_PADDING_TOP + (box_h - layout.height()) / 2.0;

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(dx),
            f64::from(dy),
        )));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(font_data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CpuRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuRenderer")
            .field("registered_fonts", &self.registered_fonts())
            .finish()
    }
}

impl Renderer for CpuRenderer {
    fn render_from_bytes(&self, bytes: &[u8], size: u32) -> Option<Picture> {
        if bytes.is_empty() {
            return None;
        }
        let img = match image::load_from_memory(bytes) {
            Ok(img) => img,
            Err(err) => {
                debug!(%err, "avatar bytes are not a decodable image");
                return None;
            }
        };
        fit_image(&img, size.clamp(1, MAX_EDGE))
    }

    fn render_generated(
        &self,
        font: &AvatarFont,
        grapheme: &str,
        color: Rgba8Premul,
        size: u32,
    ) -> Picture {
        let size = size.clamp(1, MAX_EDGE);
        let edge = size as u16;
        let s = f64::from(size);

        let mut ctx = vello_cpu::RenderContext::new(edge, edge);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, s, s));

        ctx.set_transform(affine_to_cpu(dummy::silhouette_transform(size)));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 63));
        ctx.fill_path(&bezpath_to_cpu(&dummy::silhouette_path()));

        if !grapheme.is_empty()
            && let Err(err) = self.draw_grapheme(&mut ctx, font, grapheme, size)
        {
            debug!(%err, grapheme, "skipping avatar glyph");
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(edge, edge);
        ctx.render_to_pixmap(&mut pixmap);

        Picture {
            width: size,
            height: size,
            rgba8_premul: Arc::new(pixmap.data_as_u8_slice().to_vec()),
            kind: PictureKind::Generated {
                grapheme: grapheme.to_owned(),
                color,
            },
        }
    }
}

/// Scale preserving aspect ratio into a `size x size` square, centered on transparency.
fn fit_image(img: &image::DynamicImage, size: u32) -> Option<Picture> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return None;
    }

    let aspect = f64::from(w) / f64::from(h);
    let s = f64::from(size);
    let (fit_w, fit_h) = if aspect > 1.0 {
        (s, s / aspect)
    } else {
        (s * aspect, s)
    };
    let fit_w = (fit_w.round() as u32).clamp(1, size);
    let fit_h = (fit_h.round() as u32).clamp(1, size);

    let scaled = img
        .resize_exact(fit_w, fit_h, image::imageops::FilterType::Triangle)
        .to_rgba8();
    let mut canvas = image::RgbaImage::new(size, size);
    let x0 = i64::from((size - fit_w) / 2);
    let y0 = i64::from((size - fit_h) / 2);
    image::imageops::overlay(&mut canvas, &scaled, x0, y0);

    let mut rgba8_premul = canvas.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Some(Picture {
        width: size,
        height: size,
        rgba8_premul: Arc::new(rgba8_premul),
        kind: PictureKind::Image,
    })
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
