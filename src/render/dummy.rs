use kurbo::{Affine, BezPath, Point};
use unicode_segmentation::UnicodeSegmentation as _;

use crate::render::{AvatarFont, Picture, Renderer, color};

/// Design size of [`silhouette_path`].
const SILHOUETTE_BOX: f64 = 48.0;

/// First extended grapheme cluster of `s`, or `""` for an empty string.
pub fn first_grapheme(s: &str) -> &str {
    s.graphemes(true).next().unwrap_or("")
}

/// Render the deterministic placeholder for `name`.
///
/// The background colour is derived from `color_seed` when given, otherwise from `name`; the
/// glyph is the first grapheme of `name`.
pub fn render_dummy_avatar(
    renderer: &dyn Renderer,
    font: &AvatarFont,
    name: &str,
    size: u32,
    color_seed: Option<&str>,
) -> Picture {
    let color = color::color_for_text(color_seed.unwrap_or(name));
    renderer.render_generated(font, first_grapheme(name), color, size)
}

/// Head-and-shoulders outline in a 48x48 box, drawn translucent behind the glyph.
pub(crate) fn silhouette_path() -> BezPath {
    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    let mut path = BezPath::new();
    path.move_to(p(2.4733, 0.0068));
    path.curve_to(p(2.3339, 0.0028), p(2.2337, 0.0467), p(2.1771, 0.1425));
    path.curve_to(p(0.6549, 2.7272), p(0.9932, 9.3858), p(1.1465, 15.8859));
    path.curve_to(p(1.1698, 23.3724), p(1.0995, 29.3418), p(1.115, 36.1884));
    path.curve_to(p(1.115, 42.7286), p(6.9069, 47.9936), p(13.4471, 47.9936));
    path.line_to(p(34.5824, 47.9936));
    path.curve_to(p(41.1226, 47.9936), p(46.885, 42.6361), p(46.885, 36.096));
    path.curve_to(p(46.881, 28.6692), p(46.7965, 20.9147), p(46.885, 15.8544));
    path.curve_to(p(47.0383, 9.3542), p(47.3451, 2.7272), p(45.823, 0.1425));
    path.curve_to(p(45.3695, -0.6277), p(42.1296, 1.9488), p(38.3323, 5.9344));
    path.curve_to(p(35.5539, 8.8506), p(33.7417, 8.7885), p(31.674, 8.7885));
    path.line_to(p(16.3258, 8.7885));
    path.curve_to(p(14.6346, 8.7885), p(12.4236, 8.6905), p(9.6675, 5.9344));
    path.curve_to(p(6.2615, 2.5284), p(3.4492, 0.0386), p(2.4734, 0.007));
    path.close_path();
    path
}

/// Places the silhouette inset by 2 design units and scaled by 44/48, for a `size` picture.
pub(crate) fn silhouette_transform(size: u32) -> Affine {
    Affine::scale(f64::from(size) / SILHOUETTE_BOX)
        * Affine::translate((2.0, 2.0))
        * Affine::scale(44.0 / SILHOUETTE_BOX)
}

#[cfg(test)]
#[path = "../../tests/unit/render/dummy.rs"]
mod tests;
