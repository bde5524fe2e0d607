use sha2::Digest as _;

use crate::foundation::core::Rgba8Premul;

/// Floating-point straight-alpha colour in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColorDef {
    pub(crate) r: f64,
    pub(crate) g: f64,
    pub(crate) b: f64,
    pub(crate) a: f64,
}

impl ColorDef {
    pub(crate) fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) fn to_rgba8_premul(self) -> Rgba8Premul {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }

        let a = self.a.clamp(0.0, 1.0);
        let r = (self.r.clamp(0.0, 1.0) * a).clamp(0.0, 1.0);
        let g = (self.g.clamp(0.0, 1.0) * a).clamp(0.0, 1.0);
        let b = (self.b.clamp(0.0, 1.0) * a).clamp(0.0, 1.0);

        Rgba8Premul {
            r: to_u8(r),
            g: to_u8(g),
            b: to_u8(b),
            a: to_u8(a),
        }
    }
}

pub(crate) fn hsla_to_rgba(h: f64, s: f64, l: f64, a: f64) -> ColorDef {
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return ColorDef::rgba(l, l, l, a);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);
    ColorDef::rgba(r, g, b, a)
}

/// Fold case and surrounding whitespace so `Juliet` and ` juliet` share a colour.
pub fn normalize_text_for_hash(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Hue angle in degrees derived from the first two digest bytes of the normalized text.
pub fn hue_for_text(text: &str) -> f64 {
    let digest = sha2::Sha256::digest(normalize_text_for_hash(text).as_bytes());
    let angle = u16::from_le_bytes([digest[0], digest[1]]);
    f64::from(angle) / 65536.0 * 360.0
}

/// Stable, opaque background colour for a text seed.
pub fn color_for_text(text: &str) -> Rgba8Premul {
    hsla_to_rgba(hue_for_text(text), 1.0, 0.5, 1.0).to_rgba8_premul()
}

#[cfg(test)]
#[path = "../../tests/unit/render/color.rs"]
mod tests;
