use std::collections::HashMap;

use crate::{
    foundation::error::{AvatarError, AvatarResult},
    render::AvatarFont,
};

/// White glyph brush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GlyphBrush {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Long-lived Parley contexts with each [`AvatarFont`] registered at most once.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
    /// Family name per font id; `None` records bytes that registered no family.
    families: HashMap<u64, Option<String>>,
    registrations: usize,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
            registrations: 0,
        }
    }

    /// Number of fonts registered with the font collection so far.
    pub(crate) fn registrations(&self) -> usize {
        self.registrations
    }

    fn family_for(&mut self, font: &AvatarFont) -> AvatarResult<String> {
        let (Some(id), Some(bytes)) = (font.id(), font.bytes()) else {
            return Err(AvatarError::render("no font bytes"));
        };

        if !self.families.contains_key(&id) {
            self.registrations += 1;
            let families = self
                .font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
            let name = match families.first() {
                Some((family, _)) => self
                    .font_ctx
                    .collection
                    .family_name(*family)
                    .map(str::to_owned),
                None => None,
            };
            self.families.insert(id, name);
        }

        self.families
            .get(&id)
            .cloned()
            .flatten()
            .ok_or_else(|| AvatarError::render("no font families registered from font bytes"))
    }

    /// Shape a single line of text with `font`.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font: &AvatarFont,
        size_px: f32,
        brush: GlyphBrush,
    ) -> AvatarResult<parley::Layout<GlyphBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(AvatarError::render("glyph size must be finite and > 0"));
        }
        let family_name = self.family_for(font)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
