//! Turning avatar bytes or a `(grapheme, colour)` pair into a [`Picture`].
//!
//! The [`Renderer`] trait is the seam the sources render through. [`CpuRenderer`] is the
//! default implementation built on `image`, `vello_cpu` and `parley`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, path::Path, sync::Arc};

use crate::foundation::{core::Rgba8Premul, error::AvatarResult};

pub(crate) mod color;
pub(crate) mod cpu;
pub(crate) mod dummy;
pub(crate) mod picture;
pub(crate) mod text;

/// Edge length in pixels of rendered avatars unless configured otherwise.
pub const BASE_SIZE: u32 = 48;

/// Pure, synchronous picture producer. Implementations do not cache pictures.
pub trait Renderer: Send + Sync {
    /// Decode avatar bytes into a `size x size` picture.
    ///
    /// Returns `None` for empty or undecodable input instead of failing.
    fn render_from_bytes(&self, bytes: &[u8], size: u32) -> Option<Picture>;

    /// Draw `grapheme` over a `color` background into a `size x size` picture.
    fn render_generated(
        &self,
        font: &AvatarFont,
        grapheme: &str,
        color: Rgba8Premul,
        size: u32,
    ) -> Picture;
}

static NEXT_FONT_ID: AtomicU64 = AtomicU64::new(1);

struct LoadedFont {
    id: u64,
    data: vello_cpu::peniko::FontData,
}

/// Font used for generated glyphs. Without font bytes only the background layers are drawn.
///
/// The raster font data is built once; clones share it and keep the same [`AvatarFont::id`], so
/// renderers can key their shaping state on it.
#[derive(Clone, Default)]
pub struct AvatarFont {
    loaded: Option<Arc<LoadedFont>>,
}

impl AvatarFont {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
        Self {
            loaded: Some(Arc::new(LoadedFont {
                id: NEXT_FONT_ID.fetch_add(1, Ordering::Relaxed),
                data,
            })),
        }
    }

    /// Read a TTF/OTF file.
    pub fn load(path: &Path) -> AvatarResult<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.loaded.as_deref().map(|f| f.data.data.data())
    }

    /// Identity of the loaded bytes; `None` without a font.
    pub fn id(&self) -> Option<u64> {
        self.loaded.as_deref().map(|f| f.id)
    }

    pub(crate) fn font_data(&self) -> Option<&vello_cpu::peniko::FontData> {
        self.loaded.as_deref().map(|f| &f.data)
    }
}

impl PartialEq for AvatarFont {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Eq for AvatarFont {}

impl fmt::Debug for AvatarFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarFont")
            .field("id", &self.id())
            .field("bytes", &self.bytes().map(<[u8]>::len))
            .finish()
    }
}

pub use color::{color_for_text, normalize_text_for_hash};
pub use cpu::CpuRenderer;
pub use dummy::{first_grapheme, render_dummy_avatar};
pub use picture::{Picture, PictureKind};
