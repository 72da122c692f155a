use std::path::Path;
use std::sync::Arc;

use crate::assets::decode::{Bitmap, BitmapDecoder, ImageDecoder};
use crate::assets::fonts::{FontFolderResolver, NoFonts, Typeface, TypefaceResolver};
use crate::composition::model::ImageAsset;

/// Host override for image assets. Takes precedence over the assets folder.
pub trait ImageAssetDelegate: Send + Sync {
    /// Produce the bitmap for a manifest entry, or `None` to leave the image undrawn.
    fn fetch_bitmap(&self, asset: &ImageAsset) -> Option<Bitmap>;
}

/// Host override for font lookup. Takes precedence over the device's resolver.
pub trait FontAssetDelegate: Send + Sync {
    /// Produce a typeface for `family`/`style`, or `None` to fall back to the device.
    fn fetch_font(&self, family: &str, style: &str) -> Option<Typeface>;
}

/// Host override for text content.
pub trait TextDelegate: Send + Sync {
    /// Text to display for `layer_name` in place of `source_text`.
    fn text_for(&self, layer_name: &str, source_text: &str) -> String;
}

/// The rendering device a player is attached to: the services bitmaps and fonts come from.
///
/// Resolving assets before a target is attached yields `None` plus a warning.
#[derive(Clone)]
pub struct RenderTarget {
    /// Image decoder.
    pub decoder: Arc<dyn BitmapDecoder>,
    /// Font family resolver.
    pub typefaces: Arc<dyn TypefaceResolver>,
}

impl RenderTarget {
    /// Default CPU device: `image`-crate decoding and an optional font folder.
    pub fn cpu(font_dir: Option<&Path>) -> Self {
        let typefaces: Arc<dyn TypefaceResolver> = match font_dir {
            Some(dir) => Arc::new(FontFolderResolver::new(dir)),
            None => Arc::new(NoFonts),
        };
        Self {
            decoder: Arc::new(ImageDecoder),
            typefaces,
        }
    }

    pub fn new(decoder: Arc<dyn BitmapDecoder>, typefaces: Arc<dyn TypefaceResolver>) -> Self {
        Self { decoder, typefaces }
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget").finish_non_exhaustive()
    }
}
