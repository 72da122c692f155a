use crate::{
    assets::decode::Bitmap,
    assets::fonts::Typeface,
    composition::model::MatteMode,
    filter::color_filter::ColorFilter,
    foundation::core::{Affine, BezPath, Rect, Rgba8},
    foundation::error::KineticResult,
    foundation::math::unpremul_u8,
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Final frame readback in RGBA8 format.
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Convert to straight alpha (for PNG export); a no-op if already straight.
    pub fn into_straight(mut self) -> Self {
        if self.premultiplied {
            for px in self.data.chunks_exact_mut(4) {
                let a = px[3];
                for c in &mut px[..3] {
                    *c = unpremul_u8(*c, a);
                }
            }
            self.premultiplied = false;
        }
        self
    }
}

/// How a draw combines with the current layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaintBlend {
    /// Draw over existing pixels.
    #[default]
    SourceOver,
    /// Erase existing pixels where the draw covers.
    DestinationOut,
    /// Keep existing pixels only where the draw covers.
    DestinationIn,
}

/// Per-draw paint state.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    /// Straight-alpha paint color; ignored for bitmaps.
    pub color: Rgba8,
    /// Opacity multiplier in `[0, 1]`.
    pub alpha: f64,
    /// Blend against the current layer.
    pub blend: PaintBlend,
    /// Override applied to the paint color (or bitmap pixels).
    pub color_filter: Option<ColorFilter>,
}

impl Default for Paint {
    fn default() -> Self {
        Self::solid(Rgba8::WHITE)
    }
}

impl Paint {
    /// Opaque source-over paint of `color`.
    pub fn solid(color: Rgba8) -> Self {
        Self {
            color,
            alpha: 1.0,
            blend: PaintBlend::SourceOver,
            color_filter: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_blend(mut self, blend: PaintBlend) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_color_filter(mut self, filter: Option<ColorFilter>) -> Self {
        self.color_filter = filter;
        self
    }

    /// Color actually painted: filtered, then multiplied by `alpha`.
    pub fn effective_color(&self) -> Rgba8 {
        let c = match &self.color_filter {
            Some(f) => f.apply(self.color),
            None => self.color,
        };
        c.with_opacity(self.alpha)
    }
}

/// How an offscreen layer is merged when it is restored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LayerComposite {
    /// Merge like a single draw with `blend`, faded by `alpha`.
    Blend {
        /// Blend against the layer below.
        blend: PaintBlend,
        /// Opacity of the whole layer.
        alpha: f64,
    },
    /// Use the layer as a coverage mask for the layer below it.
    Matte(MatteMode),
}

impl LayerComposite {
    /// Source-over layer with an opacity multiplier.
    pub const fn normal(alpha: f64) -> Self {
        Self::Blend {
            blend: PaintBlend::SourceOver,
            alpha,
        }
    }
}

/// One line of shaped text.
#[derive(Clone, Copy, Debug)]
pub struct TextRun<'a> {
    /// Text of the line, without line breaks.
    pub text: &'a str,
    /// Font to shape with.
    pub typeface: &'a Typeface,
    /// Font size in pixels.
    pub size: f64,
    /// Extra advance between characters, in pixels.
    pub tracking: f64,
}

/// 2D drawing backend consumed by the render tree.
///
/// Transforms map content space to device pixels. Layers opened by [`Canvas::save_layer`] must be
/// closed by a matching [`Canvas::restore`].
pub trait Canvas {
    /// Device size in pixels.
    fn size(&self) -> (u32, u32);

    /// Fill the current layer with `color`, replacing its contents.
    fn clear(&mut self, color: Rgba8);

    fn fill_path(&mut self, path: &BezPath, transform: Affine, paint: &Paint)
    -> KineticResult<()>;

    fn stroke_path(
        &mut self,
        path: &BezPath,
        width: f64,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()>;

    /// Draw `bitmap` with its top-left corner at the transformed origin.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, transform: Affine, paint: &Paint)
    -> KineticResult<()>;

    /// Draw one line of text with its baseline on the transformed `y = 0`.
    fn draw_text(&mut self, run: &TextRun<'_>, transform: Affine, paint: &Paint)
    -> KineticResult<()>;

    /// Open an offscreen layer; `bounds` (device space) clips it when given.
    fn save_layer(&mut self, bounds: Option<Rect>, composite: LayerComposite);

    /// Close the innermost layer and merge it into the one below.
    fn restore(&mut self) -> KineticResult<()>;
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/backend.rs"]
mod tests;
