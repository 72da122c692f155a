use std::{collections::BTreeMap, sync::Arc};

use crate::{
    animation::anim::Animated,
    foundation::core::{BezPath, Bounds, Rgba8, Transform2D},
    foundation::error::{KineticError, KineticResult},
};

/// A parsed vector animation: layers, timing, bounds and asset manifests.
///
/// Compositions are produced by an external provider (a file parser, a builder, or JSON through
/// Serde) and are immutable once handed to a [`crate::RenderOrchestrator`], which keeps them
/// behind an [`Arc`] and compares them by identity.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Composition {
    /// Total duration in milliseconds at speed 1.
    pub duration_ms: f64,
    /// Native size of the composition in pixels.
    pub bounds: Bounds,
    /// Layers, top-most first.
    pub layers: Vec<Layer>,
    /// Image manifest keyed by asset id.
    #[serde(default)]
    pub images: BTreeMap<String, ImageAsset>,
    /// Glyph outlines for text drawn without a typeface.
    #[serde(default)]
    pub characters: Vec<CharacterGlyph>,
}

impl Composition {
    /// Validate static invariants: timing, bounds, keyframes and matte wiring.
    pub fn validate(&self) -> KineticResult<()> {
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(KineticError::validation(
                "duration_ms must be finite and >= 0",
            ));
        }
        Bounds::new(self.bounds.width, self.bounds.height)?;
        validate_layers(&self.layers, self)?;
        for (id, image) in &self.images {
            if id != &image.id {
                return Err(KineticError::validation(format!(
                    "image manifest key '{id}' does not match asset id '{}'",
                    image.id
                )));
            }
        }
        Ok(())
    }
}

fn validate_layers(layers: &[Layer], comp: &Composition) -> KineticResult<()> {
    for (i, layer) in layers.iter().enumerate() {
        layer.validate()?;
        if let LayerKind::Image { image_id } = &layer.kind
            && !comp.images.contains_key(image_id)
        {
            return Err(KineticError::validation(format!(
                "layer '{}' references unknown image '{image_id}'",
                layer.name
            )));
        }
        if layer.matte.is_some() && i == 0 {
            return Err(KineticError::validation(format!(
                "layer '{}' declares a matte but has no preceding matte layer",
                layer.name
            )));
        }
        if let LayerKind::PreComp { layers, .. } = &layer.kind {
            validate_layers(layers, comp)?;
        }
    }
    Ok(())
}

/// One layer of a composition.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Layer name, used to target color filter overrides.
    pub name: String,
    /// What the layer draws.
    pub kind: LayerKind,
    /// Layer transform in parent space.
    #[serde(default)]
    pub transform: Animated<Transform2D>,
    /// Layer opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: Animated<f64>,
    /// First visible instant, in parent time (ms).
    #[serde(default)]
    pub in_ms: f64,
    /// End of visibility (exclusive) in parent time; `None` means open ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_ms: Option<f64>,
    /// Offset of the layer's local timeline in parent time.
    #[serde(default)]
    pub start_ms: f64,
    /// Local time runs `1 / time_stretch` times as fast as parent time.
    #[serde(default = "default_time_stretch")]
    pub time_stretch: f64,
    /// Masks applied to this layer's content, in order.
    #[serde(default)]
    pub masks: Vec<Mask>,
    /// When set, the layer declared immediately before this one is its matte.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matte: Option<MatteMode>,
}

fn default_opacity() -> Animated<f64> {
    Animated::Static(1.0)
}

fn default_time_stretch() -> f64 {
    1.0
}

impl Layer {
    /// A layer with default timing and transform.
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Animated::default(),
            opacity: default_opacity(),
            in_ms: 0.0,
            out_ms: None,
            start_ms: 0.0,
            time_stretch: 1.0,
            masks: Vec::new(),
            matte: None,
        }
    }

    /// Validate timing and animated properties.
    pub fn validate(&self) -> KineticResult<()> {
        if !self.time_stretch.is_finite() || self.time_stretch <= 0.0 {
            return Err(KineticError::validation(format!(
                "layer '{}' time_stretch must be finite and > 0",
                self.name
            )));
        }
        if let Some(out) = self.out_ms
            && out < self.in_ms
        {
            return Err(KineticError::validation(format!(
                "layer '{}' out_ms must be >= in_ms",
                self.name
            )));
        }
        self.transform.validate()?;
        self.opacity.validate()?;
        for mask in &self.masks {
            mask.opacity.validate()?;
        }
        match &self.kind {
            LayerKind::Shape { contents } => {
                for c in contents {
                    c.transform.validate()?;
                    if let Some(fill) = &c.fill {
                        fill.color.validate()?;
                        fill.opacity.validate()?;
                    }
                    if let Some(stroke) = &c.stroke {
                        stroke.color.validate()?;
                        stroke.opacity.validate()?;
                        stroke.width.validate()?;
                    }
                }
            }
            LayerKind::Text { document } => {
                if !document.size.is_finite() || document.size <= 0.0 {
                    return Err(KineticError::validation(format!(
                        "text layer '{}' size must be finite and > 0",
                        self.name
                    )));
                }
            }
            LayerKind::PreComp { time_remap, .. } => {
                if let Some(r) = time_remap {
                    r.validate()?;
                }
            }
            LayerKind::Solid { .. } | LayerKind::Image { .. } | LayerKind::Null => {}
        }
        Ok(())
    }
}

/// Drawable payload of a layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum LayerKind {
    /// Vector contents.
    Shape {
        /// Named shape items, top-most first.
        contents: Vec<ShapeContent>,
    },
    /// Solid color rectangle at the origin.
    Solid {
        /// Fill color.
        color: Rgba8,
        /// Rectangle width.
        width: f64,
        /// Rectangle height.
        height: f64,
    },
    /// Bitmap from the image manifest, drawn at its native size.
    Image {
        /// Key into [`Composition::images`].
        image_id: String,
    },
    /// A line-broken text run.
    Text {
        /// Text and styling.
        document: TextDocument,
    },
    /// Nested layer list with its own timeline.
    PreComp {
        /// Child layers, top-most first.
        layers: Vec<Layer>,
        /// Clip width of the nested composition.
        width: f64,
        /// Clip height of the nested composition.
        height: f64,
        /// Optional remap from local time (ms) to child time (ms).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_remap: Option<Animated<f64>>,
    },
    /// Transform-only layer; draws nothing.
    Null,
}

/// A named vector item inside a shape layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ShapeContent {
    /// Content name, used to target color filter overrides.
    pub name: String,
    /// Outline in content space.
    pub path: BezPath,
    /// Content transform relative to the layer.
    #[serde(default)]
    pub transform: Animated<Transform2D>,
    /// Optional fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    /// Optional stroke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
}

/// Fill paint of a shape item.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    /// Fill color.
    pub color: Animated<Rgba8>,
    /// Fill opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: Animated<f64>,
}

/// Stroke paint of a shape item.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    /// Stroke color.
    pub color: Animated<Rgba8>,
    /// Stroke opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: Animated<f64>,
    /// Stroke width in content space.
    pub width: Animated<f64>,
}

/// How a mask combines with the masks before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MaskMode {
    /// Union the mask area into the visible region.
    #[default]
    Add,
    /// Remove the mask area from the visible region.
    Subtract,
    /// Keep only what is also inside the mask area.
    Intersect,
    /// Disabled mask.
    None,
}

/// A shape restricting the visible region of its layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Mask {
    /// Combine mode.
    #[serde(default)]
    pub mode: MaskMode,
    /// Mask outline in layer space.
    pub path: BezPath,
    /// Mask opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: Animated<f64>,
    /// Use the area outside `path` instead.
    #[serde(default)]
    pub inverted: bool,
}

/// Channel of a matte layer used to clip its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MatteMode {
    /// Target visible where the matte is opaque.
    Alpha,
    /// Target visible where the matte is transparent.
    AlphaInverted,
    /// Target visible where the matte is bright.
    Luma,
    /// Target visible where the matte is dark.
    LumaInverted,
}

/// Text payload of a text layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextDocument {
    /// Source text; `\n` or `\r` break lines.
    pub text: String,
    /// Font family name.
    pub font_family: String,
    /// Font style name (for example `Regular`, `Bold`).
    #[serde(default = "default_font_style")]
    pub font_style: String,
    /// Font size in pixels.
    pub size: f64,
    /// Fill color.
    #[serde(default = "default_text_color")]
    pub color: Rgba8,
    /// Extra advance between characters, in pixels.
    #[serde(default)]
    pub tracking: f64,
    /// Line advance in pixels; `None` uses `1.2 * size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
}

fn default_font_style() -> String {
    "Regular".to_string()
}

fn default_text_color() -> Rgba8 {
    Rgba8::WHITE
}

impl TextDocument {
    /// Effective line advance.
    pub fn line_advance(&self) -> f64 {
        self.line_height.unwrap_or(self.size * 1.2)
    }
}

/// Image manifest entry.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ImageAsset {
    /// Asset id referenced by image layers.
    pub id: String,
    /// Authored width in pixels.
    pub width: u32,
    /// Authored height in pixels.
    pub height: u32,
    /// File name inside `dir`.
    pub file_name: String,
    /// Directory relative to the image assets folder.
    #[serde(default)]
    pub dir: String,
    /// Encoded bytes supplied by the provider instead of a file.
    #[serde(skip)]
    pub embedded: Option<Arc<Vec<u8>>>,
}

impl ImageAsset {
    /// Path of the asset relative to the image assets folder.
    pub fn rel_path(&self) -> String {
        if self.dir.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.dir.trim_end_matches('/'), self.file_name)
        }
    }
}

/// Outline of one character in a given font.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CharacterGlyph {
    /// The character.
    pub ch: char,
    /// Font family name.
    pub family: String,
    /// Font style name.
    pub style: String,
    /// Font size the outlines were authored at.
    pub size: f64,
    /// Advance width at `size`.
    pub width: f64,
    /// Outlines at `size`, baseline at `y = 0`.
    pub paths: Vec<BezPath>,
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
