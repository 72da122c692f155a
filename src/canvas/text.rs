use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    assets::fonts::Typeface,
    foundation::core::Rgba8,
    foundation::error::{KineticError, KineticResult},
};

struct RegisteredFont {
    // Keeps the bytes alive so the pointer key stays unique.
    _bytes: Arc<Vec<u8>>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

/// Shaped single-line layout plus the font data needed to rasterize its glyphs.
pub(crate) struct ShapedLine {
    pub(crate) layout: parley::Layout<Rgba8>,
    pub(crate) font: vello_cpu::peniko::FontData,
}

impl ShapedLine {
    /// Offset from the layout's top edge to the first baseline.
    pub(crate) fn baseline(&self) -> f32 {
        self.layout
            .lines()
            .next()
            .map(|line| line.metrics().baseline)
            .unwrap_or(0.0)
    }
}

/// Stateful helper for building Parley text layouts from typeface bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
    registered: HashMap<usize, RegisteredFont>,
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
            registered: HashMap::new(),
        }
    }

    fn register(&mut self, typeface: &Typeface) -> KineticResult<&RegisteredFont> {
        let key = Arc::as_ptr(&typeface.data) as usize;
        if !self.registered.contains_key(&key) {
            let families = self.font_ctx.collection.register_fonts(
                parley::fontique::Blob::from(typeface.data.as_ref().clone()),
                None,
            );
            let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
                KineticError::resource(format!(
                    "no font families registered for '{}'",
                    typeface.family
                ))
            })?;
            let family_name = self
                .font_ctx
                .collection
                .family_name(family_id)
                .ok_or_else(|| KineticError::resource("registered font family has no name"))?
                .to_string();
            let font = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(typeface.data.as_ref().clone()),
                0,
            );
            self.registered.insert(
                key,
                RegisteredFont {
                    _bytes: Arc::clone(&typeface.data),
                    family_name,
                    font,
                },
            );
        }
        self.registered
            .get(&key)
            .ok_or_else(|| KineticError::resource("font registration lost"))
    }

    /// Shape one line of text without wrapping.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        typeface: &Typeface,
        size_px: f32,
        letter_spacing: f32,
        brush: Rgba8,
    ) -> KineticResult<ShapedLine> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(KineticError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let (family_name, font) = {
            let reg = self.register(typeface)?;
            (reg.family_name.clone(), reg.font.clone())
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::LetterSpacing(letter_spacing));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<Rgba8> = builder.build(text);
        layout.break_all_lines(None);

        Ok(ShapedLine { layout, font })
    }
}
