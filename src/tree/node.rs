use std::collections::HashMap;

use kurbo::Shape;

use crate::{
    animation::anim::Animated,
    assets::delegate::{RenderTarget, TextDelegate},
    assets::store::{FontAssetCache, ImageAssetCache},
    canvas::backend::{Canvas, LayerComposite, Paint, PaintBlend, TextRun},
    composition::model::{
        CharacterGlyph, Fill, ImageAsset, Layer, LayerKind, Mask, MaskMode, MatteMode, Stroke,
        TextDocument,
    },
    filter::color_filter::ColorFilter,
    foundation::core::{Affine, BezPath, Rect, Rgba8, Transform2D},
    foundation::error::KineticResult,
};

/// Glyph outlines grouped by `(family, style)`, then by character.
pub(crate) type GlyphIndex = HashMap<(String, String), HashMap<char, CharacterGlyph>>;

/// Everything a draw pass resolves lazily, borrowed from the player for one frame.
pub struct DrawResources<'a> {
    /// Bitmap cache.
    pub images: &'a mut ImageAssetCache,
    /// Typeface cache.
    pub fonts: &'a mut FontAssetCache,
    /// Image manifest of the active composition.
    pub manifest: &'a std::collections::BTreeMap<String, ImageAsset>,
    /// Attached device, if any.
    pub target: Option<&'a RenderTarget>,
    /// Optional text override.
    pub text_delegate: Option<&'a dyn TextDelegate>,
}

pub(crate) struct ContentNode {
    name: String,
    path: BezPath,
    transform: Animated<Transform2D>,
    fill: Option<Fill>,
    stroke: Option<Stroke>,
    filter: Option<ColorFilter>,
}

pub(crate) enum NodeContent {
    Shape(Vec<ContentNode>),
    Solid {
        color: Rgba8,
        width: f64,
        height: f64,
    },
    Image {
        image_id: String,
    },
    Text {
        document: TextDocument,
    },
    PreComp {
        children: Vec<RenderNode>,
        width: f64,
        height: f64,
        time_remap: Option<Animated<f64>>,
    },
    Null,
}

pub(crate) struct MatteLink {
    mode: MatteMode,
    source: Box<RenderNode>,
}

/// Drawable mirror of one composition layer.
pub(crate) struct RenderNode {
    name: String,
    content: NodeContent,
    transform: Animated<Transform2D>,
    opacity: Animated<f64>,
    in_ms: f64,
    out_ms: Option<f64>,
    start_ms: f64,
    time_stretch: f64,
    masks: Vec<Mask>,
    matte: Option<MatteLink>,
    filter: Option<ColorFilter>,
    local_ms: f64,
    visible: bool,
    progress_epoch: u64,
}

/// Build nodes for a layer list, moving each matte source into the target declared after it.
pub(crate) fn build_nodes(layers: &[Layer]) -> Vec<RenderNode> {
    let mut out: Vec<RenderNode> = Vec::with_capacity(layers.len());
    for layer in layers {
        let mut node = RenderNode::from_layer(layer);
        if let Some(mode) = layer.matte {
            match out.pop() {
                Some(source) => {
                    node.matte = Some(MatteLink {
                        mode,
                        source: Box::new(source),
                    });
                }
                None => {
                    tracing::warn!(layer = %layer.name, "matte target has no preceding matte layer; drawing unmatted");
                }
            }
        }
        out.push(node);
    }
    out
}

impl RenderNode {
    fn from_layer(layer: &Layer) -> Self {
        let content = match &layer.kind {
            LayerKind::Shape { contents } => NodeContent::Shape(
                contents
                    .iter()
                    .map(|c| ContentNode {
                        name: c.name.clone(),
                        path: c.path.clone(),
                        transform: c.transform.clone(),
                        fill: c.fill.clone(),
                        stroke: c.stroke.clone(),
                        filter: None,
                    })
                    .collect(),
            ),
            LayerKind::Solid {
                color,
                width,
                height,
            } => NodeContent::Solid {
                color: *color,
                width: *width,
                height: *height,
            },
            LayerKind::Image { image_id } => NodeContent::Image {
                image_id: image_id.clone(),
            },
            LayerKind::Text { document } => NodeContent::Text {
                document: document.clone(),
            },
            LayerKind::PreComp {
                layers,
                width,
                height,
                time_remap,
            } => NodeContent::PreComp {
                children: build_nodes(layers),
                width: *width,
                height: *height,
                time_remap: time_remap.clone(),
            },
            LayerKind::Null => NodeContent::Null,
        };

        Self {
            name: layer.name.clone(),
            content,
            transform: layer.transform.clone(),
            opacity: layer.opacity.clone(),
            in_ms: layer.in_ms,
            out_ms: layer.out_ms,
            start_ms: layer.start_ms,
            time_stretch: layer.time_stretch,
            masks: layer.masks.clone(),
            matte: None,
            filter: None,
            local_ms: 0.0,
            visible: false,
            progress_epoch: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub(crate) fn local_ms(&self) -> f64 {
        self.local_ms
    }

    #[cfg(test)]
    pub(crate) fn is_visible(&self) -> bool {
        self.visible
    }

    /// Push parent time into this node, its matte source and nested children.
    pub(crate) fn set_time(&mut self, parent_ms: f64, epoch: u64) {
        self.visible = parent_ms >= self.in_ms && self.out_ms.is_none_or(|out| parent_ms < out);
        self.local_ms = (parent_ms - self.start_ms) / self.time_stretch;
        self.progress_epoch = epoch;

        if let Some(m) = &mut self.matte {
            m.source.set_time(parent_ms, epoch);
        }
        if let NodeContent::PreComp {
            children,
            time_remap,
            ..
        } = &mut self.content
        {
            let child_ms = time_remap
                .as_ref()
                .map_or(self.local_ms, |r| r.sample(self.local_ms));
            for child in children {
                child.set_time(child_ms, epoch);
            }
        }
    }

    /// Visit this node and every node it owns.
    pub(crate) fn visit<'a>(&'a self, f: &mut impl FnMut(&'a RenderNode)) {
        f(self);
        if let Some(m) = &self.matte {
            m.source.visit(f);
        }
        if let NodeContent::PreComp { children, .. } = &self.content {
            for child in children {
                child.visit(f);
            }
        }
    }

    pub(crate) fn progress_epoch(&self) -> u64 {
        self.progress_epoch
    }

    pub(crate) fn has_masks(&self) -> bool {
        !self.masks.is_empty()
    }

    pub(crate) fn has_matte(&self) -> bool {
        self.matte.is_some()
    }

    #[cfg(test)]
    pub(crate) fn filter(&self) -> Option<&ColorFilter> {
        self.filter.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn content_filter(&self, content: &str) -> Option<&ColorFilter> {
        match &self.content {
            NodeContent::Shape(items) => items
                .iter()
                .find(|c| c.name == content)
                .and_then(|c| c.filter.as_ref()),
            _ => None,
        }
    }

    /// Set or clear filters on matching nodes; returns how many nodes matched.
    pub(crate) fn apply_color_filter(
        &mut self,
        layer: Option<&str>,
        content: Option<&str>,
        filter: Option<&ColorFilter>,
    ) -> usize {
        let mut matched = 0;
        if layer.is_none_or(|l| l == self.name) {
            match content {
                None => {
                    self.filter = filter.cloned();
                    if let NodeContent::Shape(items) = &mut self.content {
                        for item in items {
                            item.filter = filter.cloned();
                        }
                    }
                    matched += 1;
                }
                Some(name) => {
                    if let NodeContent::Shape(items) = &mut self.content {
                        let mut hit = false;
                        for item in items.iter_mut().filter(|c| c.name == name) {
                            item.filter = filter.cloned();
                            hit = true;
                        }
                        matched += usize::from(hit);
                    }
                }
            }
        }

        if let Some(m) = &mut self.matte {
            matched += m.source.apply_color_filter(layer, content, filter);
        }
        if let NodeContent::PreComp { children, .. } = &mut self.content {
            for child in children {
                matched += child.apply_color_filter(layer, content, filter);
            }
        }
        matched
    }

    pub(crate) fn draw(
        &self,
        canvas: &mut dyn Canvas,
        parent: Affine,
        alpha: f64,
        glyphs: &GlyphIndex,
        res: &mut DrawResources<'_>,
    ) -> KineticResult<()> {
        if !self.visible {
            return Ok(());
        }
        let opacity = self.opacity.sample(self.local_ms).clamp(0.0, 1.0) * alpha;
        if opacity <= 0.0 {
            return Ok(());
        }
        let matrix = parent * self.transform.sample(self.local_ms).to_affine();

        let masked = self.masks.iter().any(|m| m.mode != MaskMode::None);
        if !masked && self.matte.is_none() {
            return self.draw_content(canvas, matrix, opacity, glyphs, res);
        }

        canvas.save_layer(None, LayerComposite::normal(opacity));
        self.draw_content(canvas, matrix, 1.0, glyphs, res)?;
        if masked {
            self.draw_masks(canvas, matrix)?;
        }
        if let Some(m) = &self.matte {
            canvas.save_layer(None, LayerComposite::Matte(m.mode));
            m.source.draw(canvas, parent, 1.0, glyphs, res)?;
            canvas.restore()?;
        }
        canvas.restore()
    }

    fn draw_masks(&self, canvas: &mut dyn Canvas, matrix: Affine) -> KineticResult<()> {
        let (w, h) = canvas.size();
        let full = Rect::new(0.0, 0.0, f64::from(w), f64::from(h)).to_path(0.1);
        let opaque = Paint::solid(Rgba8::WHITE);

        canvas.save_layer(None, LayerComposite::Matte(MatteMode::Alpha));
        let active: Vec<&Mask> = self
            .masks
            .iter()
            .filter(|m| m.mode != MaskMode::None)
            .collect();
        if let Some(first) = active.first()
            && matches!(first.mode, MaskMode::Subtract | MaskMode::Intersect)
        {
            canvas.fill_path(&full, Affine::IDENTITY, &opaque)?;
        }

        for mask in active {
            let a = mask.opacity.sample(self.local_ms).clamp(0.0, 1.0);
            let blend = match mask.mode {
                MaskMode::Add | MaskMode::None => PaintBlend::SourceOver,
                MaskMode::Subtract => PaintBlend::DestinationOut,
                MaskMode::Intersect => PaintBlend::DestinationIn,
            };
            canvas.save_layer(None, LayerComposite::Blend { blend, alpha: a });
            if mask.inverted {
                canvas.fill_path(&full, Affine::IDENTITY, &opaque)?;
                canvas.fill_path(
                    &mask.path,
                    matrix,
                    &opaque.clone().with_blend(PaintBlend::DestinationOut),
                )?;
            } else {
                canvas.fill_path(&mask.path, matrix, &opaque)?;
            }
            canvas.restore()?;
        }
        canvas.restore()
    }

    fn draw_content(
        &self,
        canvas: &mut dyn Canvas,
        matrix: Affine,
        alpha: f64,
        glyphs: &GlyphIndex,
        res: &mut DrawResources<'_>,
    ) -> KineticResult<()> {
        match &self.content {
            NodeContent::Shape(items) => {
                for item in items.iter().rev() {
                    let m = matrix * item.transform.sample(self.local_ms).to_affine();
                    if let Some(fill) = &item.fill {
                        let paint = Paint::solid(fill.color.sample(self.local_ms))
                            .with_alpha(alpha * fill.opacity.sample(self.local_ms).clamp(0.0, 1.0))
                            .with_color_filter(item.filter.clone());
                        canvas.fill_path(&item.path, m, &paint)?;
                    }
                    if let Some(stroke) = &item.stroke {
                        let paint = Paint::solid(stroke.color.sample(self.local_ms))
                            .with_alpha(
                                alpha * stroke.opacity.sample(self.local_ms).clamp(0.0, 1.0),
                            )
                            .with_color_filter(item.filter.clone());
                        let width = stroke.width.sample(self.local_ms);
                        canvas.stroke_path(&item.path, width, m, &paint)?;
                    }
                }
                Ok(())
            }
            NodeContent::Solid {
                color,
                width,
                height,
            } => {
                let rect = Rect::new(0.0, 0.0, *width, *height).to_path(0.1);
                let paint = Paint::solid(*color)
                    .with_alpha(alpha)
                    .with_color_filter(self.filter.clone());
                canvas.fill_path(&rect, matrix, &paint)
            }
            NodeContent::Image { image_id } => {
                let Some(bitmap) = res.images.resolve(image_id, res.manifest, res.target) else {
                    return Ok(());
                };
                let paint = Paint::default()
                    .with_alpha(alpha)
                    .with_color_filter(self.filter.clone());
                canvas.draw_bitmap(&bitmap, matrix, &paint)
            }
            NodeContent::Text { document } => {
                self.draw_text(canvas, matrix, alpha, document, glyphs, res)
            }
            NodeContent::PreComp {
                children,
                width,
                height,
                ..
            } => {
                if children.is_empty() {
                    return Ok(());
                }
                let clip = matrix.transform_rect_bbox(Rect::new(0.0, 0.0, *width, *height));
                canvas.save_layer(Some(clip), LayerComposite::normal(alpha));
                for child in children.iter().rev() {
                    child.draw(canvas, matrix, 1.0, glyphs, res)?;
                }
                canvas.restore()
            }
            NodeContent::Null => Ok(()),
        }
    }

    fn draw_text(
        &self,
        canvas: &mut dyn Canvas,
        matrix: Affine,
        alpha: f64,
        doc: &TextDocument,
        glyphs: &GlyphIndex,
        res: &mut DrawResources<'_>,
    ) -> KineticResult<()> {
        let text = match res.text_delegate {
            Some(d) => d.text_for(&self.name, &doc.text),
            None => doc.text.clone(),
        };
        let text = text.replace("\r\n", "\n");
        let lines: Vec<&str> = text.split(['\n', '\r']).collect();
        let advance = doc.line_advance();
        let paint = Paint::solid(doc.color)
            .with_alpha(alpha)
            .with_color_filter(self.filter.clone());

        let face = glyphs.get(&(doc.font_family.clone(), doc.font_style.clone()));
        let glyph_for = |ch: char| face.and_then(|f| f.get(&ch));
        let all_glyphs = face.is_some_and(|f| !f.is_empty())
            && lines
                .iter()
                .flat_map(|l| l.chars())
                .all(|ch| glyph_for(ch).is_some());

        if all_glyphs {
            for (i, line) in lines.iter().enumerate() {
                let mut x = 0.0;
                let y = i as f64 * advance;
                for ch in line.chars() {
                    let Some(g) = glyph_for(ch) else {
                        continue;
                    };
                    let s = if g.size > 0.0 { doc.size / g.size } else { 1.0 };
                    let m = matrix * Affine::translate((x, y)) * Affine::scale(s);
                    for path in &g.paths {
                        canvas.fill_path(path, m, &paint)?;
                    }
                    x += g.width * s + doc.tracking;
                }
            }
            return Ok(());
        }

        let Some(typeface) = res
            .fonts
            .resolve(&doc.font_family, &doc.font_style, res.target)
        else {
            return Ok(());
        };
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let run = TextRun {
                text: line,
                typeface: &typeface,
                size: doc.size,
                tracking: doc.tracking,
            };
            let m = matrix * Affine::translate((0.0, i as f64 * advance));
            canvas.draw_text(&run, m, &paint)?;
        }
        Ok(())
    }
}
