use std::sync::Arc;

use crate::{
    assets::decode::Bitmap,
    canvas::backend::{Canvas, FrameRGBA, LayerComposite, Paint, PaintBlend, TextRun},
    canvas::text::TextLayoutEngine,
    composition::model::MatteMode,
    foundation::core::{Affine, BezPath, Rect, Rgba8},
    foundation::error::{KineticError, KineticResult},
    foundation::math::{
        premul_dst_in_in_place, premul_dst_out_in_place, premul_luma, premul_over_in_place,
        scale_by_coverage_in_place,
    },
};

/// Options for [`CpuCanvas`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuCanvasOpts {
    pub(crate) clear_rgba: Option<Rgba8>,
}

impl CpuCanvasOpts {
    /// Return options with a clear color applied when the canvas is created.
    pub fn with_clear(mut self, clear: Option<Rgba8>) -> Self {
        self.clear_rgba = clear;
        self
    }
}

struct LayerFrame {
    pixmap: vello_cpu::Pixmap,
    composite: LayerComposite,
    bounds: Option<Rect>,
}

/// Raster canvas on `vello_cpu`.
///
/// Every draw is rasterized into a scratch pixmap and merged into the innermost layer with the
/// paint's blend; offscreen layers are premultiplied RGBA8 pixmaps merged on restore.
pub struct CpuCanvas {
    width: u16,
    height: u16,
    stack: Vec<LayerFrame>,
    scratch: vello_cpu::Pixmap,
    ctx: Option<vello_cpu::RenderContext>,
    text: TextLayoutEngine,
}

impl CpuCanvas {
    pub fn new(width: u32, height: u32, opts: CpuCanvasOpts) -> KineticResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| KineticError::validation("canvas width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| KineticError::validation("canvas height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(KineticError::validation("canvas size must be > 0"));
        }

        let mut canvas = Self {
            width: w,
            height: h,
            stack: vec![LayerFrame {
                pixmap: vello_cpu::Pixmap::new(w, h),
                composite: LayerComposite::normal(1.0),
                bounds: None,
            }],
            scratch: vello_cpu::Pixmap::new(w, h),
            ctx: None,
            text: TextLayoutEngine::new(),
        };
        if let Some(c) = opts.clear_rgba {
            canvas.clear(c);
        }
        Ok(canvas)
    }

    /// Premultiplied pixel at `(x, y)` of the base layer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= u32::from(self.width) || y >= u32::from(self.height) {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let data = self.stack[0].pixmap.data_as_u8_slice();
        Some([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]])
    }

    /// Close any layers left open and read back the base layer.
    pub fn into_frame(mut self) -> KineticResult<FrameRGBA> {
        if self.stack.len() > 1 {
            tracing::warn!(open = self.stack.len() - 1, "closing unbalanced canvas layers");
        }
        while self.stack.len() > 1 {
            self.restore()?;
        }
        Ok(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.stack[0].pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn render_draw(
        &mut self,
        blend: PaintBlend,
        f: impl FnOnce(&mut vello_cpu::RenderContext),
    ) -> KineticResult<()> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => vello_cpu::RenderContext::new(self.width, self.height),
        };
        ctx.reset();
        f(&mut ctx);
        ctx.flush();

        // `vello_cpu` renders into a fresh buffer, so draws land in scratch and get merged here.
        clear_pixmap_to_transparent(&mut self.scratch);
        ctx.render_to_pixmap(&mut self.scratch);
        self.ctx = Some(ctx);

        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| KineticError::render("canvas layer stack is empty"))?;
        let dst = frame.pixmap.data_as_u8_slice_mut();
        let src = self.scratch.data_as_u8_slice();
        match blend {
            PaintBlend::SourceOver => premul_over_in_place(dst, src, 1.0),
            PaintBlend::DestinationOut => premul_dst_out_in_place(dst, src, 1.0),
            PaintBlend::DestinationIn => premul_dst_in_in_place(dst, src, 1.0),
        }
        Ok(())
    }
}

impl Canvas for CpuCanvas {
    fn size(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }

    fn clear(&mut self, color: Rgba8) {
        if let Some(frame) = self.stack.last_mut() {
            clear_pixmap(&mut frame.pixmap, color.premultiplied().to_array());
        }
    }

    fn fill_path(
        &mut self,
        path: &BezPath,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        let c = paint.effective_color();
        let cpu_path = bezpath_to_cpu(path);
        self.render_draw(paint.blend, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
            ctx.fill_path(&cpu_path);
        })
    }

    fn stroke_path(
        &mut self,
        path: &BezPath,
        width: f64,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        if !width.is_finite() || width <= 0.0 {
            return Ok(());
        }
        let c = paint.effective_color();
        let cpu_path = bezpath_to_cpu(path);
        self.render_draw(paint.blend, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
            ctx.stroke_path(&cpu_path);
        })
    }

    fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        let pixmap = match &paint.color_filter {
            Some(filter) => {
                let mut bytes = bitmap.rgba8_premul.as_ref().clone();
                filter.apply_premul_in_place(&mut bytes);
                pixmap_from_premul_bytes(&bytes, bitmap.width, bitmap.height)?
            }
            None => pixmap_from_premul_bytes(&bitmap.rgba8_premul, bitmap.width, bitmap.height)?,
        };
        let image = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        let opacity = paint.alpha.clamp(0.0, 1.0) as f32;
        let (w, h) = (f64::from(bitmap.width), f64::from(bitmap.height));
        self.render_draw(paint.blend, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(image);
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity);
            }
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            if opacity < 1.0 {
                ctx.pop_layer();
            }
        })
    }

    fn draw_text(
        &mut self,
        run: &TextRun<'_>,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        if run.text.is_empty() {
            return Ok(());
        }
        let c = paint.effective_color();
        let shaped = self.text.layout_line(
            run.text,
            run.typeface,
            run.size as f32,
            run.tracking as f32,
            c,
        )?;
        let baseline = f64::from(shaped.baseline());
        let tr = transform * Affine::translate((0.0, -baseline));
        self.render_draw(paint.blend, |ctx| {
            ctx.set_transform(affine_to_cpu(tr));
            for line in shaped.layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                        continue;
                    };
                    let brush = glyph_run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    let glyphs = glyph_run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&shaped.font)
                        .font_size(glyph_run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        })
    }

    fn save_layer(&mut self, bounds: Option<Rect>, composite: LayerComposite) {
        self.stack.push(LayerFrame {
            pixmap: vello_cpu::Pixmap::new(self.width, self.height),
            composite,
            bounds,
        });
    }

    fn restore(&mut self) -> KineticResult<()> {
        if self.stack.len() <= 1 {
            return Err(KineticError::render("restore without a matching save_layer"));
        }
        let Some(mut layer) = self.stack.pop() else {
            return Err(KineticError::render("canvas layer stack is empty"));
        };
        if let Some(bounds) = layer.bounds {
            clip_pixmap_to(&mut layer.pixmap, bounds);
        }
        let below = self
            .stack
            .last_mut()
            .ok_or_else(|| KineticError::render("canvas layer stack is empty"))?;
        let dst = below.pixmap.data_as_u8_slice_mut();
        let src = layer.pixmap.data_as_u8_slice();
        match layer.composite {
            LayerComposite::Blend { blend, alpha } => match blend {
                PaintBlend::SourceOver => premul_over_in_place(dst, src, alpha),
                PaintBlend::DestinationOut => premul_dst_out_in_place(dst, src, alpha),
                PaintBlend::DestinationIn => premul_dst_in_in_place(dst, src, alpha),
            },
            LayerComposite::Matte(mode) => {
                let coverage = src.chunks_exact(4).map(move |px| matte_coverage(mode, px));
                scale_by_coverage_in_place(dst, coverage);
            }
        }
        Ok(())
    }
}

fn matte_coverage(mode: MatteMode, px: &[u8]) -> u16 {
    match mode {
        MatteMode::Alpha => u16::from(px[3]),
        MatteMode::AlphaInverted => 255 - u16::from(px[3]),
        MatteMode::Luma => premul_luma(px),
        MatteMode::LumaInverted => 255 - premul_luma(px),
    }
}

fn clip_pixmap_to(pixmap: &mut vello_cpu::Pixmap, bounds: Rect) {
    let w = i64::from(pixmap.width());
    let h = i64::from(pixmap.height());
    let x0 = (bounds.x0.floor() as i64).clamp(0, w);
    let y0 = (bounds.y0.floor() as i64).clamp(0, h);
    let x1 = (bounds.x1.ceil() as i64).clamp(x0, w);
    let y1 = (bounds.y1.ceil() as i64).clamp(y0, h);

    let data = pixmap.data_as_u8_slice_mut();
    for (y, row) in data.chunks_exact_mut((w as usize) * 4).enumerate() {
        let y = y as i64;
        if y < y0 || y >= y1 {
            row.fill(0);
            continue;
        }
        row[..(x0 as usize) * 4].fill(0);
        row[(x1 as usize) * 4..].fill(0);
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> KineticResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| KineticError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| KineticError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(KineticError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/cpu.rs"]
mod tests;
