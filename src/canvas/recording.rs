use crate::{
    assets::decode::Bitmap,
    canvas::backend::{Canvas, LayerComposite, Paint, TextRun},
    foundation::core::{Affine, BezPath, Rect, Rgba8},
    foundation::error::{KineticError, KineticResult},
};

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba8),
    FillPath {
        path: BezPath,
        transform: Affine,
        paint: Paint,
    },
    StrokePath {
        path: BezPath,
        width: f64,
        transform: Affine,
        paint: Paint,
    },
    DrawBitmap {
        width: u32,
        height: u32,
        transform: Affine,
        paint: Paint,
    },
    DrawText {
        text: String,
        family: String,
        size: f64,
        transform: Affine,
        paint: Paint,
    },
    SaveLayer {
        bounds: Option<Rect>,
        composite: LayerComposite,
    },
    Restore,
}

/// Canvas that records every call instead of rasterizing.
#[derive(Clone, Debug)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    depth: usize,
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 0,
            commands: Vec::new(),
        }
    }

    /// Recorded calls, in order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drop recorded calls, keeping the size.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.depth = 0;
    }

    /// Currently open layers.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Paints of every fill, in order.
    pub fn fills(&self) -> impl Iterator<Item = (&BezPath, Affine, &Paint)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::FillPath {
                path,
                transform,
                paint,
            } => Some((path, *transform, paint)),
            _ => None,
        })
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba8) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_path(
        &mut self,
        path: &BezPath,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        self.commands.push(DrawCommand::FillPath {
            path: path.clone(),
            transform,
            paint: paint.clone(),
        });
        Ok(())
    }

    fn stroke_path(
        &mut self,
        path: &BezPath,
        width: f64,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        self.commands.push(DrawCommand::StrokePath {
            path: path.clone(),
            width,
            transform,
            paint: paint.clone(),
        });
        Ok(())
    }

    fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        self.commands.push(DrawCommand::DrawBitmap {
            width: bitmap.width,
            height: bitmap.height,
            transform,
            paint: paint.clone(),
        });
        Ok(())
    }

    fn draw_text(
        &mut self,
        run: &TextRun<'_>,
        transform: Affine,
        paint: &Paint,
    ) -> KineticResult<()> {
        self.commands.push(DrawCommand::DrawText {
            text: run.text.to_string(),
            family: run.typeface.family.clone(),
            size: run.size,
            transform,
            paint: paint.clone(),
        });
        Ok(())
    }

    fn save_layer(&mut self, bounds: Option<Rect>, composite: LayerComposite) {
        self.depth += 1;
        self.commands
            .push(DrawCommand::SaveLayer { bounds, composite });
    }

    fn restore(&mut self) -> KineticResult<()> {
        if self.depth == 0 {
            return Err(KineticError::render("restore without a matching save_layer"));
        }
        self.depth -= 1;
        self.commands.push(DrawCommand::Restore);
        Ok(())
    }
}
