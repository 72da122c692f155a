//! Kinetic is a vector-animation render-tree engine.
//!
//! A [`RenderOrchestrator`] owns one active [`Composition`], builds a [`RenderTree`] from it and
//! drives it with normalized progress:
//!
//! - Load a [`Composition`] (usually deserialized from JSON) and hand it over as an `Arc`
//! - Control playback (`play`, `reverse`, `cancel`, `set_progress`, `set_speed`) and feed `tick`
//!   from a host frame clock
//! - Draw into any [`Canvas`]: a [`CpuCanvas`] raster target or a [`RecordingCanvas`]
#![forbid(unsafe_code)]

pub(crate) mod animation;
pub(crate) mod assets;
pub(crate) mod canvas;
pub(crate) mod composition;
pub(crate) mod filter;
pub(crate) mod foundation;
pub(crate) mod playback;
pub(crate) mod player;
pub(crate) mod tree;

pub use crate::foundation::core::{
    Affine, BezPath, Bounds, Point, Rect, Rgba8, Rgba8Premul, Size, Transform2D, Vec2,
};
pub use crate::foundation::error::{KineticError, KineticResult};

pub use crate::animation::anim::{Animated, InterpMode, Keyframe, Keyframes, Lerp};
pub use crate::animation::ease::Ease;
pub use crate::assets::decode::{Bitmap, BitmapDecoder, ImageDecoder};
pub use crate::assets::delegate::{
    FontAssetDelegate, ImageAssetDelegate, RenderTarget, TextDelegate,
};
pub use crate::assets::fonts::{FontFolderResolver, NoFonts, Typeface, TypefaceResolver};
pub use crate::assets::store::{FontAssetCache, ImageAssetCache, normalize_rel_path};
pub use crate::canvas::backend::{Canvas, FrameRGBA, LayerComposite, Paint, PaintBlend, TextRun};
pub use crate::canvas::cpu::{CpuCanvas, CpuCanvasOpts};
pub use crate::canvas::recording::{DrawCommand, RecordingCanvas};
pub use crate::composition::model::{
    CharacterGlyph, Composition, Fill, ImageAsset, Layer, LayerKind, Mask, MaskMode, MatteMode,
    ShapeContent, Stroke, TextDocument,
};
pub use crate::filter::color_filter::ColorFilter;
pub use crate::filter::registry::{
    ColorFilterOverride, ColorFilterRegistry, ColorFilterTarget, FilterKey,
};
pub use crate::playback::controller::PlaybackController;
pub use crate::playback::events::{
    ListenerId, PendingStart, PlaybackEvent, PlaybackListener, Scheduler,
};
pub use crate::player::orchestrator::{OrchestratorOpts, RenderOrchestrator};
pub use crate::tree::node::DrawResources;
pub use crate::tree::render_tree::{RenderTree, TreeStats};
