use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    assets::decode::Bitmap,
    assets::delegate::{FontAssetDelegate, ImageAssetDelegate, RenderTarget, TextDelegate},
    assets::store::{FontAssetCache, ImageAssetCache},
    canvas::backend::Canvas,
    composition::model::Composition,
    filter::color_filter::ColorFilter,
    filter::registry::{ColorFilterOverride, ColorFilterRegistry, ColorFilterTarget},
    foundation::core::{Affine, Rgba8},
    foundation::error::KineticResult,
    playback::controller::{PlaybackController, clamp_progress},
    playback::events::{ListenerId, PendingStart, PlaybackEvent, PlaybackListener, Scheduler},
    tree::node::DrawResources,
    tree::render_tree::{RenderTree, TreeStats},
};

/// Initial player settings.
#[derive(Clone, Debug)]
pub struct OrchestratorOpts {
    /// Signed playback speed; negative plays `1 -> 0`.
    pub speed: f64,
    /// Restart from the start bound when a cycle ends.
    pub looping: bool,
    /// Opacity multiplier for the whole composition.
    pub alpha: f64,
    /// Clear color applied before each draw.
    pub background: Option<Rgba8>,
    /// Folder image manifest entries are resolved against.
    pub image_assets_folder: Option<PathBuf>,
}

impl Default for OrchestratorOpts {
    fn default() -> Self {
        Self {
            speed: 1.0,
            looping: false,
            alpha: 1.0,
            background: None,
            image_assets_folder: None,
        }
    }
}

struct Inner {
    composition: Option<Arc<Composition>>,
    tree: Option<RenderTree>,
    generation: u64,
    controller: PlaybackController,
    registry: ColorFilterRegistry,
    images: ImageAssetCache,
    fonts: FontAssetCache,
    target: Option<RenderTarget>,
    text_delegate: Option<Arc<dyn TextDelegate>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    pending: PendingStart,
    scale: f64,
    alpha: f64,
    background: Option<Rgba8>,
    last_draw_scale: Option<f64>,
    events: Vec<PlaybackEvent>,
}

impl Inner {
    /// Push controller progress into the tree (once) and flag a new frame.
    fn sync_tree(&mut self) {
        if let Some(tree) = &mut self.tree {
            tree.set_progress(self.controller.progress());
            self.events.push(PlaybackEvent::FrameUpdated);
        }
    }

    fn invalidate(&mut self) {
        if self.tree.is_some() {
            self.events.push(PlaybackEvent::FrameUpdated);
        }
    }

    fn start(&mut self, reversed: bool, continuation: bool) {
        if self.tree.is_none() {
            self.pending = if reversed {
                PendingStart::ReversePending
            } else {
                PendingStart::PlayPending
            };
            tracing::debug!(pending = ?self.pending, "no composition yet; deferring start");
            return;
        }
        self.pending = PendingStart::None;
        self.controller.start(reversed, continuation);
        self.sync_tree();
    }

    fn clear_composition(&mut self) {
        self.controller.cancel();
        self.images.recycle_all();
        self.tree = None;
        self.composition = None;
        self.last_draw_scale = None;
    }
}

/// Top-level player: owns the active composition, its render tree, playback state, color filter
/// overrides and asset caches behind one lock.
///
/// Listener callbacks and scheduler notifications run after the lock is released, so they may
/// call back into the orchestrator.
pub struct RenderOrchestrator {
    inner: Mutex<Inner>,
}

impl Default for RenderOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorOpts::default())
    }
}

impl RenderOrchestrator {
    pub fn new(opts: OrchestratorOpts) -> Self {
        let mut controller = PlaybackController::new();
        controller.set_speed(opts.speed);
        controller.set_looping(opts.looping);
        Self {
            inner: Mutex::new(Inner {
                composition: None,
                tree: None,
                generation: 0,
                controller,
                registry: ColorFilterRegistry::new(),
                images: ImageAssetCache::new(opts.image_assets_folder),
                fonts: FontAssetCache::new(),
                target: None,
                text_delegate: None,
                scheduler: None,
                pending: PendingStart::None,
                scale: 1.0,
                alpha: opts.alpha.clamp(0.0, 1.0),
                background: opts.background,
                last_draw_scale: None,
                events: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the lock, then dispatch produced events and scheduler changes outside it.
    fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (out, events, listeners, scheduler) = {
            let mut inner = self.lock();
            let was_running = inner.controller.is_running();
            let out = f(&mut *inner);

            let mut events = inner.controller.drain_events();
            events.append(&mut inner.events);
            let listeners = if events.is_empty() {
                Vec::new()
            } else {
                inner.controller.listeners.snapshot()
            };
            let running = inner.controller.is_running();
            let scheduler = if running != was_running {
                inner.scheduler.clone().map(|s| (s, running))
            } else {
                None
            };
            (out, events, listeners, scheduler)
        };

        if let Some((s, active)) = scheduler {
            s.set_active(active);
        }
        for event in &events {
            for l in &listeners {
                l.on_event(event);
            }
        }
        out
    }

    /// Swap in a new composition. Returns `false` (and does nothing) if `comp` is already active.
    #[tracing::instrument(skip_all, fields(layers = comp.layers.len()))]
    pub fn set_composition(&self, comp: Arc<Composition>) -> bool {
        self.mutate(|inner| {
            if let Some(cur) = &inner.composition
                && Arc::ptr_eq(cur, &comp)
            {
                return false;
            }
            if let Err(e) = comp.validate() {
                tracing::warn!(error = %e, "composition failed validation; rendering anyway");
            }

            inner.images.recycle_all();
            inner.tree = None;
            inner.composition = Some(Arc::clone(&comp));
            inner.controller.set_duration_ms(comp.duration_ms);
            inner.scale = 1.0;
            inner.last_draw_scale = None;

            inner.generation += 1;
            let mut tree = RenderTree::build(&comp, inner.generation);
            inner.registry.replay(&mut tree);
            inner.tree = Some(tree);
            inner.sync_tree();

            match std::mem::take(&mut inner.pending) {
                PendingStart::None => {}
                PendingStart::PlayPending => {
                    tracing::debug!("firing deferred play");
                    inner.start(false, false);
                }
                PendingStart::ReversePending => {
                    tracing::debug!("firing deferred reverse");
                    inner.start(true, false);
                }
            }
            true
        })
    }

    /// Drop the active composition and its tree; bitmaps are recycled.
    pub fn clear_composition(&self) {
        self.mutate(Inner::clear_composition);
    }

    pub fn composition(&self) -> Option<Arc<Composition>> {
        self.lock().composition.clone()
    }

    /// Start from the start bound, or continue when progress is strictly inside `(0, 1)`.
    pub fn play(&self) {
        self.mutate(|inner| inner.start(false, false));
    }

    /// Like [`RenderOrchestrator::play`] with the direction inverted.
    pub fn reverse(&self) {
        self.mutate(|inner| inner.start(true, false));
    }

    /// Continue forward from the current progress.
    pub fn resume(&self) {
        self.mutate(|inner| inner.start(false, true));
    }

    /// Continue in reverse from the current progress.
    pub fn resume_reverse(&self) {
        self.mutate(|inner| inner.start(true, true));
    }

    /// Stop immediately and forget any deferred start.
    pub fn cancel(&self) {
        self.mutate(|inner| {
            inner.pending = PendingStart::None;
            inner.controller.cancel();
        });
    }

    /// Advance playback by `elapsed_ms` of wall time; called by the host clock.
    pub fn tick(&self, elapsed_ms: f64) {
        self.mutate(|inner| {
            if inner.controller.advance(elapsed_ms).is_some() {
                inner.sync_tree();
            }
            tracing::trace!(elapsed_ms, progress = inner.controller.progress(), "tick");
        });
    }

    pub fn is_animating(&self) -> bool {
        self.lock().controller.is_running()
    }

    pub fn pending_start(&self) -> PendingStart {
        self.lock().pending
    }

    pub fn progress(&self) -> f64 {
        self.lock().controller.progress()
    }

    /// Jump to `progress` (clamped to `[0, 1]`, NaN treated as `0`).
    pub fn set_progress(&self, progress: f64) {
        self.mutate(|inner| {
            inner.controller.set_progress(clamp_progress(progress));
            inner.sync_tree();
        });
    }

    pub fn speed(&self) -> f64 {
        self.lock().controller.speed()
    }

    /// Signed speed: the sign picks the direction, the magnitude scales the duration.
    pub fn set_speed(&self, speed: f64) {
        self.mutate(|inner| inner.controller.set_speed(speed));
    }

    /// `duration / |speed|` of the active composition.
    pub fn effective_duration_ms(&self) -> Option<f64> {
        let inner = self.lock();
        inner
            .composition
            .as_ref()
            .map(|_| inner.controller.effective_duration_ms())
    }

    pub fn looping(&self) -> bool {
        self.lock().controller.looping()
    }

    pub fn set_looping(&self, looping: bool) {
        self.mutate(|inner| inner.controller.set_looping(looping));
    }

    pub fn scale(&self) -> f64 {
        self.lock().scale
    }

    /// Set the output scale; non-finite or non-positive values are ignored.
    pub fn set_scale(&self, scale: f64) {
        if !scale.is_finite() || scale <= 0.0 {
            tracing::warn!(scale, "ignoring invalid scale");
            return;
        }
        self.mutate(|inner| {
            inner.scale = scale;
            inner.invalidate();
        });
    }

    pub fn alpha(&self) -> f64 {
        self.lock().alpha
    }

    pub fn set_alpha(&self, alpha: f64) {
        self.mutate(|inner| {
            inner.alpha = if alpha.is_nan() { 1.0 } else { alpha.clamp(0.0, 1.0) };
            inner.invalidate();
        });
    }

    pub fn set_background(&self, background: Option<Rgba8>) {
        self.mutate(|inner| {
            inner.background = background;
            inner.invalidate();
        });
    }

    /// Composition width times scale, or `-1` without a composition.
    pub fn intrinsic_width(&self) -> i32 {
        let inner = self.lock();
        inner
            .composition
            .as_ref()
            .map_or(-1, |c| c.bounds.scaled(inner.scale).0)
    }

    /// Composition height times scale, or `-1` without a composition.
    pub fn intrinsic_height(&self) -> i32 {
        let inner = self.lock();
        inner
            .composition
            .as_ref()
            .map_or(-1, |c| c.bounds.scaled(inner.scale).1)
    }

    pub fn has_masks(&self) -> bool {
        self.lock().tree.as_ref().is_some_and(RenderTree::has_masks)
    }

    pub fn has_matte(&self) -> bool {
        self.lock().tree.as_ref().is_some_and(RenderTree::has_matte)
    }

    /// Render the current frame. A no-op without a composition.
    #[tracing::instrument(skip_all)]
    pub fn draw(&self, canvas: &mut dyn Canvas) -> KineticResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let (Some(tree), Some(comp)) = (&inner.tree, &inner.composition) else {
            tracing::trace!("draw without composition");
            return Ok(());
        };

        let (cw, ch) = canvas.size();
        let mut scale = inner.scale;
        if tree.has_matte() {
            let bounds = tree.bounds();
            let fit = (f64::from(cw) / f64::from(bounds.width))
                .min(f64::from(ch) / f64::from(bounds.height));
            scale = scale.min(fit);
        }
        inner.last_draw_scale = Some(scale);

        if let Some(bg) = inner.background {
            canvas.clear(bg);
        }
        let mut res = DrawResources {
            images: &mut inner.images,
            fonts: &mut inner.fonts,
            manifest: &comp.images,
            target: inner.target.as_ref(),
            text_delegate: inner.text_delegate.as_deref(),
        };
        tree.draw(canvas, Affine::scale(scale), inner.alpha, &mut res)
    }

    /// Uniform scale used by the last draw.
    pub fn last_draw_scale(&self) -> Option<f64> {
        self.lock().last_draw_scale
    }

    /// Override the paint color of one content item inside `layer`.
    pub fn add_color_filter_to_content(
        &self,
        layer: &str,
        content: &str,
        filter: Option<ColorFilter>,
    ) {
        self.set_color_filter(Some(layer), Some(content), filter);
    }

    /// Override the paint color of every content item of `layer`.
    pub fn add_color_filter_to_layer(&self, layer: &str, filter: Option<ColorFilter>) {
        self.set_color_filter(Some(layer), None, filter);
    }

    /// Override the paint color of everything.
    pub fn add_color_filter(&self, filter: Option<ColorFilter>) {
        self.set_color_filter(None, None, filter);
    }

    fn set_color_filter(
        &self,
        layer: Option<&str>,
        content: Option<&str>,
        filter: Option<ColorFilter>,
    ) {
        self.mutate(|inner| {
            let target = inner.tree.as_mut().map(|t| t as &mut dyn ColorFilterTarget);
            inner.registry.set(layer, content, filter, target);
            inner.invalidate();
        });
    }

    /// Remove every override and clear filters on the tree.
    pub fn clear_color_filters(&self) {
        self.mutate(|inner| {
            let target = inner.tree.as_mut().map(|t| t as &mut dyn ColorFilterTarget);
            inner.registry.clear(target);
            inner.invalidate();
        });
    }

    /// Stored override records, least specific first.
    pub fn color_filters(&self) -> Vec<ColorFilterOverride> {
        self.lock().registry.snapshot()
    }

    pub fn image_assets_folder(&self) -> Option<PathBuf> {
        self.lock().images.folder().map(Path::to_path_buf)
    }

    pub fn set_image_assets_folder(&self, folder: Option<PathBuf>) {
        self.mutate(|inner| inner.images.set_folder(folder));
    }

    pub fn set_image_delegate(&self, delegate: Option<Arc<dyn ImageAssetDelegate>>) {
        self.mutate(|inner| {
            inner.images.set_delegate(delegate);
            inner.invalidate();
        });
    }

    pub fn set_font_delegate(&self, delegate: Option<Arc<dyn FontAssetDelegate>>) {
        self.mutate(|inner| {
            inner.fonts.set_delegate(delegate);
            inner.invalidate();
        });
    }

    pub fn set_text_delegate(&self, delegate: Option<Arc<dyn TextDelegate>>) {
        self.mutate(|inner| {
            inner.text_delegate = delegate;
            inner.invalidate();
        });
    }

    /// Replace (`Some`) or drop (`None`) a cached bitmap, returning the previous one.
    ///
    /// Requires an attached render target; otherwise logs and returns `None`.
    pub fn update_bitmap(&self, id: &str, bitmap: Option<Bitmap>) -> Option<Arc<Bitmap>> {
        self.mutate(|inner| {
            if inner.target.is_none() {
                tracing::warn!(id, "cannot update bitmap: no render target attached");
                return None;
            }
            let prev = inner.images.update(id, bitmap);
            inner.invalidate();
            prev
        })
    }

    /// Release every cached bitmap; the tree re-resolves them on the next draw.
    pub fn recycle_bitmaps(&self) {
        self.mutate(|inner| inner.images.recycle_all());
    }

    /// Bind the rendering device bitmaps and fonts are resolved with.
    pub fn attach(&self, target: RenderTarget) {
        self.mutate(|inner| {
            inner.target = Some(target);
            inner.images.forget_failures();
            inner.fonts.forget_missing();
            inner.invalidate();
        });
    }

    /// Release the rendering device; its bitmaps are recycled.
    pub fn detach(&self) {
        self.mutate(|inner| {
            inner.images.recycle_all();
            inner.target = None;
        });
    }

    pub fn is_attached(&self) -> bool {
        self.lock().target.is_some()
    }

    /// Install the host frame clock; it is told the current running state right away.
    pub fn set_scheduler(&self, scheduler: Option<Arc<dyn Scheduler>>) {
        let running = self.mutate(|inner| {
            inner.scheduler.clone_from(&scheduler);
            inner.controller.is_running()
        });
        if let Some(s) = scheduler {
            s.set_active(running);
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn PlaybackListener>) -> ListenerId {
        self.lock().controller.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().controller.listeners.remove(id)
    }

    pub fn remove_all_listeners(&self) {
        self.lock().controller.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.lock().controller.listeners.len()
    }

    /// Build and progress counters of the current tree.
    pub fn tree_stats(&self) -> Option<TreeStats> {
        self.lock().tree.as_ref().map(RenderTree::stats)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/orchestrator.rs"]
mod tests;
