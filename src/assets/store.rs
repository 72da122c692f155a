use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::assets::decode::Bitmap;
use crate::assets::delegate::{FontAssetDelegate, ImageAssetDelegate, RenderTarget};
use crate::assets::fonts::Typeface;
use crate::composition::model::ImageAsset;
use crate::foundation::error::{KineticError, KineticResult};

/// Normalize and validate composition-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> KineticResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(KineticError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(KineticError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(KineticError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(KineticError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Lazily decoded bitmaps keyed by image asset id.
///
/// Entries are created on first draw and dropped wholesale by [`ImageAssetCache::recycle_all`]
/// (composition swap, detach, explicit recycle). Ids that failed to resolve are remembered until
/// the next recycle so they are not retried every frame.
#[derive(Default)]
pub struct ImageAssetCache {
    folder: Option<PathBuf>,
    delegate: Option<Arc<dyn ImageAssetDelegate>>,
    bitmaps: HashMap<String, Arc<Bitmap>>,
    failed: HashSet<String>,
    decode_counts: HashMap<String, u64>,
}

impl ImageAssetCache {
    pub fn new(folder: Option<PathBuf>) -> Self {
        Self {
            folder,
            ..Self::default()
        }
    }

    /// Folder image files are resolved against.
    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// Change the assets folder; cached bitmaps are recycled when it differs.
    pub fn set_folder(&mut self, folder: Option<PathBuf>) {
        if self.folder != folder {
            self.recycle_all();
            self.folder = folder;
        }
    }

    /// Install or remove the image delegate; cached bitmaps are recycled.
    pub fn set_delegate(&mut self, delegate: Option<Arc<dyn ImageAssetDelegate>>) {
        self.recycle_all();
        self.delegate = delegate;
    }

    /// Cached bitmap for `id`, resolving it on a miss.
    ///
    /// Returns `None` (with a warning) when no device is attached, the id is not in the manifest,
    /// or the bitmap cannot be produced.
    pub fn resolve(
        &mut self,
        id: &str,
        manifest: &BTreeMap<String, ImageAsset>,
        device: Option<&RenderTarget>,
    ) -> Option<Arc<Bitmap>> {
        if let Some(b) = self.bitmaps.get(id) {
            return Some(Arc::clone(b));
        }
        if self.failed.contains(id) {
            return None;
        }
        let Some(device) = device else {
            tracing::warn!(id, "cannot resolve image: no render target attached");
            return None;
        };
        let Some(asset) = manifest.get(id) else {
            tracing::warn!(id, "image id not present in the composition manifest");
            self.failed.insert(id.to_string());
            return None;
        };

        tracing::debug!(id, "image cache miss");
        let bitmap = if let Some(delegate) = &self.delegate {
            let fetched = delegate.fetch_bitmap(asset);
            if fetched.is_none() {
                tracing::warn!(id, "image delegate returned no bitmap");
            }
            fetched
        } else {
            match self.load(asset, device) {
                Ok(b) => {
                    *self.decode_counts.entry(id.to_string()).or_default() += 1;
                    Some(b)
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "failed to load image asset");
                    None
                }
            }
        };
        let Some(bitmap) = bitmap else {
            self.failed.insert(id.to_string());
            return None;
        };

        let bitmap = Arc::new(bitmap);
        self.bitmaps.insert(id.to_string(), Arc::clone(&bitmap));
        Some(bitmap)
    }

    fn load(&self, asset: &ImageAsset, device: &RenderTarget) -> KineticResult<Bitmap> {
        if let Some(bytes) = &asset.embedded {
            return device.decoder.decode(bytes);
        }
        let Some(folder) = &self.folder else {
            return Err(KineticError::resource(format!(
                "image '{}' needs an image assets folder",
                asset.id
            )));
        };
        let rel = normalize_rel_path(&asset.rel_path())?;
        let path = folder.join(Path::new(&rel));
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read image asset '{}'", path.display()))?;
        device.decoder.decode(&bytes)
    }

    /// Replace (`Some`) or drop (`None`) the bitmap for `id`, returning the previous one.
    pub fn update(&mut self, id: &str, bitmap: Option<Bitmap>) -> Option<Arc<Bitmap>> {
        self.failed.remove(id);
        match bitmap {
            Some(b) => self.bitmaps.insert(id.to_string(), Arc::new(b)),
            None => self.bitmaps.remove(id),
        }
    }

    /// Release every cached bitmap. Idempotent.
    pub fn recycle_all(&mut self) {
        if !self.bitmaps.is_empty() {
            tracing::debug!(count = self.bitmaps.len(), "recycling bitmaps");
        }
        self.bitmaps.clear();
        self.failed.clear();
    }

    /// Forget ids that failed to resolve so the next draw retries them.
    pub fn forget_failures(&mut self) {
        self.failed.clear();
    }

    /// Number of cached bitmaps.
    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    /// How many times `id` was decoded from bytes.
    pub fn decode_count(&self, id: &str) -> u64 {
        self.decode_counts.get(id).copied().unwrap_or(0)
    }
}

/// Memoized typefaces keyed by `(family, style)`.
///
/// Survives composition swaps; reset only when the font delegate changes. Lookups that found
/// nothing are remembered the same way, until the delegate or the device changes.
#[derive(Default)]
pub struct FontAssetCache {
    delegate: Option<Arc<dyn FontAssetDelegate>>,
    fonts: HashMap<(String, String), Typeface>,
    missing: HashSet<(String, String)>,
}

impl FontAssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or remove the font delegate; memoized fonts are dropped.
    pub fn set_delegate(&mut self, delegate: Option<Arc<dyn FontAssetDelegate>>) {
        self.fonts.clear();
        self.missing.clear();
        self.delegate = delegate;
    }

    /// Memoized resolution through the delegate, then the device.
    pub fn resolve(
        &mut self,
        family: &str,
        style: &str,
        device: Option<&RenderTarget>,
    ) -> Option<Typeface> {
        let key = (family.to_string(), style.to_string());
        if let Some(t) = self.fonts.get(&key) {
            return Some(t.clone());
        }
        if self.missing.contains(&key) {
            return None;
        }
        let Some(device) = device else {
            tracing::warn!(family, style, "cannot resolve font: no render target attached");
            return None;
        };

        let resolved = self
            .delegate
            .as_ref()
            .and_then(|d| d.fetch_font(family, style))
            .or_else(|| device.typefaces.resolve(family, style));
        match &resolved {
            Some(t) => {
                tracing::debug!(family, style, "font resolved");
                self.fonts.insert(key, t.clone());
            }
            None => {
                tracing::warn!(family, style, "font not found");
                self.missing.insert(key);
            }
        }
        resolved
    }

    /// Forget lookups that found nothing so the next draw retries them.
    pub fn forget_missing(&mut self) {
        self.missing.clear();
    }

    /// Number of memoized typefaces.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
