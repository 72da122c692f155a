use std::path::PathBuf;
use std::sync::Arc;

/// Resolved font face: raw font bytes plus the names it was requested by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typeface {
    /// Requested family.
    pub family: String,
    /// Requested style.
    pub style: String,
    /// TrueType/OpenType font file bytes.
    pub data: Arc<Vec<u8>>,
}

/// Host-level font family lookup, bound as part of a [`crate::RenderTarget`].
pub trait TypefaceResolver: Send + Sync {
    /// Resolve `family`/`style` to a typeface, or `None` when the host has no match.
    fn resolve(&self, family: &str, style: &str) -> Option<Typeface>;
}

/// Resolves `<dir>/<family>-<style>.{ttf,otf}`, then `<dir>/<family>.{ttf,otf}`.
#[derive(Clone, Debug)]
pub struct FontFolderResolver {
    dir: PathBuf,
}

impl FontFolderResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, family: &str, style: &str) -> Vec<PathBuf> {
        let mut stems = Vec::with_capacity(2);
        if !style.is_empty() {
            stems.push(format!("{family}-{style}"));
        }
        stems.push(family.to_string());

        stems
            .iter()
            .flat_map(|stem| {
                ["ttf", "otf"]
                    .into_iter()
                    .map(move |ext| self.dir.join(format!("{stem}.{ext}")))
            })
            .collect()
    }
}

impl TypefaceResolver for FontFolderResolver {
    fn resolve(&self, family: &str, style: &str) -> Option<Typeface> {
        if family.is_empty() || family.contains(['/', '\\']) || family.contains("..") {
            tracing::warn!(family, "refusing to resolve font family with path separators");
            return None;
        }
        for path in self.candidates(family, style) {
            match std::fs::read(&path) {
                Ok(bytes) => {
                    tracing::debug!(path = %path.display(), "resolved font file");
                    return Some(Typeface {
                        family: family.to_string(),
                        style: style.to_string(),
                        data: Arc::new(bytes),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read font file");
                }
            }
        }
        None
    }
}

/// Font resolver that never finds anything; used when no font folder is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFonts;

impl TypefaceResolver for NoFonts {
    fn resolve(&self, _family: &str, _style: &str) -> Option<Typeface> {
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
