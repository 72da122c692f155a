use crate::{
    canvas::backend::Canvas,
    composition::model::Composition,
    filter::color_filter::ColorFilter,
    filter::registry::ColorFilterTarget,
    foundation::core::{Affine, Bounds},
    foundation::error::KineticResult,
    tree::node::{DrawResources, GlyphIndex, RenderNode, build_nodes},
};

/// Build and progress counters of a render tree, for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeStats {
    /// Build generation; bumps on every rebuild.
    pub generation: u64,
    /// Nodes including matte sources and nested children.
    pub node_count: usize,
    /// `set_progress` calls since the tree was built.
    pub progress_updates: u64,
    /// Nodes that observed the latest `set_progress` call.
    pub synced_nodes: usize,
    /// Last progress pushed into the tree.
    pub progress: f64,
}

/// Drawable node tree built from one composition.
pub struct RenderTree {
    nodes: Vec<RenderNode>,
    glyphs: GlyphIndex,
    bounds: Bounds,
    duration_ms: f64,
    generation: u64,
    progress: f64,
    progress_updates: u64,
    has_masks: bool,
    has_matte: bool,
}

impl RenderTree {
    /// Build a tree from `comp`; `generation` tags the build for diagnostics.
    #[tracing::instrument(skip(comp), fields(layers = comp.layers.len()))]
    pub fn build(comp: &Composition, generation: u64) -> Self {
        let nodes = build_nodes(&comp.layers);
        let mut glyphs = GlyphIndex::new();
        for g in &comp.characters {
            glyphs
                .entry((g.family.clone(), g.style.clone()))
                .or_default()
                .insert(g.ch, g.clone());
        }

        let mut has_masks = false;
        let mut has_matte = false;
        let mut count = 0usize;
        for n in &nodes {
            n.visit(&mut |node| {
                count += 1;
                has_masks |= node.has_masks();
                has_matte |= node.has_matte();
            });
        }
        tracing::debug!(nodes = count, has_masks, has_matte, "render tree built");

        Self {
            nodes,
            glyphs,
            bounds: comp.bounds,
            duration_ms: comp.duration_ms,
            generation,
            progress: 0.0,
            progress_updates: 0,
            has_masks,
            has_matte,
        }
    }

    /// Map normalized progress to composition time and push it into every node.
    ///
    /// `1.0` maps just inside the end of the timeline so layers ending with the composition stay
    /// visible on the last frame.
    pub fn set_progress(&mut self, progress: f64) {
        let p = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut comp_ms = p * self.duration_ms;
        if p >= 1.0 && self.duration_ms > 0.0 {
            comp_ms = self.duration_ms.next_down();
        }

        self.progress = p;
        self.progress_updates += 1;
        let epoch = self.progress_updates;
        for node in &mut self.nodes {
            node.set_time(comp_ms, epoch);
        }
        tracing::trace!(progress = p, comp_ms, "tree progress");
    }

    /// Draw every node, bottom-most layer first.
    pub fn draw(
        &self,
        canvas: &mut dyn Canvas,
        transform: Affine,
        alpha: f64,
        res: &mut DrawResources<'_>,
    ) -> KineticResult<()> {
        let alpha = alpha.clamp(0.0, 1.0);
        for node in self.nodes.iter().rev() {
            node.draw(canvas, transform, alpha, &self.glyphs, res)?;
        }
        Ok(())
    }

    /// `true` when any node declares a mask.
    pub fn has_masks(&self) -> bool {
        self.has_masks
    }

    /// `true` when any node has a matte source.
    pub fn has_matte(&self) -> bool {
        self.has_matte
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn stats(&self) -> TreeStats {
        let mut node_count = 0;
        let mut synced_nodes = 0;
        self.visit(|n| {
            node_count += 1;
            if n.progress_epoch() == self.progress_updates && self.progress_updates > 0 {
                synced_nodes += 1;
            }
        });
        TreeStats {
            generation: self.generation,
            node_count,
            progress_updates: self.progress_updates,
            synced_nodes,
            progress: self.progress,
        }
    }

    pub(crate) fn visit<'a>(&'a self, mut f: impl FnMut(&'a RenderNode)) {
        for n in &self.nodes {
            n.visit(&mut f);
        }
    }

    /// First node named `name`, searching matte sources and nested children too.
    #[cfg(test)]
    pub(crate) fn find(&self, name: &str) -> Option<&RenderNode> {
        let mut found = None;
        self.visit(|n| {
            if found.is_none() && n.name() == name {
                found = Some(n);
            }
        });
        found
    }
}

impl ColorFilterTarget for RenderTree {
    fn apply_color_filter(
        &mut self,
        layer: Option<&str>,
        content: Option<&str>,
        filter: Option<&ColorFilter>,
    ) -> usize {
        self.nodes
            .iter_mut()
            .map(|n| n.apply_color_filter(layer, content, filter))
            .sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tree/render_tree.rs"]
mod tests;
