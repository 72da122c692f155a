use std::collections::BTreeMap;

use super::*;
use crate::{
    animation::anim::{Animated, Keyframe, Keyframes},
    assets::store::{FontAssetCache, ImageAssetCache},
    canvas::backend::LayerComposite,
    canvas::recording::{DrawCommand, RecordingCanvas},
    composition::model::{
        CharacterGlyph, Fill, Layer, LayerKind, Mask, MaskMode, MatteMode, ShapeContent,
        TextDocument,
    },
    foundation::core::{BezPath, Rgba8},
};

fn square(size: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((0.0, 0.0));
    p.line_to((size, 0.0));
    p.line_to((size, size));
    p.line_to((0.0, size));
    p.close_path();
    p
}

fn shape(name: &str, color: Rgba8) -> Layer {
    Layer::new(
        name,
        LayerKind::Shape {
            contents: vec![ShapeContent {
                name: "body".to_string(),
                path: square(10.0),
                transform: Animated::default(),
                fill: Some(Fill {
                    color: Animated::Static(color),
                    opacity: Animated::Static(1.0),
                }),
                stroke: None,
            }],
        },
    )
}

fn comp(layers: Vec<Layer>) -> Composition {
    Composition {
        duration_ms: 1000.0,
        bounds: Bounds {
            width: 100,
            height: 100,
        },
        layers,
        images: BTreeMap::new(),
        characters: Vec::new(),
    }
}

fn draw(tree: &RenderTree) -> RecordingCanvas {
    let mut canvas = RecordingCanvas::new(100, 100);
    let mut images = ImageAssetCache::new(None);
    let mut fonts = FontAssetCache::new();
    let manifest = BTreeMap::new();
    let mut res = DrawResources {
        images: &mut images,
        fonts: &mut fonts,
        manifest: &manifest,
        target: None,
        text_delegate: None,
    };
    tree.draw(&mut canvas, Affine::IDENTITY, 1.0, &mut res)
        .unwrap();
    canvas
}

fn fill_colors(canvas: &RecordingCanvas) -> Vec<Rgba8> {
    canvas.fills().map(|(_, _, p)| p.effective_color()).collect()
}

#[test]
fn first_layer_is_drawn_last() {
    let mut tree = RenderTree::build(
        &comp(vec![shape("top", Rgba8::WHITE), shape("bottom", Rgba8::BLACK)]),
        1,
    );
    tree.set_progress(0.0);
    assert_eq!(fill_colors(&draw(&tree)), vec![Rgba8::BLACK, Rgba8::WHITE]);
}

#[test]
fn progress_reaches_every_node_once_per_call() {
    let mut target = shape("target", Rgba8::WHITE);
    target.matte = Some(MatteMode::Alpha);
    let pre = Layer::new(
        "pre",
        LayerKind::PreComp {
            layers: vec![shape("child_a", Rgba8::WHITE), shape("child_b", Rgba8::WHITE)],
            width: 100.0,
            height: 100.0,
            time_remap: None,
        },
    );
    let mut tree = RenderTree::build(&comp(vec![shape("src", Rgba8::WHITE), target, pre]), 7);

    tree.set_progress(0.5);
    let stats = tree.stats();
    assert_eq!(stats.generation, 7);
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.progress_updates, 1);
    assert_eq!(stats.synced_nodes, 5);

    tree.set_progress(0.25);
    assert_eq!(tree.stats().progress_updates, 2);
    assert_eq!(tree.find("child_b").unwrap().local_ms(), 250.0);
}

#[test]
fn final_progress_keeps_layers_ending_at_duration_visible() {
    let mut l = shape("a", Rgba8::WHITE);
    l.out_ms = Some(1000.0);
    let mut tree = RenderTree::build(&comp(vec![l]), 1);
    tree.set_progress(1.0);
    assert!(tree.find("a").unwrap().is_visible());
    assert_eq!(fill_colors(&draw(&tree)).len(), 1);
}

#[test]
fn layer_timing_offsets_and_stretches_local_time() {
    let mut l = shape("a", Rgba8::WHITE);
    l.in_ms = 200.0;
    l.start_ms = 100.0;
    l.time_stretch = 2.0;
    let mut tree = RenderTree::build(&comp(vec![l]), 1);

    tree.set_progress(0.1);
    assert!(!tree.find("a").unwrap().is_visible());
    assert!(draw(&tree).commands().is_empty());

    tree.set_progress(0.5);
    let node = tree.find("a").unwrap();
    assert!(node.is_visible());
    assert_eq!(node.local_ms(), 200.0);
}

#[test]
fn precomp_time_remap_drives_children() {
    let remap = Animated::Keyframes(Keyframes {
        keys: vec![
            Keyframe {
                time_ms: 0.0,
                value: 0.0,
                ease: Default::default(),
            },
            Keyframe {
                time_ms: 1000.0,
                value: 100.0,
                ease: Default::default(),
            },
        ],
        mode: Default::default(),
    });
    let pre = Layer::new(
        "pre",
        LayerKind::PreComp {
            layers: vec![shape("child", Rgba8::WHITE)],
            width: 50.0,
            height: 50.0,
            time_remap: Some(remap),
        },
    );
    let mut tree = RenderTree::build(&comp(vec![pre]), 1);
    tree.set_progress(0.5);
    assert_eq!(tree.find("child").unwrap().local_ms(), 50.0);

    let canvas = draw(&tree);
    assert!(matches!(
        canvas.commands()[0],
        DrawCommand::SaveLayer {
            bounds: Some(_),
            ..
        }
    ));
}

#[test]
fn matte_source_is_drawn_only_through_its_target() {
    let mut target = shape("target", Rgba8::WHITE);
    target.matte = Some(MatteMode::Luma);
    let mut tree = RenderTree::build(&comp(vec![shape("src", Rgba8::BLACK), target]), 1);
    assert!(tree.has_matte());
    assert!(!tree.has_masks());
    tree.set_progress(0.0);

    let canvas = draw(&tree);
    let kinds: Vec<&str> = canvas
        .commands()
        .iter()
        .map(|c| match c {
            DrawCommand::SaveLayer {
                composite: LayerComposite::Matte(_),
                ..
            } => "matte",
            DrawCommand::SaveLayer { .. } => "layer",
            DrawCommand::FillPath { .. } => "fill",
            DrawCommand::Restore => "restore",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["layer", "fill", "matte", "fill", "restore", "restore"]);
    assert_eq!(fill_colors(&canvas), vec![Rgba8::WHITE, Rgba8::BLACK]);
}

#[test]
fn masks_are_composited_into_an_alpha_matte_layer() {
    let mut l = shape("masked", Rgba8::WHITE);
    l.masks = vec![
        Mask {
            mode: MaskMode::Intersect,
            path: square(5.0),
            opacity: Animated::Static(1.0),
            inverted: false,
        },
        Mask {
            mode: MaskMode::None,
            path: square(5.0),
            opacity: Animated::Static(1.0),
            inverted: false,
        },
    ];
    let mut tree = RenderTree::build(&comp(vec![l]), 1);
    assert!(tree.has_masks());
    tree.set_progress(0.0);

    let canvas = draw(&tree);
    let cmds = canvas.commands();
    assert!(cmds.contains(&DrawCommand::SaveLayer {
        bounds: None,
        composite: LayerComposite::Matte(MatteMode::Alpha),
    }));
    // Content, full-canvas seed for the leading intersect, then the mask itself.
    assert_eq!(canvas.fills().count(), 3);
    assert_eq!(canvas.depth(), 0);
}

#[test]
fn color_filters_target_layers_and_contents() {
    let red = ColorFilter::tint(Rgba8::new(255, 0, 0, 255));
    let mut tree = RenderTree::build(&comp(vec![shape("a", Rgba8::WHITE), shape("b", Rgba8::WHITE)]), 1);
    tree.set_progress(0.0);

    assert_eq!(tree.apply_color_filter(Some("a"), None, Some(&red)), 1);
    assert_eq!(tree.find("a").unwrap().content_filter("body"), Some(&red));
    assert!(tree.find("b").unwrap().filter().is_none());

    assert_eq!(tree.apply_color_filter(Some("b"), Some("body"), Some(&red)), 1);
    assert_eq!(tree.apply_color_filter(Some("b"), Some("nope"), Some(&red)), 0);
    assert_eq!(tree.apply_color_filter(Some("missing"), None, Some(&red)), 0);

    let colors = fill_colors(&draw(&tree));
    assert_eq!(colors, vec![Rgba8::new(255, 0, 0, 255); 2]);

    assert_eq!(tree.apply_color_filter(None, None, None), 2);
    assert!(tree.find("a").unwrap().content_filter("body").is_none());
    assert_eq!(fill_colors(&draw(&tree)), vec![Rgba8::WHITE; 2]);
}

fn text_layer(text: &str) -> Layer {
    Layer::new(
        "title",
        LayerKind::Text {
            document: TextDocument {
                text: text.to_string(),
                font_family: "Mono".to_string(),
                font_style: "Regular".to_string(),
                size: 20.0,
                color: Rgba8::WHITE,
                tracking: 1.0,
                line_height: Some(30.0),
            },
        },
    )
}

fn glyph(ch: char) -> CharacterGlyph {
    CharacterGlyph {
        ch,
        family: "Mono".to_string(),
        style: "Regular".to_string(),
        size: 10.0,
        width: 6.0,
        paths: vec![square(5.0)],
    }
}

#[test]
fn text_uses_glyph_outlines_when_every_char_is_known() {
    let mut c = comp(vec![text_layer("ab\nb")]);
    c.characters = vec![glyph('a'), glyph('b')];
    let mut tree = RenderTree::build(&c, 1);
    tree.set_progress(0.0);

    let canvas = draw(&tree);
    let transforms: Vec<Affine> = canvas.fills().map(|(_, t, _)| t).collect();
    assert_eq!(transforms.len(), 3);
    // Glyphs are authored at size 10 and drawn at 20; advance = 6 * 2 + tracking.
    assert_eq!(
        transforms[1],
        Affine::translate((13.0, 0.0)) * Affine::scale(2.0)
    );
    assert_eq!(
        transforms[2],
        Affine::translate((0.0, 30.0)) * Affine::scale(2.0)
    );
}

#[test]
fn text_without_glyphs_or_device_draws_nothing() {
    let mut c = comp(vec![text_layer("xyz")]);
    c.characters = vec![glyph('a')];
    let mut tree = RenderTree::build(&c, 1);
    tree.set_progress(0.0);
    assert!(draw(&tree).commands().is_empty());
}
