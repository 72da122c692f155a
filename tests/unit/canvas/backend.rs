use super::*;

#[test]
fn effective_color_filters_then_fades() {
    let p = Paint::solid(Rgba8::new(0, 255, 0, 255))
        .with_color_filter(Some(ColorFilter::tint(Rgba8::new(255, 0, 0, 255))))
        .with_alpha(0.5);
    assert_eq!(p.effective_color(), Rgba8::new(255, 0, 0, 128));
}

#[test]
fn default_paint_is_opaque_white_source_over() {
    let p = Paint::default();
    assert_eq!(p.effective_color(), Rgba8::WHITE);
    assert_eq!(p.blend, PaintBlend::SourceOver);
}

#[test]
fn into_straight_unpremultiplies_once() {
    let frame = FrameRGBA {
        width: 1,
        height: 1,
        data: vec![64, 0, 0, 128],
        premultiplied: true,
    };
    let straight = frame.into_straight();
    assert!(!straight.premultiplied);
    assert_eq!(straight.data, vec![128, 0, 0, 128]);
    assert_eq!(straight.clone().into_straight(), straight);
}
