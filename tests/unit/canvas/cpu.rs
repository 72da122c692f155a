use super::*;

fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((x0, y0));
    p.line_to((x1, y0));
    p.line_to((x1, y1));
    p.line_to((x0, y1));
    p.close_path();
    p
}

const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);

#[test]
fn fill_path_covers_interior_only() {
    let mut c = CpuCanvas::new(8, 8, CpuCanvasOpts::default()).unwrap();
    c.fill_path(&rect_path(0.0, 0.0, 4.0, 8.0), Affine::IDENTITY, &Paint::solid(RED))
        .unwrap();
    assert_eq!(c.pixel(1, 4), Some([255, 0, 0, 255]));
    assert_eq!(c.pixel(6, 4), Some([0, 0, 0, 0]));
    assert_eq!(c.pixel(8, 0), None);
}

#[test]
fn clear_option_fills_background() {
    let c = CpuCanvas::new(2, 2, CpuCanvasOpts::default().with_clear(Some(Rgba8::BLACK))).unwrap();
    let frame = c.into_frame().unwrap();
    assert!(frame.premultiplied);
    assert_eq!(&frame.data[0..4], &[0, 0, 0, 255]);
}

#[test]
fn destination_out_erases() {
    let mut c = CpuCanvas::new(8, 8, CpuCanvasOpts::default()).unwrap();
    c.fill_path(&rect_path(0.0, 0.0, 8.0, 8.0), Affine::IDENTITY, &Paint::solid(RED))
        .unwrap();
    c.fill_path(
        &rect_path(0.0, 0.0, 4.0, 8.0),
        Affine::IDENTITY,
        &Paint::solid(Rgba8::WHITE).with_blend(PaintBlend::DestinationOut),
    )
    .unwrap();
    assert_eq!(c.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(c.pixel(6, 1), Some([255, 0, 0, 255]));
}

#[test]
fn alpha_matte_layer_clips_content() {
    let mut c = CpuCanvas::new(8, 8, CpuCanvasOpts::default()).unwrap();
    c.save_layer(None, LayerComposite::normal(1.0));
    c.fill_path(&rect_path(0.0, 0.0, 8.0, 8.0), Affine::IDENTITY, &Paint::solid(RED))
        .unwrap();
    c.save_layer(None, LayerComposite::Matte(MatteMode::Alpha));
    c.fill_path(&rect_path(0.0, 0.0, 8.0, 4.0), Affine::IDENTITY, &Paint::solid(Rgba8::WHITE))
        .unwrap();
    c.restore().unwrap();
    c.restore().unwrap();

    assert_eq!(c.pixel(3, 1), Some([255, 0, 0, 255]));
    assert_eq!(c.pixel(3, 6), Some([0, 0, 0, 0]));
}

#[test]
fn luma_inverted_matte_keeps_dark_regions() {
    let mut c = CpuCanvas::new(8, 8, CpuCanvasOpts::default()).unwrap();
    c.save_layer(None, LayerComposite::normal(1.0));
    c.fill_path(&rect_path(0.0, 0.0, 8.0, 8.0), Affine::IDENTITY, &Paint::solid(RED))
        .unwrap();
    c.save_layer(None, LayerComposite::Matte(MatteMode::LumaInverted));
    c.fill_path(&rect_path(0.0, 0.0, 8.0, 4.0), Affine::IDENTITY, &Paint::solid(Rgba8::WHITE))
        .unwrap();
    c.restore().unwrap();
    c.restore().unwrap();

    assert_eq!(c.pixel(3, 1), Some([0, 0, 0, 0]));
    assert_eq!(c.pixel(3, 6), Some([255, 0, 0, 255]));
}

#[test]
fn layer_alpha_and_bounds_apply_on_restore() {
    let mut c = CpuCanvas::new(8, 8, CpuCanvasOpts::default()).unwrap();
    c.save_layer(
        Some(Rect::new(0.0, 0.0, 4.0, 8.0)),
        LayerComposite::normal(0.5),
    );
    c.fill_path(&rect_path(0.0, 0.0, 8.0, 8.0), Affine::IDENTITY, &Paint::solid(RED))
        .unwrap();
    c.restore().unwrap();

    assert_eq!(c.pixel(1, 1), Some([128, 0, 0, 128]));
    assert_eq!(c.pixel(6, 1), Some([0, 0, 0, 0]));
}

#[test]
fn bitmap_draws_at_transformed_origin() {
    let mut c = CpuCanvas::new(4, 4, CpuCanvasOpts::default()).unwrap();
    let bmp = Bitmap::from_premul(2, 2, [0u8, 0, 255, 255].repeat(4)).unwrap();
    c.draw_bitmap(&bmp, Affine::translate((2.0, 2.0)), &Paint::default())
        .unwrap();
    assert_eq!(c.pixel(3, 3), Some([0, 0, 255, 255]));
    assert_eq!(c.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn unbalanced_restore_is_an_error() {
    let mut c = CpuCanvas::new(2, 2, CpuCanvasOpts::default()).unwrap();
    assert!(c.restore().is_err());
}

#[test]
fn oversized_canvas_is_rejected() {
    assert!(CpuCanvas::new(70_000, 1, CpuCanvasOpts::default()).is_err());
    assert!(CpuCanvas::new(0, 1, CpuCanvasOpts::default()).is_err());
}
