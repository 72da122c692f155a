use super::*;

#[test]
fn bounds_reject_zero_extents() {
    assert!(Bounds::new(0, 10).is_err());
    assert!(Bounds::new(10, 0).is_err());
    assert_eq!(Bounds::new(4, 3).unwrap().to_size(), Size::new(4.0, 3.0));
}

#[test]
fn bounds_scale_rounds_to_pixels() {
    let b = Bounds::new(200, 101).unwrap();
    assert_eq!(b.scaled(1.0), (200, 101));
    assert_eq!(b.scaled(0.5), (100, 51));
    assert_eq!(b.scaled(2.0), (400, 202));
}

#[test]
fn premultiply_rounds_half_up() {
    let c = Rgba8::new(255, 128, 0, 128).premultiplied();
    assert_eq!(c.to_array(), [128, 64, 0, 128]);
    assert_eq!(Rgba8::WHITE.premultiplied().to_array(), [255, 255, 255, 255]);
}

#[test]
fn with_opacity_scales_alpha_only() {
    let c = Rgba8::new(10, 20, 30, 200).with_opacity(0.5);
    assert_eq!(c, Rgba8::new(10, 20, 30, 100));
    assert_eq!(Rgba8::WHITE.with_opacity(3.0).a, 255);
}

#[test]
fn transform_to_affine_identity_and_translation() {
    let t = Transform2D::default();
    assert_eq!(t.to_affine(), Affine::IDENTITY);

    let t = Transform2D {
        translate: Vec2::new(10.0, -2.5),
        ..Transform2D::default()
    };
    assert_eq!(t.to_affine(), Affine::translate(Vec2::new(10.0, -2.5)));
}

#[test]
fn anchor_is_pivot() {
    let t = Transform2D {
        translate: Vec2::new(50.0, 50.0),
        scale: Vec2::new(2.0, 2.0),
        anchor: Vec2::new(5.0, 5.0),
        ..Transform2D::default()
    };
    let p = t.to_affine() * Point::new(5.0, 5.0);
    assert!((p.x - 50.0).abs() < 1e-9 && (p.y - 50.0).abs() < 1e-9);
}
