use super::*;

fn linear_keys(keys: &[(f64, f64)]) -> Animated<f64> {
    Animated::Keyframes(Keyframes {
        keys: keys
            .iter()
            .map(|&(time_ms, value)| Keyframe {
                time_ms,
                value,
                ease: Ease::Linear,
            })
            .collect(),
        mode: InterpMode::Linear,
    })
}

#[test]
fn static_value_ignores_time() {
    let a = Animated::Static(0.25);
    assert_eq!(a.sample(-10.0), 0.25);
    assert_eq!(a.sample(1e9), 0.25);
    assert!(!a.is_animated());
}

#[test]
fn keyframes_interpolate_and_hold_at_edges() {
    let a = linear_keys(&[(100.0, 0.0), (200.0, 10.0)]);
    assert!(a.is_animated());
    assert_eq!(a.sample(0.0), 0.0);
    assert_eq!(a.sample(150.0), 5.0);
    assert_eq!(a.sample(250.0), 10.0);
}

#[test]
fn hold_mode_steps() {
    let a = Animated::Keyframes(Keyframes {
        keys: vec![
            Keyframe {
                time_ms: 0.0,
                value: 1.0,
                ease: Ease::Linear,
            },
            Keyframe {
                time_ms: 10.0,
                value: 2.0,
                ease: Ease::Linear,
            },
        ],
        mode: InterpMode::Hold,
    });
    assert_eq!(a.sample(9.9), 1.0);
    assert_eq!(a.sample(10.0), 2.0);
}

#[test]
fn validate_rejects_unsorted_and_empty() {
    assert!(linear_keys(&[(10.0, 0.0), (5.0, 1.0)]).validate().is_err());
    assert!(linear_keys(&[]).validate().is_err());
    assert!(linear_keys(&[(0.0, 0.0), (5.0, 1.0)]).validate().is_ok());
    assert_eq!(linear_keys(&[]).sample(3.0), 0.0);
}

#[test]
fn color_lerp_rounds_channels() {
    let c = <Rgba8 as Lerp>::lerp(&Rgba8::new(0, 0, 0, 0), &Rgba8::new(255, 255, 255, 255), 0.5);
    assert_eq!(c, Rgba8::new(128, 128, 128, 128));
}

#[test]
fn keyframes_deserialize_with_default_ease_and_mode() {
    let json = r#"{"Keyframes":{"keys":[{"time_ms":0.0,"value":1.0},{"time_ms":10.0,"value":3.0}]}}"#;
    let a: Animated<f64> = serde_json::from_str(json).unwrap();
    assert_eq!(a.sample(5.0), 2.0);
}
