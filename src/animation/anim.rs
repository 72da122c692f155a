use crate::{
    animation::ease::Ease,
    foundation::core::{Rgba8, Transform2D, Vec2},
    foundation::error::{KineticError, KineticResult},
};

/// Interpolation contract for animated value types.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

impl Lerp for Transform2D {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            translate: <Vec2 as Lerp>::lerp(&a.translate, &b.translate, t),
            rotation_rad: a.rotation_rad + (b.rotation_rad - a.rotation_rad) * t,
            scale: <Vec2 as Lerp>::lerp(&a.scale, &b.scale, t),
            anchor: <Vec2 as Lerp>::lerp(&a.anchor, &b.anchor, t),
        }
    }
}

impl Lerp for Rgba8 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }

        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

/// A layer property that is either fixed or keyframed over layer-local time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Animated<T> {
    /// Same value at every instant.
    Static(T),
    /// Piecewise value defined by keyframes.
    Keyframes(Keyframes<T>),
}

impl<T: Default> Default for Animated<T> {
    fn default() -> Self {
        Self::Static(T::default())
    }
}

impl<T> Animated<T>
where
    T: Lerp + Clone + Default,
{
    /// Sample the value at layer-local time `time_ms`.
    pub fn sample(&self, time_ms: f64) -> T {
        match self {
            Self::Static(v) => v.clone(),
            Self::Keyframes(kf) => kf.sample(time_ms),
        }
    }

    /// `true` when the value can change over time.
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Keyframes(kf) if kf.keys.len() > 1)
    }

    /// Validate keyframe invariants.
    pub fn validate(&self) -> KineticResult<()> {
        match self {
            Self::Static(_) => Ok(()),
            Self::Keyframes(kf) => kf.validate(),
        }
    }
}

/// Keyframe list sorted by time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframes<T> {
    /// Keyframes sorted by `time_ms`; must be non-empty.
    pub keys: Vec<Keyframe<T>>,
    /// Interpolation mode between adjacent keys.
    #[serde(default)]
    pub mode: InterpMode,
}

impl<T> Keyframes<T>
where
    T: Lerp + Clone + Default,
{
    /// Validate ordering and non-emptiness.
    pub fn validate(&self) -> KineticResult<()> {
        if self.keys.is_empty() {
            return Err(KineticError::validation(
                "keyframes must have at least one key",
            ));
        }
        if self.keys.iter().any(|k| !k.time_ms.is_finite()) {
            return Err(KineticError::validation("keyframe times must be finite"));
        }
        if !self.keys.windows(2).all(|w| w[0].time_ms <= w[1].time_ms) {
            return Err(KineticError::validation(
                "keyframes must be sorted by time_ms",
            ));
        }
        Ok(())
    }

    /// Sample at `time_ms`, holding the first/last value outside the keyed range.
    ///
    /// An empty list samples as `T::default()`.
    pub fn sample(&self, time_ms: f64) -> T {
        if self.keys.is_empty() {
            return T::default();
        }
        let idx = self.keys.partition_point(|k| k.time_ms <= time_ms);

        if idx == 0 {
            return self.keys[0].value.clone();
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value.clone();
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.time_ms - a.time_ms;
        if span <= 0.0 {
            return a.value.clone();
        }

        match self.mode {
            InterpMode::Hold => a.value.clone(),
            InterpMode::Linear => {
                let t = (time_ms - a.time_ms) / span;
                T::lerp(&a.value, &b.value, a.ease.apply(t))
            }
        }
    }
}

/// One keyframe.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    /// Layer-local time of this key in milliseconds.
    pub time_ms: f64,
    /// Value at `time_ms`.
    pub value: T,
    /// Easing toward the next key.
    #[serde(default)]
    pub ease: Ease,
}

/// Interpolation between adjacent keyframes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InterpMode {
    /// Hold the previous key until the next one.
    Hold,
    /// Interpolate through the key's [`Ease`].
    #[default]
    Linear,
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
