use crate::foundation::core::Rgba8;
use crate::foundation::math::{mul_div255_u8, unpremul_u8};

/// Paint color replacement applied while drawing layer content.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ColorFilter {
    /// Blend the tint over the paint color, keeping the paint's alpha (`SRC_ATOP`).
    Tint(Rgba8),
    /// Row-major 4x5 color matrix over straight RGBA in `0..=255`; the fifth column is an offset.
    Matrix([f32; 20]),
}

impl ColorFilter {
    /// Solid replacement color keeping the paint's alpha.
    pub fn tint(color: Rgba8) -> Self {
        Self::Tint(color)
    }

    /// Desaturating matrix (Rec. 601 weights).
    pub fn grayscale() -> Self {
        let (r, g, b) = (0.299f32, 0.587f32, 0.114f32);
        Self::Matrix([
            r, g, b, 0.0, 0.0, //
            r, g, b, 0.0, 0.0, //
            r, g, b, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// Filter a straight-alpha paint color.
    pub fn apply(&self, c: Rgba8) -> Rgba8 {
        match self {
            Self::Tint(t) => {
                let ta = u16::from(t.a);
                let inv = 255 - ta;
                let mix = |src: u8, dst: u8| {
                    mul_div255_u8(u16::from(src), ta).saturating_add(mul_div255_u8(u16::from(dst), inv))
                };
                Rgba8::new(mix(t.r, c.r), mix(t.g, c.g), mix(t.b, c.b), c.a)
            }
            Self::Matrix(m) => {
                let v = [
                    f32::from(c.r),
                    f32::from(c.g),
                    f32::from(c.b),
                    f32::from(c.a),
                ];
                let row = |i: usize| {
                    let r = &m[i * 5..i * 5 + 5];
                    let x = r[0] * v[0] + r[1] * v[1] + r[2] * v[2] + r[3] * v[3] + r[4];
                    x.round().clamp(0.0, 255.0) as u8
                };
                Rgba8::new(row(0), row(1), row(2), row(3))
            }
        }
    }

    /// Filter a premultiplied RGBA8 buffer in place (bitmap content).
    pub fn apply_premul_in_place(&self, rgba: &mut [u8]) {
        for px in rgba.chunks_exact_mut(4) {
            let a = px[3];
            if a == 0 {
                continue;
            }
            let straight = Rgba8::new(
                unpremul_u8(px[0], a),
                unpremul_u8(px[1], a),
                unpremul_u8(px[2], a),
                a,
            );
            let out = self.apply(straight).premultiplied();
            px.copy_from_slice(&out.to_array());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/color_filter.rs"]
mod tests;
