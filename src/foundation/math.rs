//! Premultiplied RGBA8 byte math shared by raster canvases and color filters.

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Map an opacity in `[0, 1]` to an 8-bit weight.
pub(crate) fn opacity_u8(opacity: f64) -> u16 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u16
}

/// `dst = src * opacity + dst * (1 - src.a * opacity)` over premultiplied RGBA8 buffers.
pub(crate) fn premul_over_in_place(dst: &mut [u8], src: &[u8], opacity: f64) {
    let k = opacity_u8(opacity);
    if k == 0 {
        return;
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = mul_div255_u16(u16::from(s[3]), k);
        if sa == 0 {
            continue;
        }
        let inv = 255 - sa;
        for c in 0..4 {
            let sc = mul_div255_u16(u16::from(s[c]), k);
            d[c] = (sc + mul_div255_u16(u16::from(d[c]), inv)).min(255) as u8;
        }
    }
}

/// Scale every `dst` pixel by a per-pixel coverage weight.
pub(crate) fn scale_by_coverage_in_place(dst: &mut [u8], coverage: impl Iterator<Item = u16>) {
    for (d, w) in dst.chunks_exact_mut(4).zip(coverage) {
        if w == 255 {
            continue;
        }
        for c in d.iter_mut() {
            *c = mul_div255_u8(u16::from(*c), w);
        }
    }
}

/// `dst = dst * (1 - src.a * opacity)`: punch `src` out of `dst`.
pub(crate) fn premul_dst_out_in_place(dst: &mut [u8], src: &[u8], opacity: f64) {
    let k = opacity_u8(opacity);
    let coverage = src
        .chunks_exact(4)
        .map(move |s| 255 - mul_div255_u16(u16::from(s[3]), k));
    scale_by_coverage_in_place(dst, coverage);
}

/// `dst = dst * mix(1, src.a, opacity)`: keep `dst` only where `src` covers it.
pub(crate) fn premul_dst_in_in_place(dst: &mut [u8], src: &[u8], opacity: f64) {
    let k = opacity_u8(opacity);
    let coverage = src.chunks_exact(4).map(move |s| {
        let sa = u16::from(s[3]);
        // Lerp between full coverage (k = 0) and src alpha (k = 255).
        (255 - k) + mul_div255_u16(sa, k)
    });
    scale_by_coverage_in_place(dst, coverage);
}

/// Undo premultiplication of one channel.
pub(crate) fn unpremul_u8(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8
}

/// Rec. 601 luma of a premultiplied pixel, already weighted by its alpha.
pub(crate) fn premul_luma(px: &[u8]) -> u16 {
    let l = 299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
    ((l + 500) / 1000).min(255) as u16
}
