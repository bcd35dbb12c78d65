pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Blend `src` over `dst` with coverage `a` (0 = keep `dst`, 255 = replace).
pub(crate) fn lerp_u8(dst: u8, src: u8, a: u8) -> u8 {
    if a == 255 {
        return src;
    }
    if a == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(a);
    (mul_div255_u16(u16::from(src), u16::from(a)) + mul_div255_u16(u16::from(dst), inv)).min(255)
        as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
