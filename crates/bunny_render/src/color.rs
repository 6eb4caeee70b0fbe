/// Convert a `0xRRGGBB` colour to linear RGBA.
///
/// Hex colours are authored in sRGB; the surface is sRGB, so shading happens
/// on decoded values.
pub fn color_from_hex(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0), 1.0]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_are_exact() {
        assert_eq!(color_from_hex(0x000000), [0.0, 0.0, 0.0, 1.0]);
        let white = color_from_hex(0xffffff);
        for c in &white[..3] {
            assert!((c - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn channels_are_extracted_in_order() {
        let red = color_from_hex(0xff0000);
        assert!((red[0] - 1.0).abs() < 1e-6);
        assert_eq!(red[1], 0.0);
        assert_eq!(red[2], 0.0);

        let blue = color_from_hex(0x0000ff);
        assert_eq!(blue[0], 0.0);
        assert!((blue[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mid_grey_is_decoded() {
        // 0x40 in sRGB is roughly 0.051 linear.
        let grey = color_from_hex(0x404040);
        assert!((grey[0] - 0.0513).abs() < 1e-3);
    }
}
