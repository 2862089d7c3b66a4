//! Bilinear grayscale resize shared by detector and embedder preprocessing.

pub(crate) fn resize_bilinear(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 || src.len() < src_w * src_h {
        return vec![0; dst_w * dst_h];
    }

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;
    let mut dst = vec![0u8; dst_w * dst_h];

    for y in 0..dst_h {
        let src_y = (y as f32 + 0.5) * y_ratio - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, src_h as i32 - 1) as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = (src_y - y0 as f32).clamp(0.0, 1.0);

        for x in 0..dst_w {
            let src_x = (x as f32 + 0.5) * x_ratio - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, src_w as i32 - 1) as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = (src_x - x0 as f32).clamp(0.0, 1.0);

            let tl = src[y0 * src_w + x0] as f32;
            let tr = src[y0 * src_w + x1] as f32;
            let bl = src[y1 * src_w + x0] as f32;
            let br = src[y1 * src_w + x1] as f32;

            let top = tl * (1.0 - fx) + tr * fx;
            let bot = bl * (1.0 - fx) + br * fx;
            let val = top * (1.0 - fy) + bot * fy;

            dst[y * dst_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_stays_uniform() {
        let src = vec![137u8; 40 * 30];
        let dst = resize_bilinear(&src, 40, 30, 64, 64);
        assert_eq!(dst.len(), 64 * 64);
        assert!(dst.iter().all(|&p| p == 137));
    }

    #[test]
    fn test_identity_resize() {
        let src: Vec<u8> = (0..16).collect();
        let dst = resize_bilinear(&src, 4, 4, 4, 4);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_short_buffer_yields_zeros() {
        let dst = resize_bilinear(&[1, 2, 3], 4, 4, 2, 2);
        assert_eq!(dst, vec![0; 4]);
    }
}
