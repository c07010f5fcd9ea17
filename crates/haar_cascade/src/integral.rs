//! Summed-area tables over 8-bit grayscale images.

use image::GrayImage;

/// Upright sum, squared sum, and optional 45-degree tilted sum tables.
///
/// Tables have one extra row and column: `sum(x, y)` is the sum of all
/// pixels strictly above and to the left of corner point `(x, y)`.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sum: Vec<i64>,
    sqsum: Vec<f64>,
    tilted: Option<TiltedTable>,
}

/// Tilted table with horizontal padding so cone lookups never leave the buffer.
///
/// `T(X, Y)` is the sum of `I(x, y)` over `y < Y` and `|x - X + 1| <= Y - y - 1`.
#[derive(Debug, Clone)]
struct TiltedTable {
    pad: i64,
    stride: usize,
    data: Vec<i64>,
}

impl TiltedTable {
    fn build(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as i64, img.height() as i64);
        let pad = h + 1;
        let stride = (w + 1 + 2 * pad) as usize;
        let rows = (h + 1) as usize;
        let mut data = vec![0i64; stride * rows];
        let pixel = |x: i64, y: i64| -> i64 {
            if x < 0 || y < 0 || x >= w || y >= h {
                0
            } else {
                img.get_pixel(x as u32, y as u32)[0] as i64
            }
        };
        let at = |data: &[i64], x: i64, y: i64| -> i64 {
            let col = x + pad;
            if y < 0 || col < 0 || col as usize >= stride {
                0
            } else {
                data[y as usize * stride + col as usize]
            }
        };
        for y in 1..=h {
            for col in 0..stride as i64 {
                let x = col - pad;
                let v = at(&data, x - 1, y - 1) + at(&data, x + 1, y - 1) - at(&data, x, y - 2)
                    + pixel(x - 1, y - 1)
                    + pixel(x - 1, y - 2);
                data[y as usize * stride + col as usize] = v;
            }
        }
        Self { pad, stride, data }
    }

    #[inline]
    fn get(&self, x: i64, y: i64) -> i64 {
        self.data[y as usize * self.stride + (x + self.pad) as usize]
    }
}

impl IntegralImage {
    pub fn new(img: &GrayImage, with_tilted: bool) -> Self {
        let (w, h) = img.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0i64; stride * (h as usize + 1)];
        let mut sqsum = vec![0f64; stride * (h as usize + 1)];
        for y in 0..h as usize {
            let mut row_sum = 0i64;
            let mut row_sq = 0f64;
            for x in 0..w as usize {
                let v = img.get_pixel(x as u32, y as u32)[0] as i64;
                row_sum += v;
                row_sq += (v * v) as f64;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sqsum[idx] = sqsum[idx - stride] + row_sq;
            }
        }
        Self {
            width: w,
            height: h,
            sum,
            sqsum,
            tilted: with_tilted.then(|| TiltedTable::build(img)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_tilted(&self) -> bool {
        self.tilted.is_some()
    }

    #[inline]
    fn idx(&self, x: i64, y: i64) -> usize {
        y as usize * (self.width as usize + 1) + x as usize
    }

    /// Sum of the upright rectangle with top-left `(x, y)`.
    #[inline]
    pub fn rect_sum(&self, x: i64, y: i64, w: i64, h: i64) -> i64 {
        self.sum[self.idx(x, y)] - self.sum[self.idx(x + w, y)] - self.sum[self.idx(x, y + h)]
            + self.sum[self.idx(x + w, y + h)]
    }

    #[inline]
    pub fn rect_sqsum(&self, x: i64, y: i64, w: i64, h: i64) -> f64 {
        self.sqsum[self.idx(x, y)] - self.sqsum[self.idx(x + w, y)] - self.sqsum[self.idx(x, y + h)]
            + self.sqsum[self.idx(x + w, y + h)]
    }

    /// Sum of the 45-degree rectangle whose top corner is `(x, y)`, extending
    /// `w` down-right and `h` down-left. Zero when built without tilted support.
    #[inline]
    pub fn tilted_sum(&self, x: i64, y: i64, w: i64, h: i64) -> i64 {
        match &self.tilted {
            Some(t) => {
                t.get(x, y) - t.get(x - h, y + h) - t.get(x + w, y + w)
                    + t.get(x + w - h, y + w + h)
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| image::Luma([((x * 7 + y * 13) % 251) as u8]))
    }

    fn brute_sum(img: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> i64 {
        let mut s = 0i64;
        for yy in y..y + h {
            for xx in x..x + w {
                s += img.get_pixel(xx, yy)[0] as i64;
            }
        }
        s
    }

    /// Pixels inside the tilted rect: the difference of the four cones.
    fn brute_tilted(img: &GrayImage, x: i64, y: i64, w: i64, h: i64) -> i64 {
        let cone = |cx: i64, cy: i64| -> i64 {
            let mut s = 0i64;
            for py in 0..cy.min(img.height() as i64) {
                for px in 0..img.width() as i64 {
                    if (px - cx + 1).abs() <= cy - py - 1 {
                        s += img.get_pixel(px as u32, py as u32)[0] as i64;
                    }
                }
            }
            s
        };
        cone(x, y) - cone(x - h, y + h) - cone(x + w, y + w) + cone(x + w - h, y + w + h)
    }

    #[test]
    fn upright_sums_match_brute_force() {
        let img = ramp(9, 7);
        let ii = IntegralImage::new(&img, false);
        for &(x, y, w, h) in &[(0, 0, 9, 7), (1, 2, 3, 4), (4, 0, 5, 1), (8, 6, 1, 1)] {
            assert_eq!(
                ii.rect_sum(x as i64, y as i64, w as i64, h as i64),
                brute_sum(&img, x, y, w, h)
            );
        }
        let sq = ii.rect_sqsum(0, 0, 1, 1);
        let p = img.get_pixel(0, 0)[0] as f64;
        assert_eq!(sq, p * p);
    }

    #[test]
    fn tilted_sums_match_cone_definition() {
        let img = ramp(12, 10);
        let ii = IntegralImage::new(&img, true);
        for &(x, y, w, h) in &[(3, 0, 2, 2), (5, 1, 3, 2), (4, 2, 4, 4), (2, 0, 1, 1)] {
            assert_eq!(ii.tilted_sum(x, y, w, h), brute_tilted(&img, x, y, w, h));
        }
    }

    #[test]
    fn tilted_unit_rect_is_two_pixels() {
        // A 1x1 tilted rect at (x, y) covers pixels (x-1, y) and (x-1, y+1).
        let mut img = GrayImage::new(6, 6);
        img.put_pixel(2, 1, image::Luma([10]));
        img.put_pixel(2, 2, image::Luma([20]));
        img.put_pixel(1, 1, image::Luma([100]));
        let ii = IntegralImage::new(&img, true);
        assert_eq!(ii.tilted_sum(3, 1, 1, 1), 30);
    }
}
