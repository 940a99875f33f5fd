use image::{Rgb, RgbImage};
use rand::Rng;
use rand::seq::SliceRandom;

/// Randomly drawn factors for one color jitter application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterFactors {
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub hue: Option<f32>,
    /// Order in which the four adjustments run, as indices into
    /// `[brightness, contrast, saturation, hue]`.
    pub order: [usize; 4],
}

impl JitterFactors {
    /// Draws the factors. A rate of zero disables the adjustment and consumes no draw.
    pub fn sample<R: Rng + ?Sized>(
        rng: &mut R,
        brightness: f32,
        contrast: f32,
        saturation: f32,
        hue: f32,
    ) -> Self {
        let mut order = [0, 1, 2, 3];
        order.shuffle(rng);

        Self {
            brightness: sample_ratio(rng, brightness),
            contrast: sample_ratio(rng, contrast),
            saturation: sample_ratio(rng, saturation),
            hue: (hue > 0.0).then(|| rng.gen_range(-hue..=hue)),
            order,
        }
    }

    pub fn apply(&self, image: &mut RgbImage) {
        for step in self.order {
            match (step, self.brightness, self.contrast, self.saturation, self.hue) {
                (0, Some(factor), _, _, _) => adjust_brightness(image, factor),
                (1, _, Some(factor), _, _) => adjust_contrast(image, factor),
                (2, _, _, Some(factor), _) => adjust_saturation(image, factor),
                (3, _, _, _, Some(shift)) => adjust_hue(image, shift),
                _ => {}
            }
        }
    }
}

fn sample_ratio<R: Rng + ?Sized>(rng: &mut R, rate: f32) -> Option<f32> {
    (rate > 0.0).then(|| rng.gen_range((1.0 - rate).max(0.0)..=1.0 + rate))
}

/// Draws jitter factors and applies them to `image` in place.
pub fn color_jitter<R: Rng + ?Sized>(
    image: &mut RgbImage,
    rng: &mut R,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
) -> JitterFactors {
    let factors = JitterFactors::sample(rng, brightness, contrast, saturation, hue);
    factors.apply(image);
    factors
}

fn luma(pixel: &Rgb<u8>) -> f32 {
    let [r, g, b] = pixel.0;
    (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0
}

fn blend(degenerate: f32, value: u8, factor: f32) -> u8 {
    (degenerate + factor * (value as f32 - degenerate))
        .round()
        .clamp(0.0, 255.0) as u8
}

pub fn adjust_brightness(image: &mut RgbImage, factor: f32) {
    for pixel in image.pixels_mut() {
        pixel.0 = pixel.0.map(|c| blend(0.0, c, factor));
    }
}

pub fn adjust_contrast(image: &mut RgbImage, factor: f32) {
    let count = (image.width() as usize * image.height() as usize).max(1);
    let total: f32 = image.pixels().map(|p| luma(p).round()).sum();
    let mean = (total / count as f32).round();

    for pixel in image.pixels_mut() {
        pixel.0 = pixel.0.map(|c| blend(mean, c, factor));
    }
}

pub fn adjust_saturation(image: &mut RgbImage, factor: f32) {
    for pixel in image.pixels_mut() {
        let gray = luma(pixel).round();
        pixel.0 = pixel.0.map(|c| blend(gray, c, factor));
    }
}

/// Rotates the hue channel by `shift` turns, `shift` in `[-0.5, 0.5]`.
pub fn adjust_hue(image: &mut RgbImage, shift: f32) {
    for pixel in image.pixels_mut() {
        let (h, s, v) = rgb_to_hsv(pixel.0);
        pixel.0 = hsv_to_rgb((h + shift).rem_euclid(1.0), s, v);
    }
}

fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue, saturation, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let sector = h * 6.0;
    let i = sector.floor();
    let f = sector - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i as i32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [r, g, b].map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
}
