// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Companion display image for a scored frame.

use image::{Rgb, RgbImage};

use interest_structures::PreprocessedTensor;

const BORDER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BORDER_WIDTH: u32 = 2;
const BAR_WIDTH: u32 = 6;

/// Render the preprocessed tensor back into pixels and mark it with a red
/// border plus a red bar on the left edge whose height is proportional to
/// `level` (clamped to `[0, 1]`).
///
/// `mean` / `std` must be the normalization the tensor was produced with.
pub fn annotate(tensor: &PreprocessedTensor, mean: [f32; 3], std: [f32; 3], level: f32) -> RgbImage {
    let [channels, height, width] = tensor.shape();
    let view = tensor.view();
    let (w, h) = (width as u32, height as u32);

    let mut image = RgbImage::from_fn(w, h, |x, y| {
        let mut px = [0u8; 3];
        if channels == 0 {
            return Rgb(px);
        }
        for (c, out) in px.iter_mut().enumerate() {
            // Grayscale tensors are shown with the single channel replicated
            let src = c.min(channels - 1);
            let value = view[[src, y as usize, x as usize]] * std[c] + mean[c];
            *out = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        Rgb(px)
    });

    draw_border(&mut image);
    draw_level_bar(&mut image, level);
    image
}

fn draw_border(image: &mut RgbImage) {
    let (w, h) = image.dimensions();
    for y in 0..h {
        for x in 0..w {
            let on_edge = x < BORDER_WIDTH
                || y < BORDER_WIDTH
                || x + BORDER_WIDTH >= w
                || y + BORDER_WIDTH >= h;
            if on_edge {
                image.put_pixel(x, y, BORDER_COLOR);
            }
        }
    }
}

fn draw_level_bar(image: &mut RgbImage, level: f32) {
    let (w, h) = image.dimensions();
    let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
    let bar_height = (level * h as f32).round() as u32;
    let bar_width = BAR_WIDTH.min(w);
    for y in h.saturating_sub(bar_height)..h {
        for x in 0..bar_width {
            image.put_pixel(x, y, BORDER_COLOR);
        }
    }
}
