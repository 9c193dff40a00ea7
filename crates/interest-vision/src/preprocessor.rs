// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Frame to tensor conversion.
//!
//! Pipeline: decode the raw buffer to RGB, center-crop to `crop_size`
//! (zero padding frames that are smaller), scale to `[0, 1]` and normalize each channel with a fixed mean / std pair.

use image::{Rgb, RgbImage};
use ndarray::Array3;
use tracing::trace;

use interest_structures::{
    ChannelLayout, Frame, InterestError, InterestResult, PreprocessedTensor,
};

/// Per-channel mean the scoring model was trained with
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviation the scoring model was trained with
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Deterministic frame to tensor conversion.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    crop_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Preprocessor {
    pub fn new(crop_size: u32) -> InterestResult<Self> {
        Self::with_normalization(crop_size, IMAGENET_MEAN, IMAGENET_STD)
    }

    pub fn with_normalization(crop_size: u32, mean: [f32; 3], std: [f32; 3]) -> InterestResult<Self> {
        if crop_size == 0 {
            return Err(InterestError::InvalidParameter(
                "crop_size must be >= 1".to_string(),
            ));
        }
        if std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(InterestError::InvalidParameter(format!(
                "normalization std must be positive, got {:?}",
                std
            )));
        }
        Ok(Self {
            crop_size,
            mean,
            std,
        })
    }

    pub fn crop_size(&self) -> u32 {
        self.crop_size
    }

    pub fn mean(&self) -> [f32; 3] {
        self.mean
    }

    pub fn std(&self) -> [f32; 3] {
        self.std
    }

    /// Shape of every tensor this preprocessor produces
    pub fn output_shape(&self) -> [usize; 3] {
        let side = self.crop_size as usize;
        [3, side, side]
    }

    /// Convert one frame. Fails with [`InterestError::Decode`] if the buffer
    /// cannot be read in the frame's declared layout.
    pub fn prepare(&self, frame: &Frame) -> InterestResult<PreprocessedTensor> {
        let rgb = decode_rgb(frame)?;
        // The crop is already crop_size x crop_size, no resize needed
        let cropped = center_crop(&rgb, self.crop_size);
        trace!(
            target: "interest-vision",
            "Frame {} ({}x{} {}) -> {}x{} tensor",
            frame.sequence_id(),
            frame.width(),
            frame.height(),
            frame.layout(),
            self.crop_size,
            self.crop_size
        );
        Ok(self.normalize(&cropped))
    }

    /// Display image for `tensor` produced by this preprocessor
    pub fn annotate(&self, tensor: &PreprocessedTensor, level: f32) -> RgbImage {
        crate::annotate(tensor, self.mean, self.std, level)
    }

    /// Undo the mean/std normalization, giving channel values in `[0, 1]`
    pub fn denormalize(&self, tensor: &PreprocessedTensor) -> PreprocessedTensor {
        let view = tensor.view();
        let data = Array3::from_shape_fn(view.dim(), |(c, y, x)| {
            let channel = c.min(2);
            view[[c, y, x]] * self.std[channel] + self.mean[channel]
        });
        PreprocessedTensor::new(data)
    }

    fn normalize(&self, image: &RgbImage) -> PreprocessedTensor {
        let side = self.crop_size as usize;
        let data = Array3::from_shape_fn((3, side, side), |(c, y, x)| {
            let value = image.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0;
            (value - self.mean[c]) / self.std[c]
        });
        PreprocessedTensor::new(data)
    }
}

/// Interpret the raw buffer as RGB according to the frame's layout.
fn decode_rgb(frame: &Frame) -> InterestResult<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return Err(InterestError::Decode(format!(
            "Frame {} has empty dimensions {}x{}",
            frame.sequence_id(),
            width,
            height
        )));
    }

    let layout = frame.layout();
    let expected_len = width as usize * height as usize * layout.bytes_per_pixel();
    let pixels = frame.pixels();
    if pixels.len() != expected_len {
        return Err(InterestError::Decode(format!(
            "Frame {}: {} buffer holds {} bytes, {}x{} needs {}",
            frame.sequence_id(),
            layout,
            pixels.len(),
            width,
            height,
            expected_len
        )));
    }

    let rgb: Vec<u8> = match layout {
        ChannelLayout::Rgb8 => pixels.to_vec(),
        ChannelLayout::Rgba8 => pixels.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect(),
        ChannelLayout::Bgr8 => pixels.chunks_exact(3).flat_map(|p| [p[2], p[1], p[0]]).collect(),
        ChannelLayout::Bgra8 => pixels.chunks_exact(4).flat_map(|p| [p[2], p[1], p[0]]).collect(),
        ChannelLayout::Mono8 => pixels.iter().flat_map(|&v| [v, v, v]).collect(),
        ChannelLayout::Mono16 | ChannelLayout::Yuv422 => {
            return Err(InterestError::Decode(format!(
                "Frame {}: channel layout {} cannot be converted to rgb8",
                frame.sequence_id(),
                layout
            )))
        }
    };

    RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
        InterestError::Decode(format!(
            "Frame {}: failed to build {}x{} RGB image",
            frame.sequence_id(),
            width,
            height
        ))
    })
}

/// Crop a `size x size` window from the image center, padding with black
/// where the image is smaller than the window.
fn center_crop(image: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let left = crop_origin(width, size);
    let top = crop_origin(height, size);

    let mut out = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
    for y in 0..size {
        let src_y = top + y as i64;
        if src_y < 0 || src_y >= height as i64 {
            continue;
        }
        for x in 0..size {
            let src_x = left + x as i64;
            if src_x < 0 || src_x >= width as i64 {
                continue;
            }
            out.put_pixel(x, y, *image.get_pixel(src_x as u32, src_y as u32));
        }
    }
    out
}

/// Offset of the crop window along one axis.
///
/// When the image is larger the offset is `(extent - size) / 2` rounded half
/// to even; when smaller the window starts before the image so the padding is
/// split with the extra pixel on the trailing side.
fn crop_origin(extent: u32, size: u32) -> i64 {
    if extent >= size {
        let diff = extent - size;
        let half = diff / 2;
        let offset = if diff % 2 == 1 && half % 2 == 1 {
            half + 1
        } else {
            half
        };
        offset as i64
    } else {
        -(((size - extent) / 2) as i64)
    }
}
