//! Convenience helpers for loading frames via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{SiamError, SiamResult};
use std::path::Path;

/// Creates a borrowed three-channel view from an RGB image buffer.
pub fn view_from_rgb_image(img: &image::RgbImage) -> SiamResult<ImageView<'_, u8>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    ImageView::from_slice(img.as_raw(), width, height, 3)
}

/// Creates an owned three-channel frame from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> SiamResult<OwnedImage<u8>> {
    let rgb = img.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    OwnedImage::new(rgb.into_raw(), width, height, 3)
}

/// Loads a frame from disk as an owned RGB image.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> SiamResult<OwnedImage<u8>> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| SiamError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    owned_from_dynamic_image(&img)
}
