//! Interleaved image views and owned buffers.
//!
//! `ImageView` is a borrowed `height x width x channels` view into a 1D buffer
//! with an explicit stride. The stride counts elements between the starts of
//! consecutive rows, so a stride larger than `width * channels` represents
//! padded rows. Frames are `u8` views; patches produced by cropping and
//! resampling are owned `f32` images.

use crate::util::{SiamError, SiamResult};

#[cfg(feature = "image-io")]
pub mod io;
pub(crate) mod resize;

/// Borrowed interleaved image view with an explicit row stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width * channels`.
    pub fn from_slice(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
    ) -> SiamResult<Self> {
        let row_len = row_len(width, height, channels)?;
        Self::new(data, width, height, channels, row_len)
    }

    /// Creates a view with an explicit stride in elements.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> SiamResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
        if data.len() < needed {
            return Err(SiamError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the channel values of pixel `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x.checked_mul(self.channels)?)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns row `y` as a slice of `width * channels` elements.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }
}

impl<T: Copy + Into<f64>> ImageView<'_, T> {
    /// Mean value of every channel over all pixels.
    pub fn channel_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0f64; self.channels];
        for y in 0..self.height {
            let Some(row) = self.row(y) else {
                continue;
            };
            for px in row.chunks_exact(self.channels) {
                for (sum, &value) in sums.iter_mut().zip(px) {
                    *sum += value.into();
                }
            }
        }
        let count = (self.width * self.height) as f64;
        sums.iter_mut().for_each(|sum| *sum /= count);
        sums
    }
}

/// Owned contiguous interleaved image buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
    channels: usize,
}

impl<T> OwnedImage<T> {
    /// Creates an owned image from a contiguous buffer of exactly
    /// `width * height * channels` elements.
    pub fn new(data: Vec<T>, width: usize, height: usize, channels: usize) -> SiamResult<Self> {
        let row_len = row_len(width, height, channels)?;
        let needed = row_len
            .checked_mul(height)
            .ok_or(SiamError::InvalidDimensions {
                width,
                height,
                channels,
            })?;
        if data.len() < needed {
            return Err(SiamError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(SiamError::InvalidDimensions {
                width,
                height,
                channels,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            stride: self.width * self.channels,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the contiguous pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Consumes the image and returns its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

fn row_len(width: usize, height: usize, channels: usize) -> SiamResult<usize> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(SiamError::InvalidDimensions {
            width,
            height,
            channels,
        });
    }
    width.checked_mul(channels).ok_or(SiamError::InvalidDimensions {
        width,
        height,
        channels,
    })
}

fn required_len(width: usize, height: usize, channels: usize, stride: usize) -> SiamResult<usize> {
    let row_len = row_len(width, height, channels)?;
    if stride < row_len {
        return Err(SiamError::InvalidStride { row_len, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(SiamError::InvalidDimensions {
            width,
            height,
            channels,
        })
}

#[cfg(test)]
mod tests {
    use super::{ImageView, OwnedImage};
    use crate::util::SiamError;

    #[test]
    fn pixel_respects_stride_and_channels() {
        // 2x2 RGB with one element of padding per row.
        let data: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 0, 7, 8, 9, 10, 11, 12, 0];
        let view = ImageView::new(&data, 2, 2, 3, 7).unwrap();
        assert_eq!(view.pixel(1, 0).unwrap(), &[4, 5, 6]);
        assert_eq!(view.pixel(0, 1).unwrap(), &[7, 8, 9]);
        assert!(view.pixel(2, 0).is_none());
        assert_eq!(view.row(1).unwrap().len(), 6);
    }

    #[test]
    fn channel_means_average_each_channel() {
        let data: Vec<u8> = vec![0, 10, 100, 20, 30, 200];
        let view = ImageView::from_slice(&data, 2, 1, 3).unwrap();
        assert_eq!(view.channel_means(), vec![10.0, 20.0, 150.0]);
    }

    #[test]
    fn owned_image_rejects_wrong_length() {
        let err = OwnedImage::new(vec![0u8; 5], 2, 1, 3).unwrap_err();
        assert_eq!(err, SiamError::BufferTooSmall { needed: 6, got: 5 });
        let err = OwnedImage::new(vec![0u8; 7], 2, 1, 3).unwrap_err();
        assert_eq!(
            err,
            SiamError::InvalidDimensions {
                width: 2,
                height: 1,
                channels: 3,
            }
        );
    }
}
