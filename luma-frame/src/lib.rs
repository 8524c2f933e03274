//! Owned luminance (Mono8) image planes and borrowed crop views.
//!
//! A [`LumaFrame`] is the grayscale plane extracted from one camera frame. A
//! [`LumaView`] is a borrowed rectangular sub-region of it, used as decoder
//! input so that only the analysis crop is ever scanned.

use machine_vision_formats::{
    pixel_format::Mono8, ImageBuffer, ImageBufferMutRef, ImageBufferRef, ImageData, ImageMutData,
    ImageStride, Stride,
};

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("buffer of {len} bytes too small for {height} rows of stride {stride}")]
    BufferTooSmall { len: usize, height: u32, stride: u32 },
    #[error("stride {stride} shorter than row width {width}")]
    StrideTooSmall { stride: u32, width: u32 },
    #[error("view {left},{top} {width}x{height} exceeds frame bounds")]
    ViewOutOfBounds {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },
}

/// One grayscale camera frame.
///
/// `stride` may exceed `width` when rows carry padding; all row accessors
/// ignore the padding bytes.
#[derive(Debug, Clone)]
pub struct LumaFrame {
    width: u32,
    height: u32,
    stride: u32,
    image_data: Vec<u8>,
}

fn _test_luma_frame_is_send() {
    // Compile-time test to ensure LumaFrame implements Send trait.
    fn implements<T: Send>() {}
    implements::<LumaFrame>();
}

fn _test_luma_frame_is_image_stride() {
    // Compile-time test to ensure LumaFrame implements ImageStride trait.
    fn implements<T: ImageStride<F>, F>() {}
    implements::<LumaFrame, Mono8>();
}

impl LumaFrame {
    pub fn new(width: u32, height: u32, stride: u32, image_data: Vec<u8>) -> Result<Self> {
        if stride < width {
            return Err(Error::StrideTooSmall { stride, width });
        }
        let needed = height as usize * stride as usize;
        if image_data.len() < needed {
            return Err(Error::BufferTooSmall {
                len: image_data.len(),
                height,
                stride,
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            image_data,
        })
    }

    /// Build a frame whose rows carry no padding.
    pub fn from_packed(width: u32, height: u32, image_data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, width, image_data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row(&self, index: usize) -> &[u8] {
        let start = index * self.stride as usize;
        &self.image_data[start..start + self.width as usize]
    }

    /// Borrow the rectangular sub-region starting at `(left, top)`.
    pub fn view(&self, left: u32, top: u32, width: u32, height: u32) -> Result<LumaView<'_>> {
        let right = left.checked_add(width);
        let bottom = top.checked_add(height);
        match (right, bottom) {
            (Some(right), Some(bottom)) if right <= self.width && bottom <= self.height => {
                let start = top as usize * self.stride as usize + left as usize;
                Ok(LumaView {
                    data: &self.image_data[start..],
                    stride: self.stride as usize,
                    width,
                    height,
                })
            }
            _ => Err(Error::ViewOutOfBounds {
                left,
                top,
                width,
                height,
            }),
        }
    }

    /// View covering the whole frame.
    pub fn full_view(&self) -> LumaView<'_> {
        LumaView {
            data: &self.image_data,
            stride: self.stride as usize,
            width: self.width,
            height: self.height,
        }
    }
}

impl PartialEq for LumaFrame {
    fn eq(&self, other: &LumaFrame) -> bool {
        if self.width != other.width || self.height != other.height {
            return false;
        }
        // Strides may differ; compare only the valid part of each row.
        (0..self.height as usize).all(|i| self.row(i) == other.row(i))
    }
}

impl ImageData<Mono8> for LumaFrame {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn buffer_ref(&self) -> ImageBufferRef<'_, Mono8> {
        ImageBufferRef::new(&self.image_data)
    }
    fn buffer(self) -> ImageBuffer<Mono8> {
        ImageBuffer::new(self.image_data)
    }
}

impl ImageMutData<Mono8> for LumaFrame {
    fn buffer_mut_ref(&mut self) -> ImageBufferMutRef<'_, Mono8> {
        ImageBufferMutRef::new(&mut self.image_data)
    }
}

impl Stride for LumaFrame {
    fn stride(&self) -> usize {
        self.stride as usize
    }
}

impl From<LumaFrame> for Vec<u8> {
    fn from(orig: LumaFrame) -> Vec<u8> {
        orig.image_data
    }
}

/// Borrowed rectangular region of a [`LumaFrame`].
#[derive(Debug, Clone, Copy)]
pub struct LumaView<'a> {
    data: &'a [u8],
    stride: usize,
    width: u32,
    height: u32,
}

impl<'a> LumaView<'a> {
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row(&self, index: usize) -> &'a [u8] {
        let start = index * self.stride;
        &self.data[start..start + self.width as usize]
    }
}
