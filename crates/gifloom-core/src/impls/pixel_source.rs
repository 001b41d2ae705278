//! DefaultPixelSource - 3 種類の FrameHandle を解決する標準実装

use crate::domain::{Dimensions, PipelineError, PixelBuffer};
use crate::ports::{FrameHandle, PixelSource};

/// Resolves raw pixels, surfaces and renderable images.
///
/// Every resolved buffer must hold exactly `dims.expected_len()` bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPixelSource;

impl DefaultPixelSource {
    pub fn new() -> Self {
        Self
    }
}

fn check_len(buf: PixelBuffer, dims: Dimensions, kind: &str) -> Result<PixelBuffer, PipelineError> {
    if buf.len() != dims.expected_len() {
        return Err(PipelineError::InvalidSource(format!(
            "{kind} yielded {} bytes, expected {} for {dims}",
            buf.len(),
            dims.expected_len()
        )));
    }
    Ok(buf)
}

impl PixelSource for DefaultPixelSource {
    fn extract(&self, handle: FrameHandle, dims: Dimensions) -> Result<PixelBuffer, PipelineError> {
        match handle {
            FrameHandle::Pixels(buf) => check_len(buf, dims, "pixel data"),
            FrameHandle::Surface(surface) => {
                let data = surface
                    .read_pixels(dims)
                    .map_err(|e| PipelineError::InvalidSource(format!("surface read: {e}")))?;
                check_len(PixelBuffer::new(data), dims, "surface")
            }
            FrameHandle::Image(image) => {
                let mut scratch = vec![0u8; dims.expected_len()];
                image
                    .render(dims, &mut scratch)
                    .map_err(|e| PipelineError::InvalidSource(format!("image render: {e}")))?;
                check_len(PixelBuffer::new(scratch), dims, "image")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{Renderable, Surface};

    struct SolidSurface {
        dims: Dimensions,
        value: u8,
    }

    impl Surface for SolidSurface {
        fn dimensions(&self) -> Dimensions {
            self.dims
        }

        fn read_pixels(&self, region: Dimensions) -> Result<Vec<u8>, String> {
            Ok(vec![self.value; region.expected_len()])
        }
    }

    struct BrokenImage;

    impl Renderable for BrokenImage {
        fn dimensions(&self) -> Dimensions {
            Dimensions::new(1, 1)
        }

        fn render(&self, _target: Dimensions, _scratch: &mut [u8]) -> Result<(), String> {
            Err("not decoded yet".to_string())
        }
    }

    struct Checker;

    impl Renderable for Checker {
        fn dimensions(&self) -> Dimensions {
            Dimensions::new(2, 2)
        }

        fn render(&self, _target: Dimensions, scratch: &mut [u8]) -> Result<(), String> {
            for (i, px) in scratch.chunks_mut(4).enumerate() {
                if i % 2 == 0 {
                    px.copy_from_slice(&[255, 255, 255, 255]);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn raw_pixels_are_reused() {
        let dims = Dimensions::new(2, 1);
        let buf = PixelBuffer::new(vec![7; 8]);
        let ptr = buf.as_slice().as_ptr();
        let out = DefaultPixelSource
            .extract(FrameHandle::Pixels(buf), dims)
            .unwrap();
        assert_eq!(out.as_slice().as_ptr(), ptr);
    }

    #[test]
    fn raw_pixels_of_wrong_size_are_rejected() {
        let err = DefaultPixelSource
            .extract(FrameHandle::Pixels(PixelBuffer::new(vec![0; 5])), Dimensions::new(2, 1))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSource(_)));
    }

    #[test]
    fn surface_is_read_at_target_size() {
        let surface = SolidSurface {
            dims: Dimensions::new(10, 10),
            value: 3,
        };
        let out = DefaultPixelSource
            .extract(FrameHandle::Surface(Box::new(surface)), Dimensions::new(2, 2))
            .unwrap();
        assert_eq!(out.as_slice(), &[3; 16]);
    }

    #[test]
    fn image_is_rendered_into_scratch() {
        let out = DefaultPixelSource
            .extract(FrameHandle::Image(Box::new(Checker)), Dimensions::new(2, 2))
            .unwrap();
        assert_eq!(&out.as_slice()[0..4], &[255; 4]);
        assert_eq!(&out.as_slice()[4..8], &[0; 4]);
    }

    #[test]
    fn render_failure_is_invalid_source() {
        let err = DefaultPixelSource
            .extract(FrameHandle::Image(Box::new(BrokenImage)), Dimensions::new(1, 1))
            .unwrap_err();
        assert!(err.to_string().contains("not decoded yet"));
    }
}
