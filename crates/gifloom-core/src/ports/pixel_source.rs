//! PixelSource port - フレームハンドルから生の RGBA を取り出す
//!
//! 同期 API。取り出しは `submit` の最初（admission 待ちの前）に行う。

use crate::domain::{Dimensions, FrameOptions, PixelBuffer, PipelineError};

/// A drawable surface whose pixels can be read back.
pub trait Surface: Send {
    fn dimensions(&self) -> Dimensions;

    /// Read the top-left `region` as RGBA samples.
    fn read_pixels(&self, region: Dimensions) -> Result<Vec<u8>, String>;
}

/// An image reference that has to be drawn before its pixels exist.
pub trait Renderable: Send {
    fn dimensions(&self) -> Dimensions;

    /// Draw into a zeroed RGBA scratch buffer of `target` size.
    fn render(&self, target: Dimensions, scratch: &mut [u8]) -> Result<(), String>;
}

/// What a caller hands in as a frame.
pub enum FrameHandle {
    /// Raw RGBA samples the caller already owns; reused as-is.
    Pixels(PixelBuffer),
    Surface(Box<dyn Surface>),
    Image(Box<dyn Renderable>),
}

impl FrameHandle {
    /// Size the handle knows about itself. Raw pixels carry none.
    pub fn intrinsic_dimensions(&self) -> Option<Dimensions> {
        match self {
            FrameHandle::Pixels(_) => None,
            FrameHandle::Surface(s) => Some(s.dimensions()),
            FrameHandle::Image(i) => Some(i.dimensions()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FrameHandle::Pixels(_) => "pixels",
            FrameHandle::Surface(_) => "surface",
            FrameHandle::Image(_) => "image",
        }
    }
}

impl std::fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameHandle::Pixels(p) => f.debug_tuple("Pixels").field(p).finish(),
            other => write!(f, "{}({:?})", other.kind(), other.intrinsic_dimensions()),
        }
    }
}

/// A frame submission: the handle plus its per-frame options.
#[derive(Debug)]
pub struct Frame {
    pub handle: FrameHandle,
    pub options: FrameOptions,
}

impl Frame {
    pub fn new(handle: FrameHandle, options: FrameOptions) -> Self {
        Self { handle, options }
    }

    pub fn pixels(data: impl Into<PixelBuffer>) -> Self {
        Self::new(FrameHandle::Pixels(data.into()), FrameOptions::default())
    }

    pub fn surface(surface: impl Surface + 'static) -> Self {
        Self::new(FrameHandle::Surface(Box::new(surface)), FrameOptions::default())
    }

    pub fn image(image: impl Renderable + 'static) -> Self {
        Self::new(FrameHandle::Image(Box::new(image)), FrameOptions::default())
    }

    pub fn with_options(mut self, options: FrameOptions) -> Self {
        self.options = options;
        self
    }
}

/// PixelSource は FrameHandle を生の PixelBuffer に解決する
///
/// # エラー
/// - 解決できないハンドルは `PipelineError::InvalidSource`
pub trait PixelSource: Send + Sync {
    fn extract(&self, handle: FrameHandle, dims: Dimensions) -> Result<PixelBuffer, PipelineError>;
}
