//! Frame data: pixel buffers, output dimensions, per-frame options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bytes per pixel of the raw RGBA samples handed to encoders.
pub const BYTES_PER_PIXEL: usize = 4;

/// Default per-frame delay in milliseconds.
pub const DEFAULT_DELAY_MS: u32 = 500;

/// Owned buffer of raw RGBA pixel samples.
///
/// Deliberately not `Clone`: once a buffer is put into an `EncodeTask` it
/// belongs to the worker. The only way to get a second buffer is
/// [`PixelBuffer::duplicate`], which makes a distinct allocation.
#[derive(PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// A distinct copy of this buffer (never an alias).
    pub fn duplicate(&self) -> Self {
        Self::new(self.data.clone())
    }

    /// Hand the buffer over a transport.
    ///
    /// `Move` keeps the same allocation, `Copy` re-allocates. Both produce the
    /// same bytes.
    pub fn transfer(self, mode: TransferMode) -> Self {
        match mode {
            TransferMode::Move => self,
            TransferMode::Copy => self.duplicate(),
        }
    }
}

impl From<Vec<u8>> for PixelBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

// 中身は巨大なので長さだけ出す
impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

/// How buffers cross from the coordinator to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Ownership moves with the message, no copy.
    Move,
    /// The transport copies the bytes.
    #[default]
    Copy,
}

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes a raw RGBA frame of this size occupies.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A 24-bit color, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(&self) -> u8 {
        self.0 as u8
    }
}

/// Options the caller attaches to a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOptions {
    /// Display time of the frame.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u32,

    /// Overrides the pipeline-wide transparent color for this frame.
    #[serde(default)]
    pub transparent: Option<Rgb>,

    /// Attach the previous frame's pixels so the encoder can diff against them.
    #[serde(default)]
    pub inter_frame: bool,

    /// This is the final frame of the animation.
    #[serde(default)]
    pub last: bool,
}

fn default_delay_ms() -> u32 {
    DEFAULT_DELAY_MS
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            transparent: None,
            inter_frame: false,
            last: false,
        }
    }
}

impl FrameOptions {
    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_transparent(mut self, color: Rgb) -> Self {
        self.transparent = Some(color);
        self
    }

    pub fn with_inter_frame(mut self) -> Self {
        self.inter_frame = true;
        self
    }

    pub fn mark_last(mut self) -> Self {
        self.last = true;
        self
    }
}

/// Everything an encoder needs to know about a frame besides its pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameParams {
    pub delay_ms: u32,
    pub transparent: Option<Rgb>,
    pub quality: u32,
    pub dimensions: Dimensions,
    /// -1 plays once, 0 loops forever, n loops n times.
    pub repeat: i32,
    pub last: bool,
}
