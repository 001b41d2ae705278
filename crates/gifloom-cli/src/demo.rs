//! Demo encoder and synthetic frames.
//!
//! Not a GIF encoder. Run-length codes RGBA pixels so payload sizes vary with
//! content, and sleeps a random while so results come back out of order.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use gifloom_core::domain::{Dimensions, EncodeTask, PixelBuffer};
use gifloom_core::ports::FrameEncoder;

pub struct RunLengthEncoder {
    jitter_ms: u64,
}

impl RunLengthEncoder {
    pub fn new(jitter_ms: u64) -> Self {
        Self { jitter_ms }
    }
}

#[async_trait]
impl FrameEncoder for RunLengthEncoder {
    async fn encode(&self, task: &EncodeTask) -> Result<Vec<u8>, String> {
        let delay = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let pixels = task.pixels.as_slice();
        if pixels.len() % 4 != 0 {
            return Err(format!("{} bytes is not whole RGBA pixels", pixels.len()));
        }
        // 前フレームがあれば差分（XOR）を符号化する
        let source: Vec<u8> = match &task.previous {
            Some(prev) if prev.len() == pixels.len() => pixels
                .iter()
                .zip(prev.as_slice())
                .map(|(a, b)| a ^ b)
                .collect(),
            _ => pixels.to_vec(),
        };
        Ok(run_length(&source))
    }
}

/// `[count, r, g, b, a]` per run, runs capped at 255 pixels.
fn run_length(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut pixels = rgba.chunks_exact(4).peekable();
    while let Some(px) = pixels.next() {
        let mut count: u8 = 1;
        while count < u8::MAX && pixels.peek() == Some(&px) {
            pixels.next();
            count += 1;
        }
        out.push(count);
        out.extend_from_slice(px);
    }
    out
}

/// Horizontal/vertical gradient whose blue channel moves with `frame`.
pub fn gradient(dims: Dimensions, frame: u64) -> PixelBuffer {
    let (w, h) = (dims.width.max(1), dims.height.max(1));
    let mut data = Vec::with_capacity(dims.expected_len());
    for y in 0..dims.height {
        for x in 0..dims.width {
            data.push((x * 255 / w) as u8);
            data.push((y * 255 / h) as u8);
            data.push((frame * 32 % 256) as u8);
            data.push(u8::MAX);
        }
    }
    PixelBuffer::new(data)
}
