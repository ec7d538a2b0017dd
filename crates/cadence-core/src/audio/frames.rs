//! Fixed-size frame chunking

use bytes::Bytes;
use tracing::debug;

/// One fixed-size block of PCM bytes.
pub type Frame = Bytes;

/// Split raw PCM into frames of exactly `frame_bytes` bytes.
///
/// The final short frame is padded with silence. Empty input yields no
/// frames.
pub fn chunk_frames(pcm: &[u8], frame_bytes: usize) -> Vec<Frame> {
    if pcm.is_empty() || frame_bytes == 0 {
        return Vec::new();
    }

    let frames: Vec<Frame> = pcm
        .chunks(frame_bytes)
        .map(|chunk| {
            if chunk.len() == frame_bytes {
                Bytes::copy_from_slice(chunk)
            } else {
                let mut padded = Vec::with_capacity(frame_bytes);
                padded.extend_from_slice(chunk);
                padded.resize(frame_bytes, 0);
                Bytes::from(padded)
            }
        })
        .collect();

    debug!(
        "Chunked {} bytes into {} frames of {} bytes",
        pcm.len(),
        frames.len(),
        frame_bytes
    );
    frames
}

/// An all-zero frame.
pub fn silence_frame(frame_bytes: usize) -> Frame {
    Bytes::from(vec![0u8; frame_bytes])
}
