//! PCM handling for paced output

mod encoder;
mod frames;

pub use encoder::{pcm_from_wav, PCM_CODEC};
pub use frames::{chunk_frames, silence_frame, Frame};
