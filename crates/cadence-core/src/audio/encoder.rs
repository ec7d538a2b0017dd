//! WAV to headerless PCM conversion

use hound::{SampleFormat, WavReader};
use std::io::Read;
use tracing::debug;

use crate::error::{Error, Result};

/// Codec name of the PCM produced by this module, as ffmpeg spells it.
pub const PCM_CODEC: &str = "pcm_s16le";

/// Read a WAV stream and return its samples as raw little-endian PCM.
///
/// The output keeps the sample width of the source file. 8-bit files stay
/// unsigned, as in the WAV container.
pub fn pcm_from_wav<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int {
        return Err(Error::AudioError(format!(
            "Unsupported WAV sample format {:?}, expected integer PCM",
            spec.sample_format
        )));
    }

    let width = (spec.bits_per_sample as usize).div_ceil(8);
    let mut pcm = Vec::with_capacity(reader.len() as usize * width);

    for sample in reader.samples::<i32>() {
        let sample = sample?;
        match width {
            1 => pcm.push((sample + 128) as u8),
            2 => pcm.extend_from_slice(&(sample as i16).to_le_bytes()),
            3 | 4 => pcm.extend_from_slice(&sample.to_le_bytes()[..width]),
            _ => {
                return Err(Error::AudioError(format!(
                    "Unsupported WAV bit depth {}",
                    spec.bits_per_sample
                )))
            }
        }
    }

    debug!(
        "Decoded WAV: {} Hz, {} bit, {} channel(s), {} PCM bytes",
        spec.sample_rate,
        spec.bits_per_sample,
        spec.channels,
        pcm.len()
    );
    Ok(pcm)
}
