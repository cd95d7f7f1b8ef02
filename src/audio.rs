use thiserror::Error;

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("channel count must be at least 1")]
    NoChannels,
    #[error("sample rate must be greater than 0")]
    ZeroSampleRate,
    #[error("unsupported sample width: {0} bytes (expected 1-4)")]
    UnsupportedSampleWidth(u16),
    #[error("byte rate overflows u32 for {channels} channels at {sample_rate} Hz")]
    ByteRateOverflow { channels: u16, sample_rate: u32 },
    #[error("PCM payload of {0} bytes does not fit in a RIFF container")]
    TooLarge(usize),
    #[error("PCM payload of {len} bytes is not a whole number of {block_align}-byte frames")]
    PartialFrame { len: usize, block_align: u16 },
}

/// Format of a linear PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    /// Bytes per sample, per channel.
    pub sample_width: u16,
}

impl PcmFormat {
    /// 16-bit mono, the shape the generation provider returns.
    pub fn mono16(sample_rate: u32) -> Self {
        Self {
            channels: 1,
            sample_rate,
            sample_width: 2,
        }
    }

    pub fn with_sample_rate(self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.sample_width * 8
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.sample_width
    }

    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(self.block_align() as u32)
    }

    pub fn duration_secs(&self, pcm_len: usize) -> f64 {
        match self.byte_rate() {
            Some(rate) if rate > 0 => pcm_len as f64 / rate as f64,
            _ => 0.0,
        }
    }

    fn validate(&self) -> Result<u32, EncodeError> {
        if self.channels == 0 {
            return Err(EncodeError::NoChannels);
        }
        if self.sample_rate == 0 {
            return Err(EncodeError::ZeroSampleRate);
        }
        if !(1..=4).contains(&self.sample_width) {
            return Err(EncodeError::UnsupportedSampleWidth(self.sample_width));
        }
        self.channels
            .checked_mul(self.sample_width)
            .and_then(|align| self.sample_rate.checked_mul(align as u32))
            .ok_or(EncodeError::ByteRateOverflow {
                channels: self.channels,
                sample_rate: self.sample_rate,
            })
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::mono16(24_000)
    }
}

/// Frames `pcm` in a canonical WAVE container. Sample values are copied
/// verbatim and never inspected.
pub fn encode_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, EncodeError> {
    let byte_rate = format.validate()?;
    let data_size = u32::try_from(pcm.len())
        .ok()
        .filter(|len| *len <= u32::MAX - 36)
        .ok_or(EncodeError::TooLarge(pcm.len()))?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&format.block_align().to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample().to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(pcm);
    Ok(out)
}

/// [`encode_wav`] with the format spelled out field by field.
pub fn encode(
    pcm: &[u8],
    channels: u16,
    sample_rate: u32,
    sample_width: u16,
) -> Result<Vec<u8>, EncodeError> {
    encode_wav(
        pcm,
        PcmFormat {
            channels,
            sample_rate,
            sample_width,
        },
    )
}

/// Rejects PCM whose length would leave a dangling partial frame.
pub fn ensure_whole_frames(pcm: &[u8], format: PcmFormat) -> Result<(), EncodeError> {
    let block_align = format.block_align();
    if block_align == 0 || pcm.len() % block_align as usize != 0 {
        return Err(EncodeError::PartialFrame {
            len: pcm.len(),
            block_align,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavReader};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn read_u16(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
    }

    #[test]
    fn one_second_of_silence() {
        let pcm = vec![0u8; 48_000];
        let wav = encode(&pcm, 1, 24_000, 2).unwrap();
        assert_eq!(wav.len(), 48_044);
        assert_eq!(read_u32(&wav, 4), 48_008);
        assert_eq!(read_u32(&wav, 40), 48_000);
    }

    #[test]
    fn header_fields() {
        let pcm = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let wav = encode(&pcm, 2, 44_100, 2).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(read_u32(&wav, 16), 16);
        assert_eq!(read_u16(&wav, 20), 1);
        assert_eq!(read_u16(&wav, 22), 2);
        assert_eq!(read_u32(&wav, 24), 44_100);
        assert_eq!(read_u32(&wav, 28), 44_100 * 2 * 2);
        assert_eq!(read_u16(&wav, 32), 4);
        assert_eq!(read_u16(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(&wav[44..], &pcm);
    }

    #[test]
    fn size_fields_track_payload_length() {
        for len in [0usize, 1, 2, 3, 1000, 4097] {
            let pcm = vec![0x5a; len];
            let wav = encode(&pcm, 1, 8_000, 1).unwrap();
            assert_eq!(wav.len(), WAV_HEADER_LEN + len);
            assert_eq!(read_u32(&wav, 4) as usize, 36 + len);
            assert_eq!(read_u32(&wav, 40) as usize, len);
        }
    }

    #[test]
    fn hound_reads_back_16bit_samples() {
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN, 1234, -4321];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav = encode_wav(&pcm, PcmFormat::default()).unwrap();

        let mut reader = WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn hound_reads_back_stereo_24bit() {
        // two stereo frames of 24-bit samples
        let pcm: Vec<u8> = vec![
            0x01, 0x00, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00, 0x40, 0x00, 0x00, 0xc0,
        ];
        let wav = encode(&pcm, 2, 48_000, 3).unwrap();

        let mut reader = WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 24);
        let decoded: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![1, -1, 0x40_0000, -0x40_0000]);
    }

    #[test]
    fn hound_reads_empty_payload() {
        let wav = encode_wav(&[], PcmFormat::default()).unwrap();
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        let reader = WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
        assert_eq!(reader.spec().sample_rate, 24_000);
    }

    #[test]
    fn encoding_is_deterministic() {
        let pcm: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let a = encode(&pcm, 1, 24_000, 2).unwrap();
        let b = encode(&pcm, 1, 24_000, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed_format() {
        assert_eq!(encode(&[], 0, 24_000, 2), Err(EncodeError::NoChannels));
        assert_eq!(encode(&[], 1, 0, 2), Err(EncodeError::ZeroSampleRate));
        assert_eq!(
            encode(&[], 1, 24_000, 5),
            Err(EncodeError::UnsupportedSampleWidth(5))
        );
        assert_eq!(
            encode(&[], u16::MAX, u32::MAX, 4),
            Err(EncodeError::ByteRateOverflow {
                channels: u16::MAX,
                sample_rate: u32::MAX
            })
        );
    }

    #[test]
    fn partial_frames_are_detected() {
        let format = PcmFormat::default();
        assert!(ensure_whole_frames(&[0; 4], format).is_ok());
        assert!(ensure_whole_frames(&[], format).is_ok());
        assert_eq!(
            ensure_whole_frames(&[0; 3], format),
            Err(EncodeError::PartialFrame {
                len: 3,
                block_align: 2
            })
        );
    }

    #[test]
    fn duration_from_length() {
        let format = PcmFormat::default();
        assert!((format.duration_secs(48_000) - 1.0).abs() < f64::EPSILON);
        assert!((format.with_sample_rate(48_000).duration_secs(48_000) - 0.5).abs() < 1e-9);
    }

    proptest! {
        /// Header sizes and payload hold for any bytes in any valid format.
        #[test]
        fn framing_holds_for_any_payload(
            pcm in prop::collection::vec(any::<u8>(), 0..4096),
            channels in 1u16..=8,
            sample_rate in 1u32..=192_000,
            sample_width in 1u16..=4,
        ) {
            let wav = encode(&pcm, channels, sample_rate, sample_width).unwrap();
            prop_assert_eq!(wav.len(), WAV_HEADER_LEN + pcm.len());
            prop_assert_eq!(read_u32(&wav, 4) as usize, 36 + pcm.len());
            prop_assert_eq!(read_u32(&wav, 40) as usize, pcm.len());
            prop_assert_eq!(&wav[WAV_HEADER_LEN..], pcm.as_slice());

            let again = encode(&pcm, channels, sample_rate, sample_width).unwrap();
            prop_assert_eq!(again, wav);
        }

        /// hound reads back the format and sample count for whole-frame payloads.
        #[test]
        fn hound_agrees_on_format(
            frames in 0usize..512,
            seed in any::<u8>(),
            channels in 1u16..=8,
            sample_rate in 1u32..=192_000,
            sample_width in prop::sample::select(vec![1u16, 2, 4]),
        ) {
            let len = frames * channels as usize * sample_width as usize;
            let pcm: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(seed)).collect();
            let wav = encode(&pcm, channels, sample_rate, sample_width).unwrap();

            let reader = WavReader::new(Cursor::new(wav)).unwrap();
            let spec = reader.spec();
            prop_assert_eq!(spec.channels, channels);
            prop_assert_eq!(spec.sample_rate, sample_rate);
            prop_assert_eq!(spec.bits_per_sample, sample_width * 8);
            prop_assert_eq!(spec.sample_format, SampleFormat::Int);
            prop_assert_eq!(reader.len() as usize, frames * channels as usize);
        }
    }
}
