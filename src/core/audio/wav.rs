//! WAV container encoding for headerless PCM payloads.
//!
//! Some providers return raw little-endian PCM without any header. The samples
//! of every chunk are concatenated first and wrapped exactly once here, so the
//! final artifact carries a single canonical 44-byte RIFF header.

use bytes::{BufMut, Bytes, BytesMut};

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Size of the `fmt ` sub-chunk body for plain PCM.
const FMT_CHUNK_LEN: u32 = 16;

/// WAVE_FORMAT_PCM
const PCM_FORMAT_TAG: u16 = 1;

/// Layout of raw PCM samples returned by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bytes_per_sample: u16,
}

impl PcmFormat {
    /// 16-bit mono PCM at 24 kHz.
    pub const MONO_16BIT_24KHZ: PcmFormat = PcmFormat {
        sample_rate: 24_000,
        channels: 1,
        bytes_per_sample: 2,
    };

    /// Bytes per sample frame across all channels.
    #[inline]
    pub fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample
    }

    /// Bytes per second of audio.
    #[inline]
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    #[inline]
    pub fn bits_per_sample(&self) -> u16 {
        self.bytes_per_sample * 8
    }
}

/// Wrap raw PCM `samples` in a 44-byte WAV header.
///
/// The sample bytes are copied unmodified after the header. All numeric header
/// fields are little-endian; the four-character tags are written as-is.
pub fn encode_wav(samples: &[u8], format: PcmFormat) -> Bytes {
    let data_len = samples.len() as u32;
    let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN + samples.len());

    // RIFF chunk descriptor
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");

    // fmt sub-chunk
    buf.put_slice(b"fmt ");
    buf.put_u32_le(FMT_CHUNK_LEN);
    buf.put_u16_le(PCM_FORMAT_TAG);
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(format.byte_rate());
    buf.put_u16_le(format.block_align());
    buf.put_u16_le(format.bits_per_sample());

    // data sub-chunk
    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(samples);

    buf.freeze()
}

/// Detect audio format from magic bytes.
///
/// Returns `(mime_type, file_extension)`.
pub fn detect_audio_format(data: &[u8]) -> (&'static str, &'static str) {
    if data.len() < 12 {
        return ("application/octet-stream", "bin");
    }

    if data.starts_with(b"ID3") || (data[0] == 0xFF && (data[1] & 0xE0) == 0xE0) {
        return ("audio/mpeg", "mp3");
    }
    if data.starts_with(b"RIFF") && &data[8..12] == b"WAVE" {
        return ("audio/wav", "wav");
    }
    if &data[4..8] == b"ftyp" {
        return ("audio/mp4", "m4a");
    }
    if data.starts_with(b"OggS") {
        return ("audio/ogg", "ogg");
    }
    if data.starts_with(b"fLaC") {
        return ("audio/flac", "flac");
    }

    ("application/octet-stream", "bin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_header_layout_for_mono_16bit() {
        let samples = vec![0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06];
        let wav = encode_wav(&samples, PcmFormat::MONO_16BIT_24KHZ);

        assert_eq!(wav.len(), WAV_HEADER_LEN + samples.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + samples.len() as u32);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 24_000);
        assert_eq!(u32_at(&wav, 28), 48_000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), samples.len() as u32);
        assert_eq!(&wav[44..], &samples[..]);
    }

    #[test]
    fn test_stereo_24bit_rates() {
        let format = PcmFormat {
            sample_rate: 44_100,
            channels: 2,
            bytes_per_sample: 3,
        };
        let wav = encode_wav(&[0u8; 12], format);
        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 28), 44_100 * 6);
        assert_eq!(u16_at(&wav, 32), 6);
        assert_eq!(u16_at(&wav, 34), 24);
    }

    #[test]
    fn test_empty_samples_produce_bare_header() {
        let wav = encode_wav(&[], PcmFormat::MONO_16BIT_24KHZ);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&wav, 4), 36);
        assert_eq!(u32_at(&wav, 40), 0);
    }

    #[test]
    fn test_encoded_wav_is_readable_by_hound() {
        let pcm: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let samples: Vec<u8> = pcm.iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav = encode_wav(&samples, PcmFormat::MONO_16BIT_24KHZ);

        let reader = hound::WavReader::new(Cursor::new(wav.to_vec())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, pcm);
    }

    #[test]
    fn test_detect_audio_format() {
        let mp3_id3 = b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(detect_audio_format(mp3_id3), ("audio/mpeg", "mp3"));

        let mp3_sync = [0xFF, 0xFB, 0x90, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(detect_audio_format(&mp3_sync), ("audio/mpeg", "mp3"));

        let wav = encode_wav(&[0u8; 4], PcmFormat::MONO_16BIT_24KHZ);
        assert_eq!(detect_audio_format(&wav), ("audio/wav", "wav"));

        assert_eq!(
            detect_audio_format(b"OggS\x00\x02\x00\x00\x00\x00\x00\x00"),
            ("audio/ogg", "ogg")
        );
        assert_eq!(
            detect_audio_format(b"fLaC\x00\x00\x00\x22\x10\x00\x10\x00"),
            ("audio/flac", "flac")
        );
        assert_eq!(
            detect_audio_format(b"short"),
            ("application/octet-stream", "bin")
        );
    }
}
