//! Audio reassembly helpers.

mod wav;

pub use wav::{PcmFormat, WAV_HEADER_LEN, detect_audio_format, encode_wav};
