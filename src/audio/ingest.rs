// Stem Decoding - WAV and Ogg Vorbis song stems to normalized f32 samples
// Decoder is chosen per file from its extension

use hound::{SampleFormat, WavReader};
use lewton::inside_ogg::OggStreamReader;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Failed to decode Ogg Vorbis stream: {0}")]
    OggReadError(#[from] lewton::VorbisError),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Invalid audio data")]
    InvalidData,
}

/// Extensions treated as song stems
const STEM_EXTENSIONS: [&str; 4] = ["ogg", "wav", "mp3", "opus"];

#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved, scaled to [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
    /// Samples per channel
    pub frame_count: usize,
}

impl AudioData {
    fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::InvalidData);
        }
        let frame_count = samples.len() / channels as usize;
        let duration_ms = (frame_count as f64 * 1000.0 / sample_rate as f64) as u64;
        Ok(AudioData {
            samples,
            sample_rate,
            channels,
            duration_ms,
            frame_count,
        })
    }

    /// Channel average of every frame
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        if channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// True for audio files that are part of the song mix
///
/// `preview.*` clips are excluded.
pub fn is_audio_stem(file_name: &str) -> bool {
    let Some((stem, extension)) = file_name.rsplit_once('.') else {
        return false;
    };
    let extension = extension.to_ascii_lowercase();
    STEM_EXTENSIONS.contains(&extension.as_str()) && !stem.eq_ignore_ascii_case("preview")
}

/// Decode a stem, choosing the decoder from the file extension
pub fn decode_stem(file_name: &str, data: &[u8]) -> Result<AudioData, AudioError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => ingest_wav(data),
        "ogg" => ingest_ogg(data),
        other => Err(AudioError::UnsupportedFormat(format!(
            "no decoder for .{other} files"
        ))),
    }
}

/// Decode PCM or float WAV bytes
pub fn ingest_wav(data: &[u8]) -> Result<AudioData, AudioError> {
    let cursor = Cursor::new(data);
    let mut reader = WavReader::new(cursor)?;

    let spec = reader.spec();
    let bit_depth = spec.bits_per_sample;
    let sample_format = spec.sample_format;

    let samples: Vec<f32> = match (sample_format, bit_depth) {
        (SampleFormat::Int, 8) => {
            // hound yields 8-bit PCM already centered on zero
            reader
                .samples::<i8>()
                .map(|s| s.map(|s| s as f32 / 128.0))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 8388608.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 2147483648.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        _ => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                sample_format, bit_depth
            )));
        }
    };

    AudioData::new(samples, spec.sample_rate, spec.channels)
}

/// Ingest an Ogg Vorbis stream from raw bytes
pub fn ingest_ogg(data: &[u8]) -> Result<AudioData, AudioError> {
    let mut reader = OggStreamReader::new(Cursor::new(data))?;
    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader.read_dec_packet_itl()? {
        samples.extend(packet.into_iter().map(|s| s as f32 / 32768.0));
    }

    AudioData::new(samples, sample_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_to_mono_averages_frames() {
        let audio = AudioData::new(vec![1.0, 0.0, -0.5, 0.5, 0.25, 0.75, 0.9], 1000, 2).unwrap();
        // Trailing half frame is ignored
        assert_eq!(audio.frame_count, 3);
        assert_eq!(audio.to_mono(), vec![0.5, 0.0, 0.5]);
        assert!(matches!(AudioData::new(vec![], 0, 1), Err(AudioError::InvalidData)));
    }

    #[test]
    fn test_ingest_wav() {
        let bytes = wav_bytes(&[0, 16384, -16384, 32767].repeat(1000), 8000, 2);
        let audio = ingest_wav(&bytes).unwrap();

        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frame_count, 2000);
        assert_eq!(audio.duration_ms, 250);
        assert!((audio.samples[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stem_dispatch() {
        let bytes = wav_bytes(&[0; 100], 8000, 1);
        assert!(decode_stem("guitar.WAV", &bytes).is_ok());
        assert!(matches!(
            decode_stem("song.mp3", &bytes),
            Err(AudioError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            decode_stem("song.ogg", b"not ogg"),
            Err(AudioError::OggReadError(_))
        ));
        assert!(matches!(
            decode_stem("drums.wav", b"RIFF"),
            Err(AudioError::WavReadError(_))
        ));
    }

    #[test]
    fn test_is_audio_stem() {
        assert!(is_audio_stem("song.ogg"));
        assert!(is_audio_stem("drums_1.wav"));
        assert!(is_audio_stem("guitar.OPUS"));
        assert!(!is_audio_stem("preview.ogg"));
        assert!(!is_audio_stem("notes.chart"));
        assert!(!is_audio_stem("album.png"));
        assert!(!is_audio_stem("ogg"));
    }
}
