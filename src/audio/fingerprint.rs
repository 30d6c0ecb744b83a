// Audio Fingerprint - Combines song stems into one signal and hashes its spectrum
// Stem decoding and fingerprinting run as jobs on a shared worker pool

use std::slice;

use realfft::RealFftPlanner;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};

use crate::audio::ingest::{decode_stem, is_audio_stem, AudioError};
use crate::audio::pool::{PoolError, WorkerPool};
use crate::scan::FolderFile;

/// Rate every stem is resampled to before hashing
pub const FINGERPRINT_SAMPLE_RATE: u32 = 11025;

/// Stems shorter than this are mixed rather than merged
pub const SHORT_STEM_SECS: f64 = 10.0;

const FRAME_SIZE: usize = 2048;
/// Input frames per resampler call
const RESAMPLE_CHUNK: usize = 1024;
const HOP_SIZE: usize = 256;
const BAND_COUNT: usize = 33;
const MIN_BAND_HZ: f64 = 300.0;
const MAX_BAND_HZ: f64 = 2000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Worker threads in the pool
    pub max_workers: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig { max_workers: 4 }
    }
}

impl FingerprintConfig {
    pub fn start_pool(&self) -> Result<WorkerPool, PoolError> {
        WorkerPool::start(self.max_workers)
    }
}

/// How stems are combined into one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineFilter {
    /// Average over the longest stem, shorter stems padded with silence
    Mix,
    /// Average over the shortest stem
    Merge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFingerprint {
    /// One 32-bit sub-fingerprint per analysis frame
    pub audio_hash: Vec<u32>,

    /// Length of the combined signal, None when no stem could be decoded
    pub audio_length_ms: Option<u64>,

    /// Per-stem failures, formatted as "file: reason"
    pub errors: Vec<String>,
}

/// A decoded stem, mono at the fingerprint rate
#[derive(Debug, Clone)]
struct PreparedStem {
    samples: Vec<f32>,
    duration_ms: u64,
}

fn prepare_stem(name: &str, data: &[u8]) -> Result<PreparedStem, AudioError> {
    let audio = decode_stem(name, data)?;
    if audio.frame_count == 0 {
        return Err(AudioError::InvalidData);
    }
    let samples = resample_mono(&audio.to_mono(), audio.sample_rate, FINGERPRINT_SAMPLE_RATE)?;
    Ok(PreparedStem {
        samples,
        duration_ms: audio.duration_ms,
    })
}

/// Mix when any stem is shorter than `SHORT_STEM_SECS`, otherwise merge
pub fn choose_filter(durations_ms: &[u64]) -> CombineFilter {
    let shortest = durations_ms.iter().copied().min().unwrap_or(0);
    if !durations_ms.is_empty() && (shortest as f64) < SHORT_STEM_SECS * 1000.0 {
        CombineFilter::Mix
    } else {
        CombineFilter::Merge
    }
}

/// Band-limited sinc resampling of a mono signal
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::InvalidData);
    }
    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        1.0,
        SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        },
        RESAMPLE_CHUNK,
        1,
    )
    .map_err(|e| AudioError::Resample(e.to_string()))?;

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        let frames = resampler
            .process(slice::from_ref(&chunk), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let frames = resampler
            .process_partial(Some(slice::from_ref(&remainder)), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    // Flush the filter tail
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

fn combine_stems(stems: &[Vec<f32>], filter: CombineFilter) -> Vec<f32> {
    let lengths = stems.iter().map(|s| s.len());
    let len = match filter {
        CombineFilter::Mix => lengths.max(),
        CombineFilter::Merge => lengths.min(),
    }
    .unwrap_or(0);

    let mut combined = vec![0.0f32; len];
    for stem in stems {
        for (out, &s) in combined.iter_mut().zip(stem.iter()) {
            *out += s;
        }
    }
    let count = stems.len().max(1) as f32;
    combined.iter_mut().for_each(|s| *s /= count);
    combined
}

/// FFT bin ranges for the log-spaced bands
fn band_bins() -> Vec<(usize, usize)> {
    let bin_hz = FINGERPRINT_SAMPLE_RATE as f64 / FRAME_SIZE as f64;
    let step = (MAX_BAND_HZ / MIN_BAND_HZ).powf(1.0 / BAND_COUNT as f64);

    (0..BAND_COUNT)
        .map(|b| {
            let lo_hz = MIN_BAND_HZ * step.powi(b as i32);
            let hi_hz = lo_hz * step;
            let lo = (lo_hz / bin_hz).floor() as usize;
            let hi = ((hi_hz / bin_hz).floor() as usize).max(lo + 1);
            (lo, hi)
        })
        .collect()
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Band energies of every frame
fn frame_energies(samples: &[f32]) -> Result<Vec<[f64; BAND_COUNT]>, AudioError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let frame_count = if samples.len() <= FRAME_SIZE {
        1
    } else {
        1 + (samples.len() - FRAME_SIZE) / HOP_SIZE
    };

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let window = hann_window(FRAME_SIZE);
    let bands = band_bins();

    let mut energies = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let start = frame * HOP_SIZE;
        let end = (start + FRAME_SIZE).min(samples.len());

        input.iter_mut().for_each(|s| *s = 0.0);
        for (i, &s) in samples[start..end].iter().enumerate() {
            input[i] = s * window[i];
        }

        fft.process(&mut input, &mut spectrum)
            .map_err(|e| AudioError::Fft(e.to_string()))?;

        let mut row = [0.0f64; BAND_COUNT];
        for (energy, &(lo, hi)) in row.iter_mut().zip(bands.iter()) {
            *energy = spectrum[lo..hi]
                .iter()
                .map(|c| c.norm_sqr() as f64)
                .sum();
        }
        energies.push(row);
    }

    Ok(energies)
}

/// One sub-fingerprint per frame after the first
///
/// Bit `m` (most significant first) is set when the energy difference between
/// bands `m` and `m + 1` grew since the previous frame.
pub fn compute_fingerprint(samples: &[f32]) -> Result<Vec<u32>, AudioError> {
    let energies = frame_energies(samples)?;

    Ok(energies
        .windows(2)
        .map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            (0..BAND_COUNT - 1).fold(0u32, |bits, m| {
                let delta = (cur[m] - cur[m + 1]) - (prev[m] - prev[m + 1]);
                if delta > 0.0 {
                    bits | (1 << (31 - m))
                } else {
                    bits
                }
            })
        })
        .collect())
}

/// Fingerprint the audio stems of a chart folder
///
/// Never fails: stems that cannot be decoded are listed in `errors` and the
/// rest are still fingerprinted.
pub fn get_audio_fingerprint(pool: &WorkerPool, files: &[FolderFile]) -> AudioFingerprint {
    let mut result = AudioFingerprint::default();

    let mut jobs = Vec::new();
    for file in files.iter().filter(|f| is_audio_stem(&f.name)) {
        let name = file.name.clone();
        let data = file.data.clone();
        match pool.submit(move || prepare_stem(&name, &data)) {
            Ok(handle) => jobs.push((file.name.as_str(), handle)),
            Err(e) => result.errors.push(format!("{}: {}", file.name, e)),
        }
    }

    if jobs.is_empty() && result.errors.is_empty() {
        result.errors.push("no audio stems found".to_string());
    }

    let mut stems = Vec::new();
    for (name, handle) in jobs {
        let outcome = match handle.wait() {
            Ok(Ok(stem)) => Ok(stem),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match outcome {
            Ok(stem) => stems.push(stem),
            Err(message) => {
                log::warn!("Skipping audio stem {}: {}", name, message);
                result.errors.push(format!("{}: {}", name, message));
            }
        }
    }

    if stems.is_empty() {
        return result;
    }

    let durations: Vec<u64> = stems.iter().map(|s| s.duration_ms).collect();
    let filter = choose_filter(&durations);
    result.audio_length_ms = match filter {
        CombineFilter::Mix => durations.iter().copied().max(),
        CombineFilter::Merge => durations.iter().copied().min(),
    };

    let signals: Vec<Vec<f32>> = stems.into_iter().map(|s| s.samples).collect();
    let job = pool.submit(move || compute_fingerprint(&combine_stems(&signals, filter)));
    let hashed = match job {
        Ok(handle) => match handle.wait() {
            Ok(hash) => hash.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        },
        Err(e) => Err(e.to_string()),
    };

    match hashed {
        Ok(hash) => {
            log::info!(
                "Fingerprinted {} stems ({:?}): {} frames",
                durations.len(),
                filter,
                hash.len()
            );
            result.audio_hash = hash;
        }
        Err(message) => {
            log::warn!("Fingerprint failed: {}", message);
            result.errors.push(format!("fingerprint: {}", message));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sine_wav(freq: f32, secs: f32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let total = (secs * sample_rate as f32) as usize;
            for i in 0..total {
                let t = i as f32 / sample_rate as f32;
                let s = (2.0 * std::f32::consts::PI * freq * t).sin() * 0.5;
                writer.write_sample((s * 32767.0) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_unreadable_stem() {
        let pool = WorkerPool::start(2).unwrap();
        let files = vec![FolderFile::new("song.ogg", b"definitely not audio".to_vec())];
        let fp = get_audio_fingerprint(&pool, &files);

        assert!(fp.audio_hash.is_empty());
        assert_eq!(fp.audio_length_ms, None);
        assert_eq!(fp.errors.len(), 1);
        assert!(fp.errors[0].starts_with("song.ogg: "));
    }

    #[test]
    fn test_single_wav_stem() {
        let pool = WorkerPool::start(2).unwrap();
        let files = vec![
            FolderFile::new("notes.chart", b"[Song]".to_vec()),
            FolderFile::new("song.wav", sine_wav(440.0, 1.0, 8000)),
        ];
        let fp = get_audio_fingerprint(&pool, &files);

        assert!(fp.errors.is_empty());
        assert_eq!(fp.audio_length_ms, Some(1000));
        // 11025 samples at the fingerprint rate: 36 frames, 35 sub-fingerprints
        assert_eq!(fp.audio_hash.len(), 35);
    }

    #[test]
    fn test_bad_stem_does_not_block_good_one() {
        let pool = WorkerPool::start(1).unwrap();
        let files = vec![
            FolderFile::new("drums.wav", b"RIFF".to_vec()),
            FolderFile::new("guitar.wav", sine_wav(330.0, 1.0, 8000)),
            FolderFile::new("preview.ogg", b"skipped".to_vec()),
        ];
        let fp = get_audio_fingerprint(&pool, &files);

        assert!(!fp.audio_hash.is_empty());
        assert_eq!(fp.errors.len(), 1);
        assert!(fp.errors[0].starts_with("drums.wav: "));
    }

    #[test]
    fn test_no_stems() {
        let pool = WorkerPool::start(1).unwrap();
        let fp = get_audio_fingerprint(&pool, &[FolderFile::new("song.ini", b"".to_vec())]);
        assert!(fp.audio_hash.is_empty());
        assert_eq!(fp.audio_length_ms, None);
        assert_eq!(fp.errors.len(), 1);
    }

    #[test]
    fn test_terminated_pool() {
        let pool = WorkerPool::start(1).unwrap();
        pool.terminate();
        let files = vec![FolderFile::new("song.wav", sine_wav(440.0, 0.5, 8000))];
        let fp = get_audio_fingerprint(&pool, &files);
        assert!(fp.audio_hash.is_empty());
        assert_eq!(fp.errors.len(), 1);
    }

    #[test]
    fn test_choose_filter() {
        assert_eq!(choose_filter(&[5_000, 200_000]), CombineFilter::Mix);
        assert_eq!(choose_filter(&[60_000, 61_000]), CombineFilter::Merge);
        assert_eq!(choose_filter(&[10_000]), CombineFilter::Merge);
    }

    #[test]
    fn test_combine_stems() {
        let stems = vec![vec![1.0, 1.0, 1.0], vec![0.0]];
        assert_eq!(combine_stems(&stems, CombineFilter::Mix), vec![0.5, 0.5, 0.5]);
        assert_eq!(combine_stems(&stems, CombineFilter::Merge), vec![0.5]);
    }

    fn tone(freq: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
        (0..(secs * sample_rate as f32) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_resample_length() {
        let out = resample_mono(&tone(440.0, 1.0, 8000), 8000, FINGERPRINT_SAMPLE_RATE).unwrap();
        assert_eq!(out.len(), 11025);
        let out = resample_mono(&tone(440.0, 0.5, 44100), 44100, FINGERPRINT_SAMPLE_RATE).unwrap();
        assert_eq!(out.len(), 5513);
        assert_eq!(resample_mono(&[1.0, 2.0], 100, 100).unwrap(), vec![1.0, 2.0]);
        assert!(matches!(resample_mono(&[1.0], 0, 100), Err(AudioError::InvalidData)));
    }

    #[test]
    fn test_resample_removes_content_above_nyquist() {
        // 8 kHz folds onto ~3 kHz at 11025 Hz unless filtered out
        let high = resample_mono(&tone(8000.0, 1.0, 44100), 44100, FINGERPRINT_SAMPLE_RATE).unwrap();
        let low = resample_mono(&tone(440.0, 1.0, 44100), 44100, FINGERPRINT_SAMPLE_RATE).unwrap();

        // Skip the edges where the filter ramps in and out
        let body = 1000..high.len() - 1000;
        assert!(rms(&high[body.clone()]) < 0.05);
        assert!(rms(&low[body]) > 0.6);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let samples: Vec<f32> = (0..8000).map(|i| ((i * 7) % 13) as f32 / 13.0 - 0.5).collect();
        let a = compute_fingerprint(&samples).unwrap();
        let b = compute_fingerprint(&samples).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), (8000 - FRAME_SIZE) / HOP_SIZE);
        assert!(compute_fingerprint(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_band_bins_cover_range() {
        let bins = band_bins();
        assert_eq!(bins.len(), BAND_COUNT);
        assert!(bins.iter().all(|&(lo, hi)| hi > lo && hi <= FRAME_SIZE / 2 + 1));
        assert!(bins.windows(2).all(|w| w[1].0 >= w[0].0));
    }
}
