// Audio processing module
// Stem decoding, the bounded worker pool and stem fingerprinting

pub mod fingerprint;
pub mod ingest;
pub mod pool;

pub use fingerprint::{
    choose_filter, compute_fingerprint, get_audio_fingerprint, AudioFingerprint, CombineFilter,
    FingerprintConfig, FINGERPRINT_SAMPLE_RATE, SHORT_STEM_SECS,
};
pub use ingest::{decode_stem, ingest_ogg, ingest_wav, is_audio_stem, AudioData, AudioError};
pub use pool::{JobHandle, PoolError, WorkerPool};
