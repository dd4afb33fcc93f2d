use crate::samples::BufferConfig;

/// Default capture window in milliseconds.
pub const DEFAULT_DURATION_MS: usize = 200;

/// Default sample rate in kHz (samples per millisecond per channel).
pub const DEFAULT_SAMPLE_RATE_KHZ: usize = 16;

/// Default channel count (mono).
pub const DEFAULT_CHANNELS: usize = 1;

/// Number of samples held by a default-configured buffer.
pub const DEFAULT_CAPACITY: usize = DEFAULT_DURATION_MS * DEFAULT_SAMPLE_RATE_KHZ * DEFAULT_CHANNELS;

/// 200 ms of 16 kHz mono audio.
pub const DEFAULT_CONFIG: BufferConfig =
    BufferConfig::new(DEFAULT_DURATION_MS, DEFAULT_SAMPLE_RATE_KHZ, DEFAULT_CHANNELS);
