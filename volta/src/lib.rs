//! # volta
//!
//! A `no_std`, zero-allocation toolkit for sharing memory between an
//! interrupt handler and the main loop on a single-core microcontroller.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Access | [`volatile`] | Non-elidable reads/writes of integral values, [`VolatileCell`] |
//! | Storage | [`samples`] | [`SampleBuffer`] circular buffer with volatile push and iteration |
//! | Config | [`constants`] | Default capture window (200 ms, 16 kHz, mono) |
//!
//! ## Quick start
//!
//! ```ignore
//! use volta::{AudioSamples, DEFAULT_CONFIG};
//!
//! static SAMPLES: AudioSamples = AudioSamples::new(DEFAULT_CONFIG);
//!
//! // Microphone ISR: never touches the buffer except through volatile accesses
//! fn audio_sample_isr(sample: i16) {
//!     SAMPLES.volatile_push(sample);
//! }
//!
//! // Main loop: scan the whole window every pass; overrun is fine
//! loop {
//!     for frame in &SAMPLES {
//!         process_mono_frame(frame);
//!     }
//! }
//! ```
//!
//! Other capture windows are declared with [`sample_buffer!`], which derives
//! the slot count from the configuration:
//!
//! ```ignore
//! volta::sample_buffer! {
//!     static STEREO: i16 = { duration_ms: 50, sample_rate_khz: 48, channels: 2 };
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `defmt` | no | `defmt::Format` for [`BufferConfig`] |
//!
//! ## Concurrency model
//!
//! One producer (an ISR) and one polling consumer on the same core. No locks,
//! no atomics, no critical sections. A slow consumer loses old samples; the
//! producer is never blocked.

#![no_std]

pub mod constants;
pub mod samples;
pub mod volatile;

pub use constants::DEFAULT_CONFIG;
pub use samples::{BufferConfig, SampleBuffer, VolatileIter};
pub use volatile::{volatile_read, volatile_write, Integral, VolatileCell};

/// Signed 16-bit mono buffer with the default 200 ms / 16 kHz window.
pub type AudioSamples = SampleBuffer<i16, { constants::DEFAULT_CAPACITY }>;

/// Declare a `static` [`SampleBuffer`] whose slot count is computed from its
/// capture window.
///
/// ```ignore
/// volta::sample_buffer! {
///     pub static MIC: i16 = { duration_ms: 200, sample_rate_khz: 16, channels: 1 };
/// }
/// assert_eq!(MIC.size(), 3200);
/// ```
#[macro_export]
macro_rules! sample_buffer {
    (
        $(#[$meta:meta])*
        $vis:vis static $name:ident : $sample:ty = {
            duration_ms: $duration:expr,
            sample_rate_khz: $rate:expr,
            channels: $channels:expr $(,)?
        };
    ) => {
        $(#[$meta])*
        $vis static $name: $crate::SampleBuffer<$sample, { ($duration) * ($rate) * ($channels) }> =
            $crate::SampleBuffer::new($crate::BufferConfig::new($duration, $rate, $channels));
    };
}
