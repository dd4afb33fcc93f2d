//! Microphone capture: the ISR-producer / polling-consumer pattern on a host.
//!
//! A sine-tone "microphone" stands in for the audio front-end. A simulated
//! sample timer preempts the main loop every few frames and runs the capture
//! ISR, which pushes one sample into the static [`AudioSamples`] buffer. The
//! main loop scans the whole buffer every pass with volatile reads and feeds
//! each frame to a level meter.
//!
//! ```text
//!   SineMic ──► SampleTimer::fire ──► ISR (auto | manual) ──► SAMPLES
//!                                                               │
//!   main loop ◄─────────── volatile iter ◄──────────────────────┘
//!       └──► FrameMeter (peak, RMS) ──► tracing
//! ```
//!
//! Usage: `mic_capture [PASSES]` (default 8). Set `RUST_LOG=debug` to see
//! every interrupt burst.

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use volta::{volatile_read, volatile_write, AudioSamples, DEFAULT_CONFIG};

/// Holds the most recent 200 ms of 16 kHz mono audio.
static SAMPLES: AudioSamples = AudioSamples::new(DEFAULT_CONFIG);

const TONE_HZ: f32 = 440.0;
const TONE_LEVEL: f32 = 0.5;
/// Consumer frames processed between two simulated sample interrupts.
const FRAMES_PER_INTERRUPT: usize = 4;
const DEFAULT_PASSES: usize = 8;

// ── Audio front-end ─────────────────────────────────────────────────────────

/// Sine oscillator driven by a normalized phase accumulator.
struct SineMic {
    /// Current phase in cycles, kept in `[0, 1)`.
    phase: f32,
    /// Phase advance per sample: `hz / sample_rate_hz`.
    increment: f32,
    /// Peak output in sample units.
    magnitude: f32,
}

impl SineMic {
    fn new(hz: f32, level: f32, sample_rate_hz: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        SineMic {
            phase: 0.0,
            increment: hz / sample_rate_hz,
            magnitude: level * i16::MAX as f32,
        }
    }

    fn next_sample(&mut self) -> i16 {
        let value = libm::sinf(2.0 * core::f32::consts::PI * self.phase) * self.magnitude;
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value as i16
    }
}

// ── Interrupt handlers ──────────────────────────────────────────────────────

/// Capture ISR using the bundled producer call.
fn audio_sample_isr_auto(sample: i16) {
    SAMPLES.volatile_push(sample);
}

/// Capture ISR running the producer sequence by hand.
fn audio_sample_isr_manual(sample: i16) {
    let pos_ptr = SAMPLES.pos();
    // SAFETY: Both pointers address the static buffer, and the stored
    // position is reduced modulo its size.
    unsafe {
        let pos = volatile_read(pos_ptr);
        volatile_write(SAMPLES.begin().add(pos), sample);
        volatile_write(pos_ptr, (pos + 1) % SAMPLES.size());
    }
}

/// Stand-in for the hardware sample timer and its interrupt vector.
///
/// Each [`fire()`](Self::fire) is one interrupt. Handlers alternate between
/// the two ISR flavours; they are interchangeable.
struct SampleTimer {
    mic: SineMic,
    fired: u64,
}

impl SampleTimer {
    fn setup(mic: SineMic) -> Self {
        SampleTimer { mic, fired: 0 }
    }

    fn fire(&mut self) {
        let sample = self.mic.next_sample();
        if self.fired % 2 == 0 {
            audio_sample_isr_auto(sample);
        } else {
            audio_sample_isr_manual(sample);
        }
        self.fired += 1;
    }
}

// ── Frame processing ────────────────────────────────────────────────────────

/// Peak and RMS meter over one consumer pass.
struct FrameMeter {
    peak: u16,
    sum_sq: u64,
    count: u32,
}

impl FrameMeter {
    fn new() -> Self {
        FrameMeter {
            peak: 0,
            sum_sq: 0,
            count: 0,
        }
    }

    fn process_mono_frame(&mut self, frame: i16) {
        let magnitude = frame.unsigned_abs();
        self.peak = self.peak.max(magnitude);
        let s = frame as i64;
        self.sum_sq += (s * s) as u64;
        self.count += 1;
    }

    /// Peak level, 0.0–1.0.
    fn peak(&self) -> f32 {
        self.peak as f32 / i16::MAX as f32
    }

    /// RMS level, 0.0–1.0. Zero when nothing was processed.
    fn rms(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let mean_sq = self.sum_sq as f32 / self.count as f32;
        libm::sqrtf(mean_sq) / i16::MAX as f32
    }
}

fn parse_passes() -> Result<usize> {
    match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid pass count {arg:?}")),
        None => Ok(DEFAULT_PASSES),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let passes = parse_passes()?;
    let config = SAMPLES.config();
    info!(
        duration_ms = config.duration_ms,
        sample_rate_khz = config.sample_rate_khz,
        channels = config.channels,
        slots = SAMPLES.size(),
        "capture buffer ready"
    );

    let sample_rate_hz = (SAMPLES.sample_rate() * 1000) as f32;
    let mut timer = SampleTimer::setup(SineMic::new(TONE_HZ, TONE_LEVEL, sample_rate_hz));

    for pass in 0..passes {
        let mut meter = FrameMeter::new();
        let fired_before = timer.fired;

        for (i, frame) in SAMPLES.iter().enumerate() {
            if i % FRAMES_PER_INTERRUPT == 0 {
                timer.fire();
            }
            meter.process_mono_frame(frame);
        }

        debug!(pass, interrupts = timer.fired - fired_before, "interrupt burst");
        info!(
            pass,
            pos = SAMPLES.volatile_pos(),
            peak = meter.peak(),
            rms = meter.rms(),
            "consumer pass complete"
        );
    }

    info!(interrupts = timer.fired, "capture finished");
    Ok(())
}
