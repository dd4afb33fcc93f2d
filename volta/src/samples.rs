//! Fixed-capacity circular sample buffer fed from an interrupt handler.
//!
//! [`SampleBuffer`] holds the most recent `N` samples written by a producer
//! that may preempt the main loop at any point (an ISR sampling a microphone,
//! for instance). The consumer scans the whole fixed storage range every pass
//! with volatile reads instead of tracking a read cursor.
//!
//! ## Layout
//!
//! ```text
//!            pos (next write slot)
//!             │
//!  ┌────┬────┬▼───┬────┬────┐
//!  │ s5 │ s6 │ s2 │ s3 │ s4 │   N = duration_ms × sample_rate_khz × channels
//!  └────┴────┴────┴────┴────┘
//!  begin()                  end()
//! ```
//!
//! ## Overrun
//!
//! There is no "full" state. Every push writes at `pos` and advances it
//! modulo `N`, so a slow consumer silently loses the oldest samples. Nothing
//! counts how many slots are valid.
//!
//! ## Usage
//!
//! ```ignore
//! use volta::{AudioSamples, DEFAULT_CONFIG};
//!
//! static SAMPLES: AudioSamples = AudioSamples::new(DEFAULT_CONFIG);
//!
//! // Microphone ISR:
//! fn on_sample(sample: i16) {
//!     SAMPLES.volatile_push(sample);
//! }
//!
//! // Main loop:
//! loop {
//!     SAMPLES.for_each_frame(process_mono_frame);
//! }
//! ```

use core::cell::UnsafeCell;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::volatile::{volatile_read, volatile_write, Integral, VolatileCell};

/// Capture window configuration. Fixed once the buffer is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferConfig {
    /// Length of the capture window in milliseconds.
    pub duration_ms: usize,
    /// Sample rate in kHz (samples per millisecond per channel).
    pub sample_rate_khz: usize,
    /// Number of interleaved channels.
    pub channels: usize,
}

impl BufferConfig {
    /// Build a configuration.
    pub const fn new(duration_ms: usize, sample_rate_khz: usize, channels: usize) -> Self {
        BufferConfig {
            duration_ms,
            sample_rate_khz,
            channels,
        }
    }

    /// Total number of sample slots: `duration_ms × sample_rate_khz × channels`.
    pub const fn capacity(&self) -> usize {
        self.duration_ms * self.sample_rate_khz * self.channels
    }
}

/// Circular buffer of `N` integral samples plus a wrapping write position.
///
/// # Type Parameters
///
/// - `T`: sample type, any [`Integral`] (usually `i16`).
/// - `N`: slot count. Must be non-zero and equal to the configuration's
///   [`capacity()`](BufferConfig::capacity).
///
/// # Concurrency contract
///
/// - Exactly ONE context pushes (the producer, typically an ISR).
/// - Any number of passes may read, from a context the producer can preempt.
/// - Single core only. Accesses are volatile, not atomic.
///
/// Under that contract the buffer can be placed in a `static` and shared
/// without locks. A consumer may observe a slot written but the position not
/// yet advanced, or a slot overwritten mid-pass; both are accepted.
pub struct SampleBuffer<T: Integral, const N: usize> {
    storage: UnsafeCell<[T; N]>,
    /// Next write slot, always in `0..N`.
    pos: VolatileCell<usize>,
    config: BufferConfig,
}

// SAFETY: Shared access only ever touches storage slots and the position
// counter through single volatile loads/stores of plain integers. The
// single-producer, single-core contract documented above means no two
// contexts write the same location concurrently, and every value the
// producer writes to `pos` is reduced modulo `N`, so slot writes stay in
// bounds.
unsafe impl<T: Integral, const N: usize> Sync for SampleBuffer<T, N> {}

impl<T: Integral, const N: usize> SampleBuffer<T, N> {
    /// Create a buffer for `config`, with the write position at slot 0.
    ///
    /// Slot contents are unspecified until written. (They happen to start
    /// zeroed, but consumers must not treat zero as "empty".)
    ///
    /// # Panics
    ///
    /// If `N` is zero or `config.capacity() != N`. For a `static` this is a
    /// compile-time error.
    pub const fn new(config: BufferConfig) -> Self {
        assert!(N > 0, "sample buffer must have at least one slot");
        assert!(
            config.capacity() == N,
            "duration_ms * sample_rate_khz * channels must equal N"
        );

        SampleBuffer {
            storage: UnsafeCell::new([T::ZERO; N]),
            pos: VolatileCell::new(0),
            config,
        }
    }

    /// The configuration this buffer was built with.
    pub const fn config(&self) -> BufferConfig {
        self.config
    }

    /// Capture window length in milliseconds.
    pub const fn duration(&self) -> usize {
        self.config.duration_ms
    }

    /// Sample rate in kHz.
    pub const fn sample_rate(&self) -> usize {
        self.config.sample_rate_khz
    }

    /// Number of channels.
    pub const fn channels(&self) -> usize {
        self.config.channels
    }

    /// Number of sample slots (`N`).
    pub const fn size(&self) -> usize {
        N
    }

    /// Ordinary push: store `sample` at the write position and advance it.
    ///
    /// Requires exclusive access, so no interrupt can touch the buffer during
    /// the call. Use [`volatile_push`](Self::volatile_push) from an ISR.
    pub fn push(&mut self, sample: T) {
        let pos = self.pos.get_mut();
        let storage = self.storage.get_mut();
        storage[*pos] = sample;
        *pos = (*pos + 1) % N;
    }

    /// Producer-side push for interrupt context.
    ///
    /// Performs three volatile accesses in program order: read the position,
    /// write the sample into that slot, write the advanced position. None of
    /// them can be elided or cached by the compiler. They are not atomic as a
    /// group, so only one context may ever call this on a given buffer.
    #[inline]
    pub fn volatile_push(&self, sample: T) {
        let pos = self.pos.get();
        debug_assert!(pos < N, "write position out of range");
        // SAFETY: `pos < N` holds because every store to the counter is
        // reduced modulo `N`, so `begin + pos` lies inside the storage array.
        unsafe { volatile_write(self.begin().add(pos), sample) };
        self.pos.set((pos + 1) % N);
    }

    /// First slot of the storage range. Never changes for this buffer.
    #[inline(always)]
    pub const fn begin(&self) -> *mut T {
        self.storage.get().cast::<T>()
    }

    /// One past the last slot of the storage range. Never changes for this buffer.
    #[inline(always)]
    pub const fn end(&self) -> *mut T {
        self.begin().wrapping_add(N)
    }

    /// Address of the write-position counter.
    ///
    /// For handlers that run the producer sequence by hand: volatile-read the
    /// counter, volatile-write the sample at `begin().add(pos)`, then
    /// volatile-write `(pos + 1) % size()` back. Any value written here must
    /// stay below [`size()`](Self::size).
    #[inline(always)]
    pub const fn pos(&self) -> *mut usize {
        self.pos.as_ptr()
    }

    /// Volatile read of the write-position counter.
    #[inline]
    pub fn volatile_pos(&self) -> usize {
        self.pos.get()
    }

    /// Iterate the full storage range from `begin()` to `end()`, reading each
    /// slot with a volatile load.
    ///
    /// This is one consumer pass. It does not start at the write position and
    /// samples may be overwritten while the pass is running.
    pub fn iter(&self) -> VolatileIter<'_, T> {
        VolatileIter {
            next: self.begin(),
            remaining: N,
            _buffer: PhantomData,
        }
    }

    /// Run one consumer pass, calling `process` once per slot in storage order.
    pub fn for_each_frame<F: FnMut(T)>(&self, mut process: F) {
        for sample in self.iter() {
            process(sample);
        }
    }

    /// Plain view of the storage for a caller holding exclusive access.
    pub fn as_slice(&mut self) -> &[T] {
        self.storage.get_mut()
    }
}

impl<'a, T: Integral, const N: usize> IntoIterator for &'a SampleBuffer<T, N> {
    type Item = T;
    type IntoIter = VolatileIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`SampleBuffer`]'s storage that reads every slot with
/// [`volatile_read`].
pub struct VolatileIter<'a, T: Integral> {
    next: *const T,
    remaining: usize,
    _buffer: PhantomData<&'a T>,
}

impl<T: Integral> Iterator for VolatileIter<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: `next` points inside the borrowed buffer's storage while
        // `remaining > 0`.
        let sample = unsafe { volatile_read(self.next) };
        self.next = self.next.wrapping_add(1);
        self.remaining -= 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Integral> ExactSizeIterator for VolatileIter<'_, T> {}

impl<T: Integral> FusedIterator for VolatileIter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer<const N: usize>() -> SampleBuffer<i16, N> {
        SampleBuffer::new(BufferConfig::new(N, 1, 1))
    }

    #[test]
    fn new_starts_at_slot_zero() {
        let buf: SampleBuffer<i16, 8> = buffer();
        assert_eq!(buf.volatile_pos(), 0);
        assert_eq!(buf.size(), 8);
    }

    #[test]
    fn accessors_report_config() {
        let buf: SampleBuffer<i16, 96> = SampleBuffer::new(BufferConfig::new(3, 16, 2));
        assert_eq!(buf.duration(), 3);
        assert_eq!(buf.sample_rate(), 16);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.size(), 96);
        assert_eq!(buf.config(), BufferConfig::new(3, 16, 2));
        assert_eq!(buf.config().capacity(), 96);
    }

    #[test]
    #[should_panic(expected = "must equal N")]
    fn mismatched_capacity_panics() {
        let _buf: SampleBuffer<i16, 10> = SampleBuffer::new(BufferConfig::new(2, 2, 2));
    }

    #[test]
    #[should_panic(expected = "at least one slot")]
    fn zero_capacity_panics() {
        let _buf: SampleBuffer<i16, 0> = SampleBuffer::new(BufferConfig::new(0, 16, 1));
    }

    #[test]
    fn overrun_keeps_latest() {
        let mut buf: SampleBuffer<i16, 4> = buffer();
        for s in [10, 20, 30, 40, 50] {
            buf.push(s);
        }
        assert_eq!(buf.as_slice(), &[50, 20, 30, 40]);
        assert_eq!(buf.volatile_pos(), 1);
    }

    #[test]
    fn partial_fill_prefix() {
        let mut buf: SampleBuffer<i16, 3> = buffer();
        buf.push(1);
        buf.push(2);
        // Third slot is unspecified and deliberately not checked
        assert_eq!(&buf.as_slice()[..2], &[1, 2]);
        assert_eq!(buf.volatile_pos(), 2);
    }

    #[test]
    fn position_is_count_mod_capacity() {
        let mut buf: SampleBuffer<u8, 5> = SampleBuffer::new(BufferConfig::new(5, 1, 1));
        assert_eq!(buf.volatile_pos(), 0);
        for k in 1..=23usize {
            buf.push(k as u8);
            assert_eq!(buf.volatile_pos(), k % 5, "after {k} pushes");
        }
    }

    #[test]
    fn up_to_capacity_in_insertion_order() {
        let mut buf: SampleBuffer<i32, 6> = SampleBuffer::new(BufferConfig::new(6, 1, 1));
        for k in 0..6 {
            buf.push(k * 11);
        }
        assert_eq!(buf.as_slice(), &[0, 11, 22, 33, 44, 55]);
        assert_eq!(buf.volatile_pos(), 0);
    }

    #[test]
    fn many_wraps_keep_last_n() {
        let mut buf: SampleBuffer<i16, 4> = buffer();
        // 0..=13: last four are 10, 11, 12, 13 landing in slots 2, 3, 0, 1
        for s in 0..=13 {
            buf.push(s);
        }
        assert_eq!(buf.as_slice(), &[12, 13, 10, 11]);
        assert_eq!(buf.volatile_pos(), 14 % 4);
    }

    #[test]
    fn single_slot_buffer() {
        let mut buf: SampleBuffer<i16, 1> = buffer();
        buf.push(7);
        assert_eq!(buf.volatile_pos(), 0);
        buf.volatile_push(8);
        assert_eq!(buf.volatile_pos(), 0);
        assert_eq!(buf.as_slice(), &[8]);
    }

    #[test]
    fn volatile_push_overrun() {
        let buf: SampleBuffer<i16, 4> = buffer();
        for s in [10, 20, 30, 40, 50] {
            buf.volatile_push(s);
        }
        let mut seen = [0i16; 4];
        for (slot, s) in seen.iter_mut().zip(buf.iter()) {
            *slot = s;
        }
        assert_eq!(seen, [50, 20, 30, 40]);
        assert_eq!(buf.volatile_pos(), 1);
    }

    #[test]
    fn push_and_volatile_push_agree() {
        let mut plain: SampleBuffer<i16, 5> = buffer();
        let vol: SampleBuffer<i16, 5> = buffer();
        for s in [-3, 9, 27, -81, 243, -729, 2187] {
            plain.push(s);
            vol.volatile_push(s);
        }
        assert_eq!(plain.volatile_pos(), vol.volatile_pos());
        assert!(plain.iter().eq(vol.iter()));
    }

    #[test]
    fn manual_sequence_matches_volatile_push() {
        let auto: SampleBuffer<i16, 3> = buffer();
        let manual: SampleBuffer<i16, 3> = buffer();

        for s in [5, 6, 7, 8] {
            auto.volatile_push(s);

            let pos_ptr = manual.pos();
            unsafe {
                let pos = volatile_read(pos_ptr);
                volatile_write(manual.begin().add(pos), s);
                volatile_write(pos_ptr, (pos + 1) % manual.size());
            }
        }

        assert_eq!(auto.volatile_pos(), manual.volatile_pos());
        assert!(auto.iter().eq(manual.iter()));
    }

    #[test]
    fn range_is_stable_across_pushes() {
        let mut buf: SampleBuffer<i16, 4> = buffer();
        let begin = buf.begin();
        let end = buf.end();
        let pos = buf.pos();
        assert_eq!(end as usize - begin as usize, 4 * core::mem::size_of::<i16>());

        for s in 0..100 {
            if s % 2 == 0 {
                buf.push(s);
            } else {
                buf.volatile_push(s);
            }
            assert_eq!(buf.begin(), begin);
            assert_eq!(buf.end(), end);
            assert_eq!(buf.pos(), pos);
        }
    }

    #[test]
    fn iter_covers_full_range() {
        let buf: SampleBuffer<i16, 4> = buffer();
        let it = buf.iter();
        assert_eq!(it.len(), 4);
        assert_eq!(buf.iter().count(), 4);

        let mut it = buf.iter();
        for _ in 0..4 {
            assert!(it.next().is_some());
        }
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn iter_ignores_write_position() {
        let buf: SampleBuffer<i16, 4> = buffer();
        for s in [1, 2, 3, 4, 5, 6] {
            buf.volatile_push(s);
        }
        // Storage order, not chronological order
        let mut out = [0i16; 4];
        for (o, s) in out.iter_mut().zip(&buf) {
            *o = s;
        }
        assert_eq!(out, [5, 6, 3, 4]);
    }

    #[test]
    fn for_each_frame_visits_every_slot() {
        let buf: SampleBuffer<i16, 4> = buffer();
        for s in [100, 200, 300, 400] {
            buf.volatile_push(s);
        }
        let mut sum = 0i32;
        let mut calls = 0;
        buf.for_each_frame(|s| {
            sum += s as i32;
            calls += 1;
        });
        assert_eq!(calls, 4);
        assert_eq!(sum, 1000);
    }

    #[test]
    fn bool_samples() {
        let buf: SampleBuffer<bool, 2> = SampleBuffer::new(BufferConfig::new(1, 1, 2));
        buf.volatile_push(true);
        buf.volatile_push(false);
        buf.volatile_push(true);
        assert!(buf.iter().eq([true, false]));
    }

    #[test]
    fn multichannel_interleaving_is_caller_defined() {
        // Stereo: the producer pushes L, R, L, R ... into consecutive slots
        let buf: SampleBuffer<i16, 4> = SampleBuffer::new(BufferConfig::new(2, 1, 2));
        for (l, r) in [(1, -1), (2, -2)] {
            buf.volatile_push(l);
            buf.volatile_push(r);
        }
        assert!(buf.iter().eq([1, -1, 2, -2]));
        assert_eq!(buf.volatile_pos(), 0);
    }
}
