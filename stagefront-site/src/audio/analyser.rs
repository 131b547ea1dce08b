//! Frequency analyser and analysis context
//!
//! The analyser keeps the most recent `fft_size` mono samples pushed by the
//! connected element and produces byte frequency data the way a browser
//! `AnalyserNode` does: windowed FFT, normalised magnitude, exponential time
//! smoothing, then a linear map of the -100..-30 dB range onto 0..=255.

use super::element::{AttachError, CrossOrigin, ElementId, MediaElement};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Analyser settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyserConfig {
    /// Power of two between 32 and 32768; other values are rounded
    pub fft_size: usize,
    /// Time smoothing constant, clamped to 0.0..=1.0
    pub smoothing: f32,
    /// New contexts start suspended and must be resumed before analysis
    pub start_suspended: bool,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: DEFAULT_SMOOTHING,
            start_suspended: true,
        }
    }
}

impl AnalyserConfig {
    pub fn from_audio_config(config: &stagefront_common::config::AudioConfig) -> Self {
        Self {
            fft_size: config.fft_size,
            smoothing: config.smoothing,
            ..Self::default()
        }
    }

    fn normalized_fft_size(&self) -> usize {
        self.fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two()
            .min(MAX_FFT_SIZE)
    }
}

struct AnalyserCore {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    smoothing: f32,
    fft_size: usize,
    active: bool,
}

impl AnalyserCore {
    fn new(config: &AnalyserConfig) -> Self {
        let fft_size = config.normalized_fft_size();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();
        let window: Vec<f32> = apodize::hanning_iter(fft_size).map(|x| x as f32).collect();

        Self {
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            samples: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.smoothing.clamp(0.0, 1.0),
            fft_size,
            active: !config.start_suspended,
        }
    }

    fn push(&mut self, samples: &[f32]) {
        if !self.active {
            return;
        }
        let keep = samples.len().min(self.fft_size);
        let tail = &samples[samples.len() - keep..];
        self.samples.drain(..keep);
        self.samples.extend(tail.iter().copied());
    }

    /// Run one analysis frame and update the smoothed magnitudes
    fn analyse(&mut self) {
        for (slot, (sample, w)) in self
            .buffer
            .iter_mut()
            .zip(self.samples.iter().zip(self.window.iter()))
        {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (prev, bin) in self.smoothed.iter_mut().zip(self.buffer.iter()) {
            let magnitude = bin.norm() * scale;
            let next = tau * *prev + (1.0 - tau) * magnitude;
            *prev = if next.is_finite() { next } else { 0.0 };
        }
    }

    fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}

/// Frequency analyser shared between the context and the sample producer
#[derive(Clone)]
pub struct Analyser {
    core: Arc<Mutex<AnalyserCore>>,
}

impl Analyser {
    pub fn new(config: &AnalyserConfig) -> Self {
        Self {
            core: Arc::new(Mutex::new(AnalyserCore::new(config))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AnalyserCore> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fft_size(&self) -> usize {
        self.lock().fft_size
    }

    /// Number of frequency bins (half the FFT size)
    pub fn frequency_bin_count(&self) -> usize {
        self.lock().fft_size / 2
    }

    /// Feed mono samples; ignored while the owning context is not running
    pub fn push_samples(&self, samples: &[f32]) {
        self.lock().push(samples);
    }

    /// Fill `out` with byte frequency data (one byte per bin)
    ///
    /// Writes at most `frequency_bin_count()` bytes.
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let mut core = self.lock();
        core.analyse();
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (byte, magnitude) in out.iter_mut().zip(core.smoothed.iter()) {
            let db = linear_to_decibels(*magnitude);
            let scaled = (255.0 / range) * (db - MIN_DECIBELS);
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Fill `out` with smoothed magnitudes in decibels
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        let mut core = self.lock();
        core.analyse();
        for (value, magnitude) in out.iter_mut().zip(core.smoothed.iter()) {
            *value = linear_to_decibels(*magnitude);
        }
    }

    /// Clear buffered samples and smoothing history
    pub fn reset(&self) {
        self.lock().reset();
    }

    fn set_active(&self, active: bool) {
        self.lock().active = active;
    }

    pub fn sink(&self) -> SampleSink {
        SampleSink {
            analyser: self.clone(),
        }
    }
}

fn linear_to_decibels(value: f32) -> f32 {
    if value <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * value.log10()
    }
}

/// Write end of an analyser, handed to the element that produces samples
#[derive(Clone)]
pub struct SampleSink {
    analyser: Analyser,
}

impl SampleSink {
    pub fn push(&self, samples: &[f32]) {
        self.analyser.push_samples(samples);
    }
}

/// Analysis context lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Owns the analyser and the single source connection feeding it
pub struct AnalysisContext {
    state: ContextState,
    analyser: Analyser,
    source: Option<ElementId>,
}

impl AnalysisContext {
    pub fn new(config: &AnalyserConfig) -> Self {
        let state = if config.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        Self {
            state,
            analyser: Analyser::new(config),
            source: None,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    pub fn resume(&mut self) -> Result<(), AttachError> {
        match self.state {
            ContextState::Closed => Err(AttachError::Backend("analysis context is closed".to_string())),
            _ => {
                self.state = ContextState::Running;
                self.analyser.set_active(true);
                Ok(())
            }
        }
    }

    /// Route `element` into the analyser
    ///
    /// The element must be anonymous cross-origin, and the context must not
    /// already have a source; the previous one is disconnected first.
    pub fn connect(&mut self, element: &mut dyn MediaElement) -> Result<(), AttachError> {
        if self.state == ContextState::Closed {
            return Err(AttachError::Backend("analysis context is closed".to_string()));
        }
        if element.cross_origin() != Some(CrossOrigin::Anonymous) {
            return Err(AttachError::NotCorsEnabled);
        }
        if self.source.is_some() {
            return Err(AttachError::AlreadyConnected);
        }

        self.analyser.reset();
        element.connect_sink(self.analyser.sink())?;
        self.source = Some(element.id());
        debug!("Analyser connected to element {}", element.id());
        Ok(())
    }

    /// Detach `element` if it is the current source
    pub fn disconnect(&mut self, element: &mut dyn MediaElement) {
        if self.source == Some(element.id()) {
            element.disconnect_sink();
            self.source = None;
            debug!("Analyser disconnected from element {}", element.id());
        }
    }

    pub fn connected_source(&self) -> Option<ElementId> {
        self.source
    }

    pub fn close(&mut self) {
        self.state = ContextState::Closed;
        self.source = None;
        self.analyser.set_active(false);
    }
}
