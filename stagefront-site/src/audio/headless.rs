//! Headless media backend
//!
//! Fetches the source (http(s), `file://` or a plain path), decodes it to mono
//! f32 with symphonia and then advances a clock in real time, feeding each
//! elapsed window of samples to the connected analyser sink. Nothing is sent
//! to an audio device; the backend exists for the CLI and for tests.

use super::analyser::SampleSink;
use super::element::{
    resolved_play_request, AttachError, CrossOrigin, ElementId, MediaBackend, MediaElement,
    MediaEvent, MediaEventKind, MediaEventSender, PlayError, PlayRequest,
};
use crate::error::{Error, Result};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Mono PCM decoded from a source
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an in-memory file to mono f32
///
/// `extension` is a format hint only; the content is probed either way.
pub fn decode_to_mono(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Decode error: {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let needed = decoded.capacity() as u64;
        if buffer.as_ref().map_or(true, |b| b.capacity() < needed as usize * channels) {
            buffer = Some(SampleBuffer::new(needed, spec));
        }
        if let Some(buf) = buffer.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend(
                buf.samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    debug!("Decoded {} mono frames at {} Hz", samples.len(), sample_rate);
    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

async fn fetch_source(client: &reqwest::Client, src: &str) -> Result<Vec<u8>> {
    if src.starts_with("http://") || src.starts_with("https://") {
        let response = client.get(src).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    } else {
        let path = src.strip_prefix("file://").unwrap_or(src);
        Ok(tokio::fs::read(path).await?)
    }
}

fn extension_of(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[derive(Default)]
struct ElementState {
    audio: Option<Arc<DecodedAudio>>,
    paused: bool,
    current_time: f64,
    pending_plays: Vec<oneshot::Sender<std::result::Result<(), PlayError>>>,
    sink: Option<SampleSink>,
    released: bool,
}

impl ElementState {
    fn duration(&self) -> Option<f64> {
        self.audio.as_ref().map(|a| a.duration())
    }

    fn reject_pending(&mut self, error: PlayError) {
        for tx in self.pending_plays.drain(..) {
            let _ = tx.send(Err(error.clone()));
        }
    }
}

#[derive(Clone)]
struct Shared {
    id: ElementId,
    state: Arc<Mutex<ElementState>>,
    events: MediaEventSender,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ElementState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, kind: MediaEventKind) {
        let _ = self.events.send(MediaEvent { element: self.id, kind });
    }
}

/// Element produced by [`HeadlessBackend`]
pub struct HeadlessElement {
    shared: Shared,
    src: String,
    cross_origin: Option<CrossOrigin>,
    task: Option<JoinHandle<()>>,
}

impl MediaElement for HeadlessElement {
    fn id(&self) -> ElementId {
        self.shared.id
    }

    fn src(&self) -> &str {
        &self.src
    }

    fn cross_origin(&self) -> Option<CrossOrigin> {
        self.cross_origin
    }

    fn play(&mut self) -> PlayRequest {
        let mut state = self.shared.lock();
        if state.released {
            return resolved_play_request(Err(PlayError::Aborted));
        }

        let was_paused = state.paused;
        state.paused = false;

        match state.duration() {
            Some(duration) => {
                if state.current_time >= duration {
                    state.current_time = 0.0;
                }
                drop(state);
                if was_paused {
                    self.shared.emit(MediaEventKind::Play);
                }
                resolved_play_request(Ok(()))
            }
            None => {
                let (tx, rx) = oneshot::channel();
                state.pending_plays.push(tx);
                rx
            }
        }
    }

    fn pause(&mut self) {
        let mut state = self.shared.lock();
        if state.paused || state.released {
            return;
        }
        state.paused = true;
        state.reject_pending(PlayError::Aborted);
        let loaded = state.audio.is_some();
        drop(state);
        if loaded {
            self.shared.emit(MediaEventKind::Pause);
        }
    }

    fn paused(&self) -> bool {
        self.shared.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.shared.lock().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let current_time = {
            let mut state = self.shared.lock();
            let max = state.duration().unwrap_or(0.0);
            state.current_time = seconds.clamp(0.0, max);
            state.current_time
        };
        self.shared.emit(MediaEventKind::TimeUpdate { current_time });
    }

    fn duration(&self) -> Option<f64> {
        self.shared.lock().duration()
    }

    fn connect_sink(&mut self, sink: SampleSink) -> std::result::Result<(), AttachError> {
        if self.cross_origin != Some(CrossOrigin::Anonymous) {
            return Err(AttachError::NotCorsEnabled);
        }
        let mut state = self.shared.lock();
        if state.sink.is_some() {
            return Err(AttachError::AlreadyConnected);
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn disconnect_sink(&mut self) {
        self.shared.lock().sink = None;
    }

    fn release(&mut self) {
        {
            let mut state = self.shared.lock();
            state.released = true;
            state.paused = true;
            state.sink = None;
            state.audio = None;
            state.reject_pending(PlayError::Aborted);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for HeadlessElement {
    fn drop(&mut self) {
        self.release();
    }
}

/// Backend that decodes sources in-process and plays them against a clock
pub struct HeadlessBackend {
    client: reqwest::Client,
    tick: Duration,
}

impl HeadlessBackend {
    pub fn new(tick: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            tick: tick.max(Duration::from_millis(1)),
        }
    }

    pub fn from_audio_config(config: &stagefront_common::config::AudioConfig) -> Self {
        Self::new(Duration::from_millis(config.time_update_ms))
    }
}

impl MediaBackend for HeadlessBackend {
    fn create_element(
        &self,
        id: ElementId,
        src: &str,
        cross_origin: Option<CrossOrigin>,
        events: MediaEventSender,
    ) -> std::result::Result<Box<dyn MediaElement>, PlayError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| PlayError::Failed(format!("no async runtime: {}", e)))?;

        let shared = Shared {
            id,
            state: Arc::new(Mutex::new(ElementState {
                paused: true,
                ..Default::default()
            })),
            events,
        };

        let task = handle.spawn(run_element(
            shared.clone(),
            src.to_string(),
            self.client.clone(),
            self.tick,
        ));

        Ok(Box::new(HeadlessElement {
            shared,
            src: src.to_string(),
            cross_origin,
            task: Some(task),
        }))
    }
}

async fn load(client: &reqwest::Client, src: &str) -> Result<DecodedAudio> {
    let bytes = fetch_source(client, src).await?;
    let extension = extension_of(src);
    tokio::task::spawn_blocking(move || decode_to_mono(bytes, extension.as_deref()))
        .await
        .map_err(|e| Error::Decode(format!("decode task failed: {}", e)))?
}

async fn run_element(shared: Shared, src: String, client: reqwest::Client, tick: Duration) {
    let audio = match load(&client, &src).await {
        Ok(audio) => Arc::new(audio),
        Err(e) => {
            warn!("Failed to load {}: {}", src, e);
            shared.lock().reject_pending(PlayError::Failed(e.to_string()));
            shared.emit(MediaEventKind::Error(e.to_string()));
            return;
        }
    };

    let duration = audio.duration();
    let starting = {
        let mut state = shared.lock();
        if state.released {
            return;
        }
        state.audio = Some(Arc::clone(&audio));
        let plays = std::mem::take(&mut state.pending_plays);
        let starting = !state.paused;
        for tx in plays {
            let _ = tx.send(Ok(()));
        }
        starting
    };
    shared.emit(MediaEventKind::LoadedMetadata { duration });
    if starting {
        shared.emit(MediaEventKind::Play);
    }

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;

        let (window, sink, current_time, ended) = {
            let mut state = shared.lock();
            if state.released {
                return;
            }
            if state.paused {
                continue;
            }
            let rate = audio.sample_rate as f64;
            let start = (state.current_time * rate) as usize;
            let next_time = (state.current_time + tick.as_secs_f64()).min(duration);
            let end = ((next_time * rate) as usize).min(audio.samples.len());
            state.current_time = next_time;
            let ended = next_time >= duration;
            if ended {
                state.paused = true;
            }
            (
                start.min(end)..end,
                state.sink.clone(),
                next_time,
                ended,
            )
        };

        if let Some(sink) = sink {
            sink.push(&audio.samples[window]);
        }
        shared.emit(MediaEventKind::TimeUpdate { current_time });
        if ended {
            shared.emit(MediaEventKind::Pause);
            shared.emit(MediaEventKind::Ended);
        }
    }
}
