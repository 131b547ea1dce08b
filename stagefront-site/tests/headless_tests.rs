//! Headless backend tests using generated WAV files

use stagefront_common::config::AudioConfig;
use stagefront_common::events::{EventBus, SessionPhase};
use stagefront_common::model::Track;
use stagefront_site::audio::{
    decode_to_mono, AnalyserConfig, AudioSessionManager, HeadlessBackend, MediaEventKind,
    PlayStart, RestrictedPolicy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 8000;

/// Write a stereo sine WAV of `seconds` length
fn write_sine(dir: &Path, seconds: f32, freq: f32) -> PathBuf {
    let path = dir.join("sine.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let frames = (SAMPLE_RATE as f32 * seconds) as usize;
    for n in 0..frames {
        let t = n as f32 / SAMPLE_RATE as f32;
        let sample = ((2.0 * std::f32::consts::PI * freq * t).sin() * 0.8 * i16::MAX as f32) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn manager() -> AudioSessionManager {
    AudioSessionManager::new(
        Arc::new(HeadlessBackend::new(Duration::from_millis(20))),
        RestrictedPolicy::from_config(&AudioConfig::default().restricted_providers),
        AnalyserConfig {
            fft_size: 256,
            ..AnalyserConfig::default()
        },
        Arc::new(EventBus::default()),
    )
}

#[test]
fn test_decode_wav_downmixes_to_mono() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), 0.5, 440.0);

    let decoded = decode_to_mono(std::fs::read(&path).unwrap(), Some("wav")).unwrap();

    assert_eq!(decoded.sample_rate, SAMPLE_RATE);
    assert_eq!(decoded.samples.len(), 4000);
    assert!((decoded.duration() - 0.5).abs() < 1e-6);
    assert!(decoded.samples.iter().any(|s| *s > 0.5));
}

#[tokio::test]
async fn test_headless_playback_runs_to_end_with_spectrum() {
    let dir = TempDir::new().unwrap();
    let path = write_sine(dir.path(), 0.4, 1000.0);
    let track = Track {
        id: 1,
        audio_url: Some(path.to_string_lossy().into_owned()),
        ..Default::default()
    };

    let mut manager = manager();
    let ticket = manager.play_track(&track).unwrap();
    assert_eq!(ticket.outcome().await, PlayStart::Started);

    let mut saw_metadata = false;
    let mut peak = 0u8;
    let run = async {
        while let Some(event) = manager.process_next_event().await {
            match event.kind {
                MediaEventKind::LoadedMetadata { duration } => {
                    saw_metadata = true;
                    assert!((duration - 0.4).abs() < 1e-3);
                }
                MediaEventKind::TimeUpdate { .. } => {
                    if let Some(analyser) = manager.analyser() {
                        let mut bins = vec![0u8; analyser.frequency_bin_count()];
                        analyser.byte_frequency_data(&mut bins);
                        peak = peak.max(bins.iter().copied().max().unwrap_or(0));
                    }
                }
                MediaEventKind::Ended => break,
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("playback should reach the end");

    assert!(saw_metadata);
    assert!(peak > 0, "analyser saw the sine");
    assert_eq!(manager.phase(), SessionPhase::Ended);
    let snapshot = manager.snapshot();
    assert!((snapshot.current_time - 0.4).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_file_reports_media_error() {
    let track = Track {
        id: 2,
        audio_url: Some("/definitely/not/here.mp3".to_string()),
        ..Default::default()
    };

    let mut manager = manager();
    let ticket = manager.play_track(&track).unwrap();

    assert!(matches!(ticket.outcome().await, PlayStart::Failed(_)));
    let event = tokio::time::timeout(Duration::from_secs(5), manager.process_next_event())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event.kind, MediaEventKind::Error(_)));
    assert_eq!(manager.phase(), SessionPhase::Ended);
    assert!(manager.analyser().is_none(), "dead element left on the analyser");
    assert!(!manager.snapshot().visualizing);
}
