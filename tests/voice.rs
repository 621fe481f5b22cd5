//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::time::Duration;

use mouthpiece::config::SpeechConfig;
use mouthpiece::voice::{
    ActivityDetector, ActivityState, HttpVoice, SAMPLE_RATE, Synthesizer, encode_wav,
    select_voice,
};

/// 100ms chunks, as the listener drains them
const CHUNK: usize = SAMPLE_RATE as usize / 10;

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    vec![0.0; (SAMPLE_RATE as f32 * duration_secs) as usize]
}

fn feed(detector: &mut ActivityDetector, audio: &[f32]) -> ActivityState {
    audio
        .chunks(CHUNK)
        .fold(detector.state(), |_, chunk| detector.process(chunk))
}

fn listener_detector() -> ActivityDetector {
    ActivityDetector::new(
        SAMPLE_RATE,
        Duration::from_millis(800),
        Duration::from_millis(500),
    )
}

#[test]
fn test_phrase_segmented_after_noisy_calibration() {
    let mut detector = listener_detector();
    assert_eq!(detector.state(), ActivityState::Calibrating);

    // Room hum raises the threshold above the floor
    let state = feed(&mut detector, &generate_sine_samples(60.0, 0.5, 0.06));
    assert_eq!(state, ActivityState::Waiting);
    assert!(detector.threshold() > 0.06);

    // More hum is not speech
    let state = feed(&mut detector, &generate_sine_samples(60.0, 0.5, 0.06));
    assert_eq!(state, ActivityState::Waiting);
    assert!(!detector.speech_started());

    let state = feed(&mut detector, &generate_sine_samples(440.0, 1.0, 0.3));
    assert_eq!(state, ActivityState::Speaking);

    let state = feed(&mut detector, &generate_silence(0.8));
    assert_eq!(state, ActivityState::Complete);

    let phrase = detector.take_speech_buffer();
    assert_eq!(phrase.len(), SAMPLE_RATE as usize * 18 / 10);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_short_pause_keeps_phrase_open() {
    let mut detector = listener_detector();
    feed(&mut detector, &generate_silence(0.5));

    feed(&mut detector, &generate_sine_samples(300.0, 0.5, 0.3));
    // Shorter than the pause threshold
    let state = feed(&mut detector, &generate_silence(0.4));
    assert_eq!(state, ActivityState::Speaking);

    feed(&mut detector, &generate_sine_samples(300.0, 0.5, 0.3));
    let state = feed(&mut detector, &generate_silence(0.8));
    assert_eq!(state, ActivityState::Complete);
}

#[test]
fn test_phrase_encodes_to_wav() {
    let mut detector = listener_detector();
    feed(&mut detector, &generate_silence(0.5));
    feed(&mut detector, &generate_sine_samples(440.0, 0.5, 0.3));
    feed(&mut detector, &generate_silence(0.8));

    let phrase = detector.take_speech_buffer();
    let wav = encode_wav(&phrase, SAMPLE_RATE).unwrap();

    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, phrase.len());
}

#[test]
fn test_http_catalog_selects_first_english_voice() {
    let engine = HttpVoice::new(&SpeechConfig::default()).unwrap();
    let voices = engine.list_voices().unwrap();

    let choice = select_voice(&voices, &["en-US".to_string()]).unwrap();
    // Catalog voices are tagged "en", which does not extend "en-us"
    assert!(!choice.matched);
    assert_eq!(choice.voice.id, "alloy");

    let choice = select_voice(&voices, &["en".to_string()]).unwrap();
    assert!(choice.matched);
    assert_eq!(choice.voice.id, "alloy");
}
