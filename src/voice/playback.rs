//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::SampleRate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{Error, Result};

/// Decoded mono audio
#[derive(Debug, Default)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Play mono samples on the default output device, blocking until done
///
/// # Errors
///
/// Returns error if no output device accepts the sample rate
pub fn play_blocking(pcm: Pcm) -> Result<()> {
    if pcm.samples.is_empty() {
        return Ok(());
    }
    if pcm.sample_rate == 0 {
        return Err(Error::Audio("audio has no sample rate".to_string()));
    }

    let rate = SampleRate(pcm.sample_rate);
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
        // Prefer mono, accept stereo
        .min_by_key(cpal::SupportedStreamConfigRange::channels)
        .ok_or_else(|| {
            Error::Audio(format!("no output config at {} Hz", pcm.sample_rate))
        })?;

    let config = supported.with_sample_rate(rate).config();
    let channels = usize::from(config.channels);

    let samples = Arc::new(pcm.samples);
    let total = samples.len();
    let position = Arc::new(AtomicUsize::new(0));
    let drained = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let drained = Arc::clone(&drained);
        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        pos = (pos + 1).min(samples.len());
                    }
                    position.store(pos, Ordering::Relaxed);
                    if pos >= samples.len() {
                        drained.store(true, Ordering::Release);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let expected = Duration::from_millis(total as u64 * 1000 / u64::from(pcm.sample_rate));
    let deadline = Instant::now() + expected + Duration::from_millis(500);

    while !drained.load(Ordering::Acquire) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Let the device flush its last buffer
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);

    tracing::debug!(samples = total, sample_rate = pcm.sample_rate, "playback complete");
    Ok(())
}

/// Decode MP3 bytes to mono samples
///
/// # Errors
///
/// Returns error if the stream is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Pcm> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut pcm = Pcm::default();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if pcm.sample_rate == 0 {
                    #[allow(clippy::cast_sign_loss)]
                    let rate = frame.sample_rate as u32;
                    pcm.sample_rate = rate;
                }

                if frame.channels == 2 {
                    pcm.samples.extend(frame.data.chunks(2).map(|pair| {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    pcm.samples
                        .extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(pcm)
}
