//! Speech activity detection
//!
//! Segments one phrase out of the microphone stream using RMS energy. The
//! first part of every listen calibrates the threshold against ambient noise.

use std::time::Duration;

/// Lowest threshold ever used, so a silent room still needs real speech
const ENERGY_FLOOR: f32 = 0.03;

/// Speech must be this many times louder than the ambient level
const AMBIENT_FACTOR: f32 = 1.5;

/// Minimum speech before a pause can end the phrase
const MIN_SPEECH: Duration = Duration::from_millis(300);

/// State of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    /// Measuring ambient noise
    Calibrating,
    /// Waiting for speech to begin
    Waiting,
    /// Speech started, accumulating the phrase
    Speaking,
    /// Phrase ended with a pause
    Complete,
}

/// Segments a single phrase from audio chunks
pub struct ActivityDetector {
    state: ActivityState,
    threshold: f32,
    ambient_target: usize,
    ambient_seen: usize,
    ambient_sum_sq: f64,
    pause_samples: usize,
    min_speech_samples: usize,
    silence_counter: usize,
    speech_buffer: Vec<f32>,
}

impl ActivityDetector {
    /// Create a detector for `sample_rate` audio
    ///
    /// `pause` is the silence that ends a phrase; `ambient` is the
    /// calibration window (zero skips calibration).
    #[must_use]
    pub fn new(sample_rate: u32, pause: Duration, ambient: Duration) -> Self {
        let ambient_target = samples_for(sample_rate, ambient);
        Self {
            state: if ambient_target == 0 {
                ActivityState::Waiting
            } else {
                ActivityState::Calibrating
            },
            threshold: ENERGY_FLOOR,
            ambient_target,
            ambient_seen: 0,
            ambient_sum_sq: 0.0,
            pause_samples: samples_for(sample_rate, pause),
            min_speech_samples: samples_for(sample_rate, MIN_SPEECH),
            silence_counter: 0,
            speech_buffer: Vec::new(),
        }
    }

    /// Feed a chunk of samples and return the new state
    pub fn process(&mut self, samples: &[f32]) -> ActivityState {
        let energy = calculate_energy(samples);

        match self.state {
            ActivityState::Calibrating => {
                self.ambient_sum_sq += samples
                    .iter()
                    .map(|s| f64::from(*s) * f64::from(*s))
                    .sum::<f64>();
                self.ambient_seen += samples.len();

                if self.ambient_seen >= self.ambient_target {
                    self.finish_calibration();
                }
            }
            ActivityState::Waiting => {
                if energy > self.threshold {
                    self.state = ActivityState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, threshold = self.threshold, "speech started");
                }
            }
            ActivityState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if energy > self.threshold {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter >= self.pause_samples {
                    // The buffer also holds the trailing pause
                    let voiced = self.speech_buffer.len() - self.silence_counter;
                    if voiced >= self.min_speech_samples {
                        tracing::debug!(samples = self.speech_buffer.len(), voiced, "phrase complete");
                        self.state = ActivityState::Complete;
                    } else {
                        // A click or cough, not a phrase
                        tracing::trace!(voiced, "speech too short, waiting again");
                        self.state = ActivityState::Waiting;
                        self.speech_buffer.clear();
                        self.silence_counter = 0;
                    }
                }
            }
            ActivityState::Complete => {}
        }

        self.state
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish_calibration(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let ambient = (self.ambient_sum_sq / self.ambient_seen.max(1) as f64).sqrt() as f32;
        self.threshold = (ambient * AMBIENT_FACTOR).max(ENERGY_FLOOR);
        self.state = ActivityState::Waiting;
        tracing::debug!(ambient, threshold = self.threshold, "ambient noise calibrated");
    }

    #[must_use]
    pub const fn state(&self) -> ActivityState {
        self.state
    }

    /// Energy a chunk must exceed to count as speech
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether speech has begun in this listen
    #[must_use]
    pub fn speech_started(&self) -> bool {
        matches!(self.state, ActivityState::Speaking | ActivityState::Complete)
    }

    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the phrase, clearing it
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn samples_for(sample_rate: u32, duration: Duration) -> usize {
    (f64::from(sample_rate) * duration.as_secs_f64()) as usize
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn sine(duration_secs: f32, amplitude: f32) -> Vec<f32> {
        let n = (RATE as f32 * duration_secs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / RATE as f32;
                amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn silence(duration_secs: f32) -> Vec<f32> {
        let n = (RATE as f32 * duration_secs) as usize;
        vec![0.0; n]
    }

    fn detector() -> ActivityDetector {
        ActivityDetector::new(RATE, Duration::from_millis(800), Duration::ZERO)
    }

    #[test]
    fn test_energy_calculation() {
        assert!(calculate_energy(&silence(0.01)) < 0.001);
        assert!(calculate_energy(&[0.5f32; 100]) > 0.4);
        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn silence_keeps_waiting() {
        let mut d = detector();
        assert_eq!(d.process(&silence(0.5)), ActivityState::Waiting);
        assert!(!d.speech_started());
    }

    #[test]
    fn speech_then_pause_completes() {
        let mut d = detector();
        assert_eq!(d.process(&sine(0.5, 0.3)), ActivityState::Speaking);
        assert_eq!(d.process(&silence(0.4)), ActivityState::Speaking);
        assert_eq!(d.process(&silence(0.5)), ActivityState::Complete);

        let phrase = d.take_speech_buffer();
        assert_eq!(phrase.len(), sine(0.5, 0.3).len() + silence(0.4).len() + silence(0.5).len());
        assert!(d.speech_buffer().is_empty());
    }

    #[test]
    fn short_blip_resets_to_waiting() {
        let mut d = ActivityDetector::new(RATE, Duration::from_millis(100), Duration::ZERO);
        d.process(&sine(0.02, 0.3));
        assert_eq!(d.state(), ActivityState::Speaking);
        assert_eq!(d.process(&silence(0.25)), ActivityState::Waiting);
        assert!(d.speech_buffer().is_empty());
    }

    #[test]
    fn click_before_long_pause_is_not_a_phrase() {
        let mut d = detector();
        assert_eq!(d.process(&sine(0.02, 0.3)), ActivityState::Speaking);
        for _ in 0..7 {
            assert_eq!(d.process(&silence(0.1)), ActivityState::Speaking);
        }
        assert_eq!(d.process(&silence(0.1)), ActivityState::Waiting);
        assert!(d.speech_buffer().is_empty());

        // The next real phrase is still picked up
        assert_eq!(d.process(&sine(0.5, 0.3)), ActivityState::Speaking);
        assert_eq!(d.process(&silence(0.8)), ActivityState::Complete);
    }

    #[test]
    fn calibration_raises_threshold_in_noisy_room() {
        let mut d = ActivityDetector::new(RATE, Duration::from_millis(800), Duration::from_millis(500));
        assert_eq!(d.state(), ActivityState::Calibrating);

        // Steady hum well above the floor
        d.process(&sine(0.5, 0.2));
        assert_eq!(d.state(), ActivityState::Waiting);
        assert!(d.threshold() > ENERGY_FLOOR);

        // The same hum no longer counts as speech
        assert_eq!(d.process(&sine(0.2, 0.2)), ActivityState::Waiting);
        // Louder speech does
        assert_eq!(d.process(&sine(0.2, 0.6)), ActivityState::Speaking);
    }

    #[test]
    fn quiet_room_keeps_floor() {
        let mut d = ActivityDetector::new(RATE, Duration::from_millis(800), Duration::from_millis(500));
        d.process(&silence(0.5));
        assert!((d.threshold() - ENERGY_FLOOR).abs() < f32::EPSILON);
    }
}
