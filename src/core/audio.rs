//! Audio output collaborator

use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::clock::Clock;
use crate::models::AudioClip;

/// Audio source the player drives
pub trait AudioOutput {
    /// Replace the clip; the source stops
    fn set_clip(&mut self, clip: Option<AudioClip>);
    /// Length of the current clip, `None` without a clip
    fn clip_length(&self) -> Option<f32>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Playback position in seconds
    fn time(&self) -> f32;
    fn set_time(&mut self, secs: f32);
    fn is_looping(&self) -> bool;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);

    fn has_clip(&self) -> bool {
        self.clip_length().is_some()
    }
}

#[derive(Debug)]
struct SourceState {
    clip: Option<AudioClip>,
    playing: bool,
    position: f32,
    anchor: f64,
    volume: f32,
}

/// Silent audio source that keeps an accurate playback clock
///
/// Cloning yields another handle to the same source.
#[derive(Clone)]
pub struct NullAudio {
    state: Arc<Mutex<SourceState>>,
    clock: Arc<dyn Clock>,
}

impl NullAudio {
    pub fn new(clock: Arc<dyn Clock>, volume: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                clip: None,
                playing: false,
                position: 0.0,
                anchor: 0.0,
                volume,
            })),
            clock,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn clip(&self) -> Option<AudioClip> {
        self.state.lock().clip.clone()
    }

    fn position(&self, state: &SourceState) -> f32 {
        let length = state.clip.as_ref().map(|c| c.length).unwrap_or(0.0);
        let position = if state.playing {
            state.position + (self.clock.now() - state.anchor) as f32
        } else {
            state.position
        };
        position.clamp(0.0, length)
    }
}

impl AudioOutput for NullAudio {
    fn set_clip(&mut self, clip: Option<AudioClip>) {
        let mut state = self.state.lock();
        state.clip = clip;
        state.playing = false;
        state.position = 0.0;
    }

    fn clip_length(&self) -> Option<f32> {
        self.state.lock().clip.as_ref().map(|c| c.length)
    }

    fn play(&mut self) {
        let mut state = self.state.lock();
        if state.clip.is_some() && !state.playing {
            state.playing = true;
            state.anchor = self.clock.now();
        }
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        if state.playing {
            state.position = self.position(&state);
            state.playing = false;
        }
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.position = 0.0;
    }

    fn time(&self) -> f32 {
        let state = self.state.lock();
        self.position(&state)
    }

    fn set_time(&mut self, secs: f32) {
        let mut state = self.state.lock();
        state.position = secs.max(0.0);
        state.anchor = self.clock.now();
    }

    fn is_looping(&self) -> bool {
        false
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume.clamp(0.0, 1.0);
    }
}
