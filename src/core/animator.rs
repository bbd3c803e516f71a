//! Animator and avatar collaborators
//!
//! The player never talks to an engine directly. It drives an [`Animator`] through named
//! bool parameters, a playback speed and a single clip override slot, and asks an
//! [`AvatarProvider`] for the animator of the currently active avatar.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::PlayerConfig;
use crate::core::clock::Clock;
use crate::models::AnimationClip;

/// Animator of the active avatar
pub trait Animator {
    fn has_bool(&self, name: &str) -> bool;
    fn get_bool(&self, name: &str) -> bool;
    fn set_bool(&mut self, name: &str, value: bool);
    fn speed(&self) -> f32;
    fn set_speed(&mut self, speed: f32);
    /// Whether `layer` currently sits in `state`
    fn is_in_state(&self, layer: &str, state: &str) -> bool;
    fn is_in_transition(&self, layer: &str) -> bool;
    /// Whether the controller defines a placeholder clip named `slot`
    fn has_clip_slot(&self, slot: &str) -> bool;
    /// Play `clip` wherever the placeholder `slot` is used, `None` restores the placeholder
    fn set_clip_override(&mut self, slot: &str, clip: Option<&AnimationClip>);
}

/// Lookup of the currently active avatar
pub trait AvatarProvider {
    fn animator(&mut self) -> Option<&mut dyn Animator>;
    /// Changes whenever the active avatar is replaced
    fn generation(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pose {
    Idle,
    Waiting,
    Dancing,
}

#[derive(Debug)]
struct AnimatorState {
    layer: String,
    dance_state: String,
    dancing_param: String,
    waiting_param: String,
    params: HashMap<String, bool>,
    slots: HashSet<String>,
    overrides: HashMap<String, AnimationClip>,
    speed: f32,
    pose: Pose,
    target: Pose,
    changed_at: f64,
    pose_lag: f64,
}

impl AnimatorState {
    fn settle(&mut self, now: f64) {
        if self.pose != self.target && now - self.changed_at >= self.pose_lag {
            self.pose = self.target;
        }
    }

    fn wanted_pose(&self) -> Pose {
        let get = |name: &str| self.params.get(name).copied().unwrap_or(false);
        if get(&self.dancing_param) {
            Pose::Dancing
        } else if get(&self.waiting_param) {
            Pose::Waiting
        } else {
            Pose::Idle
        }
    }
}

/// Engine-free animator used by the binary and in tests
///
/// Poses follow the dancing/waiting params after `pose_lag` seconds; cloning yields
/// another handle to the same animator.
#[derive(Clone)]
pub struct HeadlessAnimator {
    state: Arc<Mutex<AnimatorState>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HeadlessAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessAnimator")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl HeadlessAnimator {
    pub fn new(clock: Arc<dyn Clock>, config: &PlayerConfig) -> Self {
        let params = [
            (config.custom_dancing_param.clone(), false),
            (config.waiting_param.clone(), false),
        ]
        .into_iter()
        .collect();

        let state = AnimatorState {
            layer: config.dance_layer_name.clone(),
            dance_state: config.dance_state_name.clone(),
            dancing_param: config.custom_dancing_param.clone(),
            waiting_param: config.waiting_param.clone(),
            params,
            slots: std::iter::once(config.placeholder_clip_name.clone()).collect(),
            overrides: HashMap::new(),
            speed: 1.0,
            pose: Pose::Idle,
            target: Pose::Idle,
            changed_at: clock.now(),
            pose_lag: 0.0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    /// Delay before the pose follows a parameter change
    pub fn with_pose_lag(self, secs: f64) -> Self {
        self.state.lock().pose_lag = secs.max(0.0);
        self
    }

    /// Remove the placeholder slot, as on a controller without dance support
    pub fn without_clip_slots(self) -> Self {
        self.state.lock().slots.clear();
        self
    }

    /// Clip currently substituted into `slot`
    pub fn override_clip(&self, slot: &str) -> Option<AnimationClip> {
        self.state.lock().overrides.get(slot).cloned()
    }

    /// Whether the avatar is visibly dancing
    pub fn is_dancing(&self) -> bool {
        let mut state = self.state.lock();
        state.settle(self.clock.now());
        state.pose == Pose::Dancing
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut AnimatorState) -> R) -> R {
        let mut state = self.state.lock();
        state.settle(self.clock.now());
        f(&mut state)
    }
}

impl Animator for HeadlessAnimator {
    fn has_bool(&self, name: &str) -> bool {
        self.state.lock().params.contains_key(name)
    }

    fn get_bool(&self, name: &str) -> bool {
        self.state.lock().params.get(name).copied().unwrap_or(false)
    }

    fn set_bool(&mut self, name: &str, value: bool) {
        let now = self.clock.now();
        self.with_state(|state| {
            if let Some(param) = state.params.get_mut(name) {
                *param = value;
            }
            let wanted = state.wanted_pose();
            if wanted != state.target {
                state.target = wanted;
                state.changed_at = now;
            }
            state.settle(now);
        });
    }

    fn speed(&self) -> f32 {
        self.state.lock().speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.state.lock().speed = speed;
    }

    fn is_in_state(&self, layer: &str, state_name: &str) -> bool {
        self.with_state(|state| {
            state.layer == layer && state.dance_state == state_name && state.pose == Pose::Dancing
        })
    }

    fn is_in_transition(&self, layer: &str) -> bool {
        self.with_state(|state| state.layer == layer && state.pose != state.target)
    }

    fn has_clip_slot(&self, slot: &str) -> bool {
        self.state.lock().slots.contains(slot)
    }

    fn set_clip_override(&mut self, slot: &str, clip: Option<&AnimationClip>) {
        let mut state = self.state.lock();
        match clip {
            Some(clip) => {
                state.overrides.insert(slot.to_string(), clip.clone());
            }
            None => {
                state.overrides.remove(slot);
            }
        }
    }
}

#[derive(Debug, Default)]
struct AvatarSlot {
    animator: Option<HeadlessAnimator>,
    generation: u64,
}

/// Avatar provider holding at most one headless animator
///
/// Clones share the slot, so a swap through one handle is seen by all of them.
#[derive(Debug, Clone, Default)]
pub struct HeadlessAvatar {
    shared: Arc<Mutex<AvatarSlot>>,
    current: Option<HeadlessAnimator>,
    seen: u64,
}

impl HeadlessAvatar {
    pub fn new(animator: HeadlessAnimator) -> Self {
        let avatar = Self::default();
        avatar.swap(Some(animator));
        avatar
    }

    /// Replace the active avatar
    pub fn swap(&self, animator: Option<HeadlessAnimator>) {
        let mut slot = self.shared.lock();
        slot.animator = animator;
        slot.generation += 1;
    }
}

impl AvatarProvider for HeadlessAvatar {
    fn animator(&mut self) -> Option<&mut dyn Animator> {
        {
            let slot = self.shared.lock();
            if slot.generation != self.seen {
                self.current = slot.animator.clone();
                self.seen = slot.generation;
            }
        }
        self.current.as_mut().map(|a| a as &mut dyn Animator)
    }

    fn generation(&self) -> u64 {
        self.shared.lock().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    fn animator(clock: &ManualClock) -> HeadlessAnimator {
        HeadlessAnimator::new(Arc::new(clock.clone()), &PlayerConfig::default())
    }

    #[test]
    fn test_pose_follows_params_instantly_without_lag() {
        let clock = ManualClock::new(100.0);
        let mut anim = animator(&clock);

        anim.set_bool("isCustomDancing", true);
        assert!(anim.is_in_state("Dance Layer", "Custom Dance"));
        assert!(!anim.is_in_transition("Dance Layer"));
        assert!(!anim.is_in_state("Other Layer", "Custom Dance"));
    }

    #[test]
    fn test_pose_lag_keeps_transition_open() {
        let clock = ManualClock::new(100.0);
        let mut anim = animator(&clock).with_pose_lag(0.5);

        anim.set_bool("isWaitingForDancing", true);
        assert!(anim.is_in_transition("Dance Layer"));

        clock.advance(0.6);
        assert!(!anim.is_in_transition("Dance Layer"));
        assert!(anim.get_bool("isWaitingForDancing"));
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let clock = ManualClock::new(0.0);
        let mut anim = animator(&clock);

        anim.set_bool("missing", true);
        assert!(!anim.has_bool("missing"));
        assert!(!anim.get_bool("missing"));
    }

    #[test]
    fn test_avatar_swap_bumps_generation() {
        let clock = ManualClock::new(0.0);
        let mut avatar = HeadlessAvatar::new(animator(&clock));
        let first = avatar.generation();
        assert!(avatar.animator().is_some());

        avatar.clone().swap(None);
        assert_ne!(avatar.generation(), first);
        assert!(avatar.animator().is_none());
    }
}
