//! Motion smoothing pipeline.
//!
//! Raw orientation samples arrive on the device's delivery thread; the
//! renderer pulls one smoothed [`LookDelta`] per frame. Between those two
//! sits per-device quirk policy: axis suppression, a startup settle window,
//! and an outlier guard that absorbs sensor glitches.
//!
//! Samples are coalesced, never queued: if the consumer misses a sample, the
//! next frame simply reads the latest pair. A single mutex over the whole
//! axis state is enough at IMU rates.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use vantage_edid::QuirkEntry;
use vantage_headset::EventListener;

/// Fixed smoothing gain applied to raw per-frame deltas.
pub const SMOOTHING_GAIN: f32 = 6.5;
/// Largest single-axis delta (post-gain) accepted as real head movement.
pub const MAX_TRUSTED_DELTA: f32 = 7.0;

/// Smoothed per-frame orientation delta, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookDelta {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// What the renderer should do with look direction this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameLook {
    /// The device has no usable onboard orientation; source look direction
    /// from the pointer-input collaborator instead.
    PointerDriven,
    /// Apply this delta to the camera.
    Sensor(LookDelta),
}

/// A delta is undefined before two samples exist, so each axis tracks
/// whether it has been primed by a first sample.
#[derive(Debug, Default, Clone, Copy)]
struct AxisState {
    previous: f32,
    current: f32,
    primed: bool,
}

impl AxisState {
    fn push(&mut self, value: f32) {
        if self.primed {
            self.previous = self.current;
            self.current = value;
        } else {
            self.primed = true;
            self.previous = value;
            self.current = value;
        }
    }

    fn delta(&self) -> f32 {
        self.current - self.previous
    }
}

#[derive(Debug, Default)]
struct MotionState {
    pitch: AxisState,
    yaw: AxisState,
    roll: AxisState,
}

/// Per-session motion state: written by the device callbacks, read once per
/// frame by the renderer.
pub struct MotionTracker {
    state: Arc<Mutex<MotionState>>,
    roll_disabled: bool,
    uses_pointer_look: bool,
    /// While set, all deltas are suppressed; cleared permanently once the
    /// settle window elapses.
    settle_until: Option<Instant>,
}

impl MotionTracker {
    pub fn new(quirks: &QuirkEntry) -> Self {
        if quirks.roll_disabled {
            warn!("QUIRK: roll axis is disabled for this device");
        }
        let settle_until = if quirks.sensor_init_delay_secs > 0 {
            warn!(
                seconds = quirks.sensor_init_delay_secs,
                "QUIRK: ignoring sensor data while the device settles; movement is disabled"
            );
            Some(Instant::now() + Duration::from_secs(quirks.sensor_init_delay_secs as u64))
        } else {
            None
        };

        Self {
            state: Arc::new(Mutex::new(MotionState::default())),
            roll_disabled: quirks.roll_disabled,
            uses_pointer_look: quirks.uses_pointer_look,
            settle_until,
        }
    }

    /// Build the listener to register with the headset device. The callbacks
    /// share this tracker's state; registering a listener from a newer
    /// tracker supersedes this one.
    pub fn listener(&self) -> EventListener {
        let pitch_state = Arc::clone(&self.state);
        let yaw_state = Arc::clone(&self.state);
        let roll_state = Arc::clone(&self.state);
        EventListener {
            on_pitch: Box::new(move |value| lock_state(&pitch_state).pitch.push(value)),
            on_yaw: Box::new(move |value| lock_state(&yaw_state).yaw.push(value)),
            on_roll: Box::new(move |value| lock_state(&roll_state).roll.push(value)),
        }
    }

    /// Compute this frame's look update. Called once per render frame.
    pub fn frame_look(&mut self) -> FrameLook {
        // Policy switch, not a data transformation: pointer-driven devices
        // bypass the sensor pipeline entirely.
        if self.uses_pointer_look {
            return FrameLook::PointerDriven;
        }

        if let Some(deadline) = self.settle_until {
            if Instant::now() < deadline {
                return FrameLook::Sensor(LookDelta::default());
            }
            info!("sensor settle window elapsed; movement is now enabled");
            self.settle_until = None;
        }

        let delta = {
            let state = lock_state(&self.state);
            LookDelta {
                pitch: state.pitch.delta() * SMOOTHING_GAIN,
                yaw: state.yaw.delta() * SMOOTHING_GAIN,
                roll: if self.roll_disabled {
                    0.0
                } else {
                    state.roll.delta() * SMOOTHING_GAIN
                },
            }
        };

        FrameLook::Sensor(LookDelta {
            pitch: guard_axis("pitch", delta.pitch),
            yaw: guard_axis("yaw", delta.yaw),
            roll: guard_axis("roll", delta.roll),
        })
    }
}

fn lock_state(state: &Mutex<MotionState>) -> MutexGuard<'_, MotionState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Reject a single-axis glitch without disturbing the other axes.
fn guard_axis(axis: &'static str, value: f32) -> f32 {
    if value.abs() > MAX_TRUSTED_DELTA {
        error!(axis, value, "ignoring extreme camera movement");
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quirkless() -> QuirkEntry {
        QuirkEntry::default()
    }

    fn sensor(look: FrameLook) -> LookDelta {
        match look {
            FrameLook::Sensor(delta) => delta,
            FrameLook::PointerDriven => panic!("expected sensor-driven look"),
        }
    }

    #[test]
    fn first_frame_delta_is_zero() {
        let mut tracker = MotionTracker::new(&quirkless());
        let listener = tracker.listener();
        listener.dispatch(3.0, 1.0, 2.0);
        assert_eq!(sensor(tracker.frame_look()), LookDelta::default());
    }

    #[test]
    fn delta_reflects_sample_difference_then_settles_to_zero() {
        let mut tracker = MotionTracker::new(&quirkless());
        let listener = tracker.listener();

        listener.dispatch(0.0, 0.0, 0.0);
        assert_eq!(sensor(tracker.frame_look()).pitch, 0.0);

        listener.dispatch(1.0, 0.0, 0.0);
        let delta = sensor(tracker.frame_look());
        assert!((delta.pitch - SMOOTHING_GAIN).abs() < 1e-5);

        // Repeating the same value: current and previous converge.
        listener.dispatch(1.0, 0.0, 0.0);
        assert_eq!(sensor(tracker.frame_look()).pitch, 0.0);
    }

    #[test]
    fn missed_frames_coalesce_to_latest_pair() {
        let mut tracker = MotionTracker::new(&quirkless());
        let listener = tracker.listener();
        listener.dispatch(0.0, 0.0, 0.0);
        listener.dispatch(0.2, 0.0, 0.0);
        listener.dispatch(0.5, 0.0, 0.0);
        // Only the last two samples matter.
        let delta = sensor(tracker.frame_look());
        assert!((delta.pitch - 0.3 * SMOOTHING_GAIN).abs() < 1e-5);
    }

    #[test]
    fn roll_quirk_forces_zero_roll() {
        let quirks = QuirkEntry {
            roll_disabled: true,
            ..QuirkEntry::default()
        };
        let mut tracker = MotionTracker::new(&quirks);
        let listener = tracker.listener();
        listener.dispatch(0.0, 0.0, 0.0);
        listener.dispatch(0.0, 0.9, 0.4);

        let delta = sensor(tracker.frame_look());
        assert_eq!(delta.roll, 0.0);
        assert!((delta.yaw - 0.4 * SMOOTHING_GAIN).abs() < 1e-5);
    }

    #[test]
    fn settle_window_suppresses_then_lifts() {
        let quirks = QuirkEntry {
            sensor_init_delay_secs: 30,
            ..QuirkEntry::default()
        };
        let mut tracker = MotionTracker::new(&quirks);
        let listener = tracker.listener();
        listener.dispatch(0.0, 0.0, 0.0);
        listener.dispatch(0.5, 0.5, 0.5);

        assert_eq!(sensor(tracker.frame_look()), LookDelta::default());

        // Push the deadline into the past: the gate lifts permanently.
        tracker.settle_until = Some(Instant::now() - Duration::from_secs(1));
        let delta = sensor(tracker.frame_look());
        assert!((delta.pitch - 0.5 * SMOOTHING_GAIN).abs() < 1e-5);
        assert!(tracker.settle_until.is_none());

        let again = sensor(tracker.frame_look());
        assert!((again.pitch - 0.5 * SMOOTHING_GAIN).abs() < 1e-5);
    }

    #[test]
    fn outlier_guard_zeroes_only_the_offending_axis() {
        let mut tracker = MotionTracker::new(&quirkless());
        let listener = tracker.listener();
        listener.dispatch(0.0, 0.0, 0.0);
        // Pitch jumps far past the trusted bound; yaw moves normally.
        listener.dispatch(10.0, 0.0, 0.5);

        let delta = sensor(tracker.frame_look());
        assert_eq!(delta.pitch, 0.0);
        assert!((delta.yaw - 0.5 * SMOOTHING_GAIN).abs() < 1e-5);
        assert_eq!(delta.roll, 0.0);
    }

    #[test]
    fn pointer_look_quirk_bypasses_the_pipeline() {
        let quirks = QuirkEntry {
            uses_pointer_look: true,
            sensor_init_delay_secs: 30,
            ..QuirkEntry::default()
        };
        let mut tracker = MotionTracker::new(&quirks);
        let listener = tracker.listener();
        listener.dispatch(5.0, 5.0, 5.0);
        assert_eq!(tracker.frame_look(), FrameLook::PointerDriven);
    }

    #[test]
    fn callbacks_are_send() {
        fn assert_send<T: Send>(_t: &T) {}
        let tracker = MotionTracker::new(&quirkless());
        let listener = tracker.listener();
        assert_send(&listener.on_pitch);
        assert_send(&listener.on_yaw);
        assert_send(&listener.on_roll);
    }
}
