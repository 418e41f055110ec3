//! Event-driven XREAL hardware backend.
//!
//! The glasses deliver raw accelerometer/gyroscope samples over USB; a
//! dedicated background thread blocks on the next sample, runs sensor fusion,
//! and pushes Euler angles through the registered [`EventListener`]. The
//! listener slot is owned by the device instance and captured by the thread
//! at spawn time; delivery waits on the slot until a listener is registered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use ar_drivers::{any_glasses, ARGlasses, GlassesEvent};
use imu_fusion::{Fusion, FusionAhrsSettings, FusionVector};
use tracing::{error, info};

use crate::{EventListener, HeadsetDevice, HeadsetError, HeadsetResult, ListenerSlot};

/// Nominal IMU sample rate handed to the fusion filter.
const FUSION_SAMPLE_RATE_HZ: u32 = 1000;

pub struct XrealDevice {
    slot: Arc<ListenerSlot>,
    open: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl XrealDevice {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(ListenerSlot::default()),
            open: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Start a session by handing out a fresh open flag. A worker left over
    /// from an earlier session may still be blocked in a hardware read; it
    /// only ever observes the flag it was spawned with, so it can never see
    /// a later session as its own and resume delivering.
    fn arm(&mut self) -> Arc<AtomicBool> {
        let open = Arc::new(AtomicBool::new(true));
        self.open = Arc::clone(&open);
        open
    }
}

impl Default for XrealDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadsetDevice for XrealDevice {
    fn initialize(&mut self) -> HeadsetResult<()> {
        if self.open.load(Ordering::SeqCst) {
            return Err(HeadsetError::AlreadyOpen);
        }

        let glasses =
            any_glasses().map_err(|err| HeadsetError::OpenFailed(err.to_string()))?;
        info!(name = %glasses.name(), "opened XR glasses");

        let open = self.arm();
        let slot = Arc::clone(&self.slot);
        self.worker = Some(thread::spawn(move || {
            run_read_loop(glasses, slot, open);
        }));

        Ok(())
    }

    fn end(&mut self) -> HeadsetResult<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(HeadsetError::NotOpen);
        }
        self.open.store(false, Ordering::SeqCst);
        // Wake the read loop if it is still parked waiting for a listener.
        // It exits on its own after the next hardware sample; the blocking
        // read cannot be interrupted from here.
        self.slot.wake();
        self.worker.take();
        Ok(())
    }

    fn poll(&mut self) -> HeadsetResult<()> {
        Err(HeadsetError::PollUnsupported("xreal"))
    }

    fn is_polling_model(&self) -> bool {
        false
    }

    fn is_event_model(&self) -> bool {
        true
    }

    fn register_listener(&mut self, listener: EventListener) {
        self.slot.register(listener);
    }
}

fn run_read_loop(
    mut glasses: Box<dyn ARGlasses>,
    slot: Arc<ListenerSlot>,
    open: Arc<AtomicBool>,
) {
    // Hold delivery until a listener exists; registration may race with the
    // first hardware samples.
    slot.wait_for_listener(&open);

    let mut fusion = Fusion::new(FUSION_SAMPLE_RATE_HZ as _, FusionAhrsSettings::new());
    let mut last_timestamp: u64 = 0;

    while open.load(Ordering::SeqCst) {
        let event = match glasses.read_event() {
            Ok(event) => event,
            Err(err) => {
                // Read failures are terminal for the device; the consumer
                // notices the silence and fails the session.
                error!("glasses read failed, stopping delivery: {err}");
                break;
            }
        };

        if let GlassesEvent::AccGyro {
            accelerometer,
            gyroscope,
            timestamp,
        } = event
        {
            let dt = if last_timestamp > 0 {
                timestamp.saturating_sub(last_timestamp) as f32 / 1_000_000.0
            } else {
                1.0 / FUSION_SAMPLE_RATE_HZ as f32
            };
            last_timestamp = timestamp;

            let gyro = FusionVector {
                x: gyroscope.x,
                y: gyroscope.y,
                z: gyroscope.z,
            };
            let accel = FusionVector {
                x: accelerometer.x,
                y: accelerometer.y,
                z: accelerometer.z,
            };
            let no_mag = FusionVector {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            };
            fusion.update(gyro, accel, no_mag, dt);

            let q = fusion.quaternion();
            let (pitch, roll, yaw) = euler_degrees(q.w, q.x, q.y, q.z);
            slot.dispatch(pitch, roll, yaw);
        }
    }

    open.store(false, Ordering::SeqCst);
    info!("glasses read loop stopped");
}

/// Convert a unit quaternion to (pitch, roll, yaw) in degrees.
fn euler_degrees(w: f32, x: f32, y: f32, z: f32) -> (f32, f32, f32) {
    let pitch = {
        let sin_p = 2.0 * (w * x - y * z);
        sin_p.clamp(-1.0, 1.0).asin()
    };
    let roll = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (x * x + z * z));
    let yaw = (2.0 * (w * y + x * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    (
        pitch.to_degrees(),
        roll.to_degrees(),
        yaw.to_degrees(),
    )
}
