//! Motion device abstraction.
//!
//! Headset sensor hardware is heterogeneous: some devices push samples from a
//! blocking read loop, others must be polled, and a build may carry no
//! hardware support at all. [`HeadsetDevice`] normalizes all of them behind a
//! single push-based orientation-sample contract; [`open_device`] selects the
//! backend compiled into this build.

#![forbid(unsafe_code)]

pub mod stub;
#[cfg(feature = "xreal")]
pub mod xreal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use thiserror::Error;

/// Result type alias for headset operations.
pub type HeadsetResult<T> = Result<T, HeadsetError>;

#[derive(Debug, Error)]
pub enum HeadsetError {
    #[error("headset device is already open")]
    AlreadyOpen,
    #[error("headset device is not open")]
    NotOpen,
    #[error("no headset backend is enabled in this build")]
    NotEnabled,
    #[error("failed to open headset device: {0}")]
    OpenFailed(String),
    #[error("polling is not supported by the {0} backend")]
    PollUnsupported(&'static str),
}

/// Per-axis orientation callbacks, invoked synchronously from the device's
/// delivery context. Callbacks block the read loop, so they must stay short.
pub struct EventListener {
    pub on_pitch: Box<dyn Fn(f32) + Send>,
    pub on_yaw: Box<dyn Fn(f32) + Send>,
    pub on_roll: Box<dyn Fn(f32) + Send>,
}

impl EventListener {
    /// Deliver one sample to all three callbacks, in the field order of the
    /// underlying hardware event (pitch, roll, yaw).
    pub fn dispatch(&self, pitch: f32, roll: f32, yaw: f32) {
        (self.on_pitch)(pitch);
        (self.on_roll)(roll);
        (self.on_yaw)(yaw);
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventListener")
    }
}

/// Listener slot shared between a device handle and its delivery context.
///
/// Registration replaces any previously installed listener; delivery always
/// goes to the most recent one. Backends that deliver from a background
/// thread park on [`wait_for_listener`] until registration so no samples are
/// handed to nobody.
///
/// [`wait_for_listener`]: ListenerSlot::wait_for_listener
#[derive(Default)]
pub struct ListenerSlot {
    listener: Mutex<Option<EventListener>>,
    registered: Condvar,
}

impl ListenerSlot {
    fn lock(&self) -> MutexGuard<'_, Option<EventListener>> {
        match self.listener.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Install `listener`, replacing any previous one, and wake waiters.
    pub fn register(&self, listener: EventListener) {
        *self.lock() = Some(listener);
        self.registered.notify_all();
    }

    /// Deliver one sample to the registered listener. Returns `false` when
    /// no listener is installed yet.
    pub fn dispatch(&self, pitch: f32, roll: f32, yaw: f32) -> bool {
        match self.lock().as_ref() {
            Some(listener) => {
                listener.dispatch(pitch, roll, yaw);
                true
            }
            None => false,
        }
    }

    /// Block until a listener is registered or `open` is cleared.
    pub fn wait_for_listener(&self, open: &AtomicBool) {
        let mut guard = self.lock();
        while guard.is_none() && open.load(Ordering::SeqCst) {
            guard = match self.registered.wait(guard) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Wake any thread parked in [`wait_for_listener`] so it can re-check
    /// its open flag.
    ///
    /// [`wait_for_listener`]: ListenerSlot::wait_for_listener
    pub fn wake(&self) {
        self.registered.notify_all();
    }
}

/// Uniform capability surface over headset sensor backends.
pub trait HeadsetDevice: Send {
    /// Acquire the hardware and, for event-driven backends, start delivery.
    fn initialize(&mut self) -> HeadsetResult<()>;

    /// Release the hardware; subsequent delivery stops.
    fn end(&mut self) -> HeadsetResult<()>;

    /// Drain pending samples. Only meaningful when [`is_polling_model`]
    /// reports true; the consumer then calls this once per frame.
    ///
    /// [`is_polling_model`]: HeadsetDevice::is_polling_model
    fn poll(&mut self) -> HeadsetResult<()>;

    fn is_polling_model(&self) -> bool;
    fn is_event_model(&self) -> bool;

    /// Install the listener receiving subsequent samples. Safe before or
    /// after [`initialize`]; a new listener replaces the previous one.
    ///
    /// [`initialize`]: HeadsetDevice::initialize
    fn register_listener(&mut self, listener: EventListener);
}

/// Select the headset backend compiled into this build.
///
/// With the `xreal` feature this is the event-driven hardware backend;
/// otherwise the disabled stub, whose operations fail until a real backend
/// is compiled in.
pub fn open_device() -> HeadsetResult<Box<dyn HeadsetDevice>> {
    #[cfg(feature = "xreal")]
    {
        Ok(Box::new(xreal::XrealDevice::new()))
    }
    #[cfg(not(feature = "xreal"))]
    {
        Ok(Box::new(stub::DisabledStub::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn dispatch_order_is_pitch_roll_yaw() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let tag = |name: &'static str| {
            let order = Arc::clone(&order);
            Box::new(move |_v: f32| order.lock().unwrap().push(name))
        };
        let listener = EventListener {
            on_pitch: tag("pitch"),
            on_yaw: tag("yaw"),
            on_roll: tag("roll"),
        };
        listener.dispatch(1.0, 2.0, 3.0);
        assert_eq!(*order.lock().unwrap(), vec!["pitch", "roll", "yaw"]);
    }

    #[test]
    fn dispatch_hits_every_callback_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let count = || {
            let hits = Arc::clone(&hits);
            Box::new(move |_v: f32| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let listener = EventListener {
            on_pitch: count(),
            on_yaw: count(),
            on_roll: count(),
        };
        listener.dispatch(0.0, 0.0, 0.0);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    fn counting_listener(hits: &Arc<AtomicUsize>) -> EventListener {
        let count = || {
            let hits = Arc::clone(hits);
            Box::new(move |_v: f32| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        EventListener {
            on_pitch: count(),
            on_yaw: count(),
            on_roll: count(),
        }
    }

    #[test]
    fn registering_a_new_listener_replaces_the_old_one() {
        let slot = ListenerSlot::default();

        let first_hits = Arc::new(AtomicUsize::new(0));
        slot.register(counting_listener(&first_hits));
        assert!(slot.dispatch(0.0, 0.0, 0.0));
        assert_eq!(first_hits.load(Ordering::SeqCst), 3);

        let second_hits = Arc::new(AtomicUsize::new(0));
        slot.register(counting_listener(&second_hits));
        assert!(slot.dispatch(0.0, 0.0, 0.0));

        // Only the most recent listener receives samples.
        assert_eq!(first_hits.load(Ordering::SeqCst), 3);
        assert_eq!(second_hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dispatch_without_listener_reports_undelivered() {
        assert!(!ListenerSlot::default().dispatch(0.0, 0.0, 0.0));
    }

    #[test]
    fn wait_returns_once_a_listener_arrives() {
        let slot = Arc::new(ListenerSlot::default());
        let open = Arc::new(AtomicBool::new(true));
        let waiter = {
            let slot = Arc::clone(&slot);
            let open = Arc::clone(&open);
            std::thread::spawn(move || slot.wait_for_listener(&open))
        };
        slot.register(counting_listener(&Arc::new(AtomicUsize::new(0))));
        waiter.join().unwrap();
    }

    #[test]
    fn wait_returns_when_the_session_closes() {
        let slot = Arc::new(ListenerSlot::default());
        let open = Arc::new(AtomicBool::new(true));
        let waiter = {
            let slot = Arc::clone(&slot);
            let open = Arc::clone(&open);
            std::thread::spawn(move || slot.wait_for_listener(&open))
        };
        open.store(false, Ordering::SeqCst);
        slot.wake();
        waiter.join().unwrap();
    }

    #[cfg(not(feature = "xreal"))]
    #[test]
    fn default_build_selects_the_stub() {
        let mut device = open_device().unwrap();
        assert!(!device.is_polling_model());
        assert!(!device.is_event_model());
        assert!(matches!(device.initialize(), Err(HeadsetError::NotEnabled)));
    }
}
