//! Inert stub backend for builds without hardware support.

use crate::{EventListener, HeadsetDevice, HeadsetError, HeadsetResult};

/// Stands in when no physical device backend is compiled in. Capability
/// queries report neither polling nor event delivery; everything else fails.
#[derive(Debug, Default)]
pub struct DisabledStub;

impl HeadsetDevice for DisabledStub {
    fn initialize(&mut self) -> HeadsetResult<()> {
        Err(HeadsetError::NotEnabled)
    }

    fn end(&mut self) -> HeadsetResult<()> {
        Err(HeadsetError::NotEnabled)
    }

    fn poll(&mut self) -> HeadsetResult<()> {
        Err(HeadsetError::NotEnabled)
    }

    fn is_polling_model(&self) -> bool {
        false
    }

    fn is_event_model(&self) -> bool {
        false
    }

    fn register_listener(&mut self, _listener: EventListener) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_fails_closed() {
        let mut stub = DisabledStub;
        assert!(matches!(stub.initialize(), Err(HeadsetError::NotEnabled)));
        assert!(matches!(stub.poll(), Err(HeadsetError::NotEnabled)));
        assert!(matches!(stub.end(), Err(HeadsetError::NotEnabled)));
    }

    #[test]
    fn listener_registration_is_accepted_but_inert() {
        let mut stub = DisabledStub;
        stub.register_listener(EventListener {
            on_pitch: Box::new(|_| panic!("stub must never deliver")),
            on_yaw: Box::new(|_| panic!("stub must never deliver")),
            on_roll: Box::new(|_| panic!("stub must never deliver")),
        });
        assert!(!stub.is_polling_model());
        assert!(!stub.is_event_model());
    }
}
