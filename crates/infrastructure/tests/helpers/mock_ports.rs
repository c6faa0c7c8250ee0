#![allow(dead_code)]
use ferrous_netd_application::ports::{ForwardingStateTracker, InterfaceEnumerator};
use ferrous_netd_domain::{Interface, NetworkError, ServerId};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockInterfaceEnumerator {
    interfaces: Mutex<Vec<Interface>>,
    fail: Mutex<bool>,
}

impl MockInterfaceEnumerator {
    pub fn new(interfaces: Vec<Interface>) -> Self {
        Self {
            interfaces: Mutex::new(interfaces),
            fail: Mutex::new(false),
        }
    }

    pub fn set_interfaces(&self, interfaces: Vec<Interface>) {
        *self.interfaces.lock().unwrap() = interfaces;
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl InterfaceEnumerator for MockInterfaceEnumerator {
    fn enumerate(&self) -> Result<Vec<Interface>, NetworkError> {
        if *self.fail.lock().unwrap() {
            return Err(NetworkError::Enumeration("mock failure".to_string()));
        }
        Ok(self.interfaces.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingTracker {
    removed: Mutex<Vec<ServerId>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removed(&self) -> Vec<ServerId> {
        self.removed.lock().unwrap().clone()
    }
}

impl ForwardingStateTracker for RecordingTracker {
    fn on_server_removed(&self, server: ServerId) {
        self.removed.lock().unwrap().push(server);
    }
}
