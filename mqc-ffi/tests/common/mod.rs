//! Shared fixtures for the C ABI tests.
//!
//! Every test passes its own broker name so tests can run in parallel in one
//! process.

#![allow(dead_code)]

use std::ffi::{CStr, CString, c_char};
use std::ptr;

use mqc_ffi::connection::*;
use mqc_ffi::connection_factory::*;
use mqc_ffi::destination::*;
use mqc_ffi::session::*;
use mqc_ffi::*;

/// Owned C string for passing to the API.
pub fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Read a NUL-terminated buffer written by the API.
pub fn read_c(buf: &[c_char]) -> String {
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_str()
        .unwrap()
        .to_owned()
}

/// A factory, connection and session on a private broker.
pub struct Fixture {
    pub factory: *mut MqcConnectionFactory,
    pub connection: *mut MqcConnection,
    pub session: *mut MqcSession,
}

impl Fixture {
    pub fn new(broker: &str) -> Self {
        Self::with_ack(broker, MQC_ACK_AUTO)
    }

    pub fn with_ack(broker: &str, ack_mode: i32) -> Self {
        let uri = c(&format!("vm://{broker}"));
        let mut factory = ptr::null_mut();
        let mut connection = ptr::null_mut();
        let mut session = ptr::null_mut();
        unsafe {
            assert_eq!(
                mqc_create_connection_factory(uri.as_ptr(), ptr::null(), ptr::null(), &mut factory),
                MqcStatus::Success
            );
            assert_eq!(
                mqc_create_default_connection(factory, &mut connection),
                MqcStatus::Success
            );
            assert_eq!(
                mqc_create_session(connection, ack_mode, &mut session),
                MqcStatus::Success
            );
        }
        Self {
            factory,
            connection,
            session,
        }
    }

    pub fn start(&self) {
        assert_eq!(unsafe { mqc_start_connection(self.connection) }, MqcStatus::Success);
    }

    pub fn queue(&self, name: &str) -> *mut MqcDestination {
        self.destination(MQC_DESTINATION_QUEUE, name)
    }

    pub fn topic(&self, name: &str) -> *mut MqcDestination {
        self.destination(MQC_DESTINATION_TOPIC, name)
    }

    fn destination(&self, kind: i32, name: &str) -> *mut MqcDestination {
        let name = c(name);
        let mut out = ptr::null_mut();
        assert_eq!(
            unsafe { mqc_create_destination(self.session, kind, name.as_ptr(), &mut out) },
            MqcStatus::Success
        );
        out
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        unsafe {
            mqc_destroy_session(self.session);
            mqc_destroy_connection(self.connection);
            mqc_destroy_connection_factory(self.factory);
        }
    }
}
