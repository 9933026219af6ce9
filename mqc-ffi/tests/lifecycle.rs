//! Handle lifecycle, connections, sessions and destinations.

mod common;

use std::ffi::c_char;
use std::ptr;

use common::{Fixture, c, read_c};
use mqc_ffi::connection::*;
use mqc_ffi::connection_factory::*;
use mqc_ffi::consumer::*;
use mqc_ffi::destination::*;
use mqc_ffi::message::*;
use mqc_ffi::producer::*;
use mqc_ffi::queue_browser::*;
use mqc_ffi::session::*;
use mqc_ffi::*;

mod handles {
    use super::*;

    /// Every handle kind can be created and destroyed.
    #[test]
    fn test_create_and_destroy_every_kind() {
        let fx = Fixture::new("ffi-lifecycle-all");
        let queue = fx.queue("q");
        unsafe {
            let mut message = ptr::null_mut();
            assert_eq!(mqc_create_message(fx.session, &mut message), MqcStatus::Success);
            let mut producer = ptr::null_mut();
            assert_eq!(
                mqc_create_producer(fx.session, queue, &mut producer),
                MqcStatus::Success
            );
            let mut consumer = ptr::null_mut();
            assert_eq!(
                mqc_create_default_consumer(fx.session, queue, &mut consumer),
                MqcStatus::Success
            );
            let mut browser = ptr::null_mut();
            assert_eq!(
                mqc_create_queue_browser(fx.session, queue, ptr::null(), &mut browser),
                MqcStatus::Success
            );

            assert_eq!(mqc_destroy_queue_browser(browser), MqcStatus::Success);
            assert_eq!(mqc_destroy_consumer(consumer), MqcStatus::Success);
            assert_eq!(mqc_destroy_producer(producer), MqcStatus::Success);
            assert_eq!(mqc_destroy_message(message), MqcStatus::Success);
            assert_eq!(mqc_destroy_destination(queue), MqcStatus::Success);
        }
    }

    /// Destroying null is a successful no-op for every kind.
    #[test]
    fn test_destroy_null() {
        unsafe {
            assert_eq!(mqc_destroy_connection_factory(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_connection(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_session(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_destination(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_message(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_producer(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_consumer(ptr::null_mut()), MqcStatus::Success);
            assert_eq!(mqc_destroy_queue_browser(ptr::null_mut()), MqcStatus::Success);
        }
    }

    /// Null handles are rejected with a generic error.
    #[test]
    fn test_null_handles() {
        let mut out = 0;
        unsafe {
            assert_eq!(mqc_start_connection(ptr::null_mut()), MqcStatus::Error);
            assert_eq!(
                mqc_get_message_type(ptr::null(), &mut out),
                MqcStatus::Error
            );
            assert_eq!(mqc_commit_session(ptr::null_mut()), MqcStatus::Error);
        }
    }

    /// Initialization can be repeated and brackets normal use.
    #[test]
    fn test_initialize() {
        assert_eq!(mqc_initialize(), MqcStatus::Success);
        assert_eq!(mqc_initialize(), MqcStatus::Success);
        let level = c("warn");
        assert_eq!(unsafe { mqc_init_logger(level.as_ptr()) }, MqcStatus::Success);
        assert_eq!(unsafe { mqc_init_logger(ptr::null()) }, MqcStatus::Success);
    }
}

mod connections {
    use super::*;

    /// Unsupported schemes fail and leave the output untouched.
    #[test]
    fn test_bad_uri() {
        let uri = c("tcp://localhost:61616");
        let mut factory = ptr::null_mut();
        let status = unsafe {
            mqc_create_connection_factory(uri.as_ptr(), ptr::null(), ptr::null(), &mut factory)
        };
        assert_eq!(status, MqcStatus::Error);
        assert!(factory.is_null());
    }

    /// A broker that does not exist refuses connections when `create=false`.
    #[test]
    fn test_refused() {
        let uri = c("vm://ffi-refused?create=false");
        let mut factory = ptr::null_mut();
        let mut connection = ptr::null_mut();
        unsafe {
            assert_eq!(
                mqc_create_connection_factory(uri.as_ptr(), ptr::null(), ptr::null(), &mut factory),
                MqcStatus::Success
            );
            assert_eq!(
                mqc_create_default_connection(factory, &mut connection),
                MqcStatus::Error
            );
            assert!(connection.is_null());
            mqc_destroy_connection_factory(factory);
        }
    }

    /// Wrong credentials fail with `SECURITY_ERROR`.
    #[test]
    fn test_credentials() {
        let uri = c("vm://ffi-secured?broker.username=admin&broker.password=secret");
        let (user, good, bad) = (c("admin"), c("secret"), c("guess"));
        let mut factory = ptr::null_mut();
        let mut connection = ptr::null_mut();
        unsafe {
            assert_eq!(
                mqc_create_connection_factory(uri.as_ptr(), ptr::null(), ptr::null(), &mut factory),
                MqcStatus::Success
            );
            assert_eq!(
                mqc_create_connection(
                    factory,
                    user.as_ptr(),
                    good.as_ptr(),
                    ptr::null(),
                    &mut connection
                ),
                MqcStatus::Success
            );
            let mut refused = ptr::null_mut();
            assert_eq!(
                mqc_create_connection(
                    factory,
                    user.as_ptr(),
                    bad.as_ptr(),
                    ptr::null(),
                    &mut refused
                ),
                MqcStatus::SecurityError
            );
            assert!(refused.is_null());
            mqc_destroy_connection(connection);
            mqc_destroy_connection_factory(factory);
        }
    }

    /// The client id is settable until the connection is started.
    #[test]
    fn test_client_id() {
        let fx_uri = c("vm://ffi-client-id");
        let id = c("subscriber-1");
        let mut factory = ptr::null_mut();
        let mut connection = ptr::null_mut();
        let mut buf = [0 as c_char; 64];
        unsafe {
            mqc_create_connection_factory(fx_uri.as_ptr(), ptr::null(), ptr::null(), &mut factory);
            mqc_create_default_connection(factory, &mut connection);

            assert_eq!(
                mqc_set_connection_client_id(connection, id.as_ptr()),
                MqcStatus::Success
            );
            assert_eq!(
                mqc_get_connection_client_id(connection, buf.as_mut_ptr(), buf.len()),
                MqcStatus::Success
            );
            assert_eq!(read_c(&buf), "subscriber-1");

            assert_eq!(mqc_start_connection(connection), MqcStatus::Success);
            let late = c("late");
            assert_eq!(
                mqc_set_connection_client_id(connection, late.as_ptr()),
                MqcStatus::IllegalState
            );

            mqc_destroy_connection(connection);
            mqc_destroy_connection_factory(factory);
        }
    }

    /// The id getter writes nothing when the buffer is too small.
    #[test]
    fn test_client_id_buffer_too_small() {
        let fx = Fixture::new("ffi-client-id-small");
        let mut buf = [b'x' as c_char; 4];
        let status =
            unsafe { mqc_get_connection_client_id(fx.connection, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(status, MqcStatus::Error);
        assert!(buf.iter().all(|&b| b == b'x' as c_char));
    }

    /// Failed connection calls are kept for `mqc_get_error_string`.
    #[test]
    fn test_error_string() {
        let fx = Fixture::new("ffi-error-string");
        let mut buf = [0 as c_char; 128];
        unsafe {
            assert!(mqc_get_error_string(fx.connection, buf.as_mut_ptr(), buf.len()).is_null());

            // The session fixed the client id.
            let id = c("too-late");
            assert_eq!(
                mqc_set_connection_client_id(fx.connection, id.as_ptr()),
                MqcStatus::IllegalState
            );
            let out = mqc_get_error_string(fx.connection, buf.as_mut_ptr(), buf.len());
            assert_eq!(out, buf.as_ptr());
            assert!(!read_c(&buf).is_empty());

            let mut short = [0 as c_char; 5];
            let out = mqc_get_error_string(fx.connection, short.as_mut_ptr(), short.len());
            assert!(!out.is_null());
            assert_eq!(read_c(&short).len(), 4);

            assert!(mqc_get_error_string(fx.connection, buf.as_mut_ptr(), 0).is_null());
            assert!(mqc_get_error_string(fx.connection, ptr::null_mut(), 16).is_null());
        }
    }

    /// Close is terminal.
    #[test]
    fn test_close() {
        let fx = Fixture::new("ffi-close");
        unsafe {
            assert_eq!(mqc_close_connection(fx.connection), MqcStatus::Success);
            assert_eq!(mqc_start_connection(fx.connection), MqcStatus::IllegalState);
            let mut session = ptr::null_mut();
            assert_eq!(
                mqc_create_default_session(fx.connection, &mut session),
                MqcStatus::IllegalState
            );
            assert!(session.is_null());
        }
    }
}

mod sessions {
    use super::*;

    /// Every acknowledgement mode is accepted; anything else is not.
    #[test]
    fn test_ack_modes() {
        let fx = Fixture::new("ffi-ack-modes");
        for mode in [
            MQC_ACK_AUTO,
            MQC_ACK_DUPS_OK,
            MQC_ACK_CLIENT,
            MQC_ACK_TRANSACTED,
            MQC_ACK_INDIVIDUAL,
        ] {
            let mut session = ptr::null_mut();
            unsafe {
                assert_eq!(
                    mqc_create_session(fx.connection, mode, &mut session),
                    MqcStatus::Success
                );
                let mut reported = -1;
                mqc_get_session_acknowledge_mode(session, &mut reported);
                assert_eq!(reported, mode);
                let mut transacted = -1;
                mqc_is_session_transacted(session, &mut transacted);
                assert_eq!(transacted, i32::from(mode == MQC_ACK_TRANSACTED));
                mqc_destroy_session(session);
            }
        }
        for mode in [-1, 5, 42] {
            let mut session = ptr::null_mut();
            let status = unsafe { mqc_create_session(fx.connection, mode, &mut session) };
            assert_eq!(status, MqcStatus::UnknownAckType);
            assert!(session.is_null());
        }
    }

    /// Transaction calls need a transacted session; recover needs the opposite.
    #[test]
    fn test_transaction_mode_checks() {
        let auto = Fixture::new("ffi-tx-checks");
        let transacted = Fixture::with_ack("ffi-tx-checks", MQC_ACK_TRANSACTED);
        unsafe {
            assert_eq!(mqc_commit_session(auto.session), MqcStatus::IllegalState);
            assert_eq!(mqc_rollback_session(auto.session), MqcStatus::IllegalState);
            assert_eq!(mqc_recover_session(auto.session), MqcStatus::Success);
            assert_eq!(mqc_commit_session(transacted.session), MqcStatus::Success);
            assert_eq!(mqc_recover_session(transacted.session), MqcStatus::IllegalState);
        }
    }

    /// Unsubscribing an unknown name fails with `INVALID_DESTINATION`.
    #[test]
    fn test_unsubscribe_unknown() {
        let fx = Fixture::new("ffi-unsubscribe");
        let name = c("nobody");
        let status = unsafe { mqc_unsubscribe_durable_consumer(fx.session, name.as_ptr()) };
        assert_eq!(status, MqcStatus::InvalidDestination);
    }

    /// A closed session refuses further work.
    #[test]
    fn test_close() {
        let fx = Fixture::new("ffi-session-close");
        unsafe {
            assert_eq!(mqc_close_session(fx.session), MqcStatus::Success);
            let mut message = ptr::null_mut();
            assert_eq!(
                mqc_create_message(fx.session, &mut message),
                MqcStatus::IllegalState
            );
        }
    }
}

mod destinations {
    use super::*;

    /// Probes follow the destination type.
    #[test]
    fn test_probes() {
        let fx = Fixture::new("ffi-destination-probes");
        let queue = fx.queue("orders");
        let topic = fx.topic("prices");
        let mut temp = ptr::null_mut();
        let (mut is_topic, mut is_queue, mut is_temp) = (-1, -1, -1);
        unsafe {
            assert_eq!(
                mqc_create_temporary_destination(
                    fx.session,
                    MQC_DESTINATION_TEMPORARY_QUEUE,
                    &mut temp
                ),
                MqcStatus::Success
            );

            mqc_is_destination_topic(queue, &mut is_topic);
            mqc_is_destination_queue(queue, &mut is_queue);
            mqc_is_destination_temporary(queue, &mut is_temp);
            assert_eq!((is_topic, is_queue, is_temp), (0, 1, 0));

            mqc_is_destination_topic(topic, &mut is_topic);
            mqc_is_destination_queue(topic, &mut is_queue);
            assert_eq!((is_topic, is_queue), (1, 0));

            mqc_is_destination_queue(temp, &mut is_queue);
            mqc_is_destination_temporary(temp, &mut is_temp);
            assert_eq!((is_queue, is_temp), (1, 1));

            let mut buf = [0 as c_char; 32];
            mqc_get_destination_name(queue, buf.as_mut_ptr(), buf.len());
            assert_eq!(read_c(&buf), "orders");

            mqc_destroy_destination(temp);
            mqc_destroy_destination(topic);
            mqc_destroy_destination(queue);
        }
    }

    /// Destinations compare by value.
    #[test]
    fn test_compare() {
        let fx = Fixture::new("ffi-destination-compare");
        let a = fx.queue("same");
        let b = fx.queue("same");
        let t = fx.topic("same");
        let mut equal = -1;
        unsafe {
            mqc_compare_destinations(a, b, &mut equal);
            assert_eq!(equal, 1);
            mqc_compare_destinations(a, t, &mut equal);
            assert_eq!(equal, 0);
            mqc_destroy_destination(a);
            mqc_destroy_destination(b);
            mqc_destroy_destination(t);
        }
    }

    /// Bad types and missing names are rejected.
    #[test]
    fn test_rejects() {
        let fx = Fixture::new("ffi-destination-rejects");
        let name = c("x");
        let mut out = ptr::null_mut();
        unsafe {
            assert_eq!(
                mqc_create_destination(fx.session, MQC_DESTINATION_QUEUE, ptr::null(), &mut out),
                MqcStatus::Error
            );
            assert_eq!(
                mqc_create_destination(fx.session, 9, name.as_ptr(), &mut out),
                MqcStatus::Error
            );
            assert_eq!(
                mqc_create_temporary_destination(fx.session, MQC_DESTINATION_TOPIC, &mut out),
                MqcStatus::Error
            );
            assert!(out.is_null());

            // Temporary types ignore the name.
            assert_eq!(
                mqc_create_destination(
                    fx.session,
                    MQC_DESTINATION_TEMPORARY_TOPIC,
                    name.as_ptr(),
                    &mut out
                ),
                MqcStatus::Success
            );
            mqc_destroy_destination(out);
        }
    }
}
