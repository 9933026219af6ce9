//! Tests for connection factories and connection lifecycle.

use super::*;
use crate::message::Message;

fn factory(broker: &str) -> ConnectionFactory {
    ConnectionFactory::new(&format!("vm://{broker}")).unwrap()
}

mod factories {
    use super::*;

    /// Connecting to a broker that is not running fails without `create`.
    #[test]
    fn test_no_create() {
        let factory = ConnectionFactory::new("vm://connection-no-create?create=false").unwrap();
        assert!(matches!(
            factory.create_connection(),
            Err(Error::ConnectionFailed(_))
        ));
    }

    /// A broker created with credentials refuses other users.
    #[test]
    fn test_credentials() {
        let uri = "vm://connection-secured?broker.username=admin&broker.password=pw";
        let good = ConnectionFactory::with_credentials(uri, "admin", "pw").unwrap();
        let _connection = good.create_connection().unwrap();

        let bad = ConnectionFactory::with_credentials(uri, "admin", "nope").unwrap();
        assert!(matches!(bad.create_connection(), Err(Error::Security(_))));
    }

    /// Unsupported schemes are rejected when the factory is built.
    #[test]
    fn test_bad_uri() {
        assert!(ConnectionFactory::new("tcp://localhost:61616").is_err());
    }
}

mod client_ids {
    use super::*;

    /// A generated id can be replaced until the connection is used.
    #[test]
    fn test_set_before_use() {
        let connection = factory("client-id-set").create_connection().unwrap();
        assert!(connection.client_id().unwrap().starts_with("ID:"));
        connection.set_client_id("app").unwrap();
        assert_eq!(connection.client_id().unwrap(), "app");

        connection.start().unwrap();
        assert!(matches!(
            connection.set_client_id("other"),
            Err(Error::IllegalState(_))
        ));
    }

    /// Creating a session also fixes the client id.
    #[test]
    fn test_frozen_by_session() {
        let connection = factory("client-id-session").create_connection().unwrap();
        let _session = connection.create_session(AckMode::Auto).unwrap();
        assert!(matches!(
            connection.set_client_id("late"),
            Err(Error::IllegalState(_))
        ));
    }

    /// Two open connections cannot share a client id; closing frees it.
    #[test]
    fn test_unique_per_broker() {
        let factory = factory("client-id-unique");
        let first = factory.create_connection_with("", "", Some("shared")).unwrap();
        assert!(matches!(
            factory.create_connection_with("", "", Some("shared")),
            Err(Error::InvalidClientId(_))
        ));
        let second = factory.create_connection().unwrap();
        assert!(matches!(
            second.set_client_id("shared"),
            Err(Error::InvalidClientId(_))
        ));
        assert!(matches!(second.set_client_id(""), Err(Error::InvalidClientId(_))));

        first.close();
        second.set_client_id("shared").unwrap();
    }

    /// Ids given at creation are fixed.
    #[test]
    fn test_explicit_is_fixed() {
        let factory = ConnectionFactory::new("vm://client-id-uri?jms.clientID=fixed").unwrap();
        let connection = factory.create_connection().unwrap();
        assert_eq!(connection.client_id().unwrap(), "fixed");
        assert!(matches!(
            connection.set_client_id("other"),
            Err(Error::IllegalState(_))
        ));
    }
}

mod lifecycle {
    use super::*;

    /// Close is terminal and idempotent.
    #[test]
    fn test_close_is_terminal() {
        let connection = factory("lifecycle-close").create_connection().unwrap();
        connection.start().unwrap();
        connection.stop().unwrap();
        assert_eq!(connection.state(), ConnectionState::Stopped);

        connection.close();
        connection.close();
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(matches!(connection.start(), Err(Error::IllegalState(_))));
        assert!(matches!(connection.client_id(), Err(Error::IllegalState(_))));
        assert!(matches!(
            connection.create_session(AckMode::Auto),
            Err(Error::IllegalState(_))
        ));
    }

    /// Closing a connection closes its sessions.
    #[test]
    fn test_close_closes_sessions() {
        let connection = factory("lifecycle-sessions").create_connection().unwrap();
        let session = connection.create_session(AckMode::Auto).unwrap();
        connection.close();
        assert!(matches!(
            session.create_queue("q"),
            Err(Error::IllegalState(_))
        ));
    }

    /// Temporary destinations are private to their connection and deleted
    /// with it.
    #[test]
    fn test_temporary_destinations() {
        let factory = factory("lifecycle-temporary");
        let owner = factory.create_connection().unwrap();
        let other = factory.create_connection().unwrap();
        let owner_session = owner.create_session(AckMode::Auto).unwrap();
        let other_session = other.create_session(AckMode::Auto).unwrap();

        let temp = owner_session.create_temporary_queue().unwrap();
        assert!(temp.is_temporary());
        assert!(temp.name().starts_with(owner.id()));
        assert!(matches!(
            other_session.create_consumer(&temp, None, false),
            Err(Error::InvalidDestination(_))
        ));

        let producer = other_session.create_producer(Some(&temp)).unwrap();
        producer.send(&mut Message::text("reply")).unwrap();

        owner.close();
        assert!(matches!(
            producer.send(&mut Message::text("late")),
            Err(Error::InvalidDestination(_))
        ));
    }
}
