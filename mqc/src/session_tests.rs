//! Tests for sessions, producers, consumers and browsers working together.

use std::time::Duration;

use super::*;
use crate::connection::{Connection, ConnectionFactory};
use crate::types::DeliveryMode;

const WAIT: Duration = Duration::from_secs(2);

fn started(broker: &str) -> Connection {
    let connection = ConnectionFactory::new(&format!("vm://{broker}"))
        .unwrap()
        .create_connection()
        .unwrap();
    connection.start().unwrap();
    connection
}

fn send_text(producer: &Producer, text: &str) {
    producer.send(&mut Message::text(text)).unwrap();
}

async fn next_text(consumer: &Consumer) -> String {
    consumer
        .receive_timeout(WAIT)
        .await
        .unwrap()
        .expect("message expected")
        .get_text()
        .unwrap()
        .to_owned()
}

mod delivery {
    use super::*;

    /// Sent messages arrive with the headers the producer stamped.
    #[tokio::test]
    async fn test_queue_round_trip() {
        let connection = started("session-round-trip");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let queue = session.create_queue("orders").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();

        let mut message = session.create_text_message("hello").unwrap();
        message.set_property("n", 1_i32).unwrap();
        producer.send(&mut message).unwrap();
        assert!(!message.message_id().is_empty());

        let received = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        assert_eq!(received.get_text().unwrap(), "hello");
        assert_eq!(received.message_id(), message.message_id());
        assert_eq!(received.destination(), Some(&queue));
        assert!(received.timestamp() > 0);
        assert!(matches!(
            received.clone().set_property("n", 2_i32),
            Err(Error::MessageNotWriteable)
        ));
    }

    /// Nothing is delivered while the connection is stopped.
    #[tokio::test]
    async fn test_stopped_connection_holds_delivery() {
        let connection = started("session-stopped");
        connection.stop().unwrap();
        let session = connection.create_session(AckMode::Auto).unwrap();
        let queue = session.create_queue("q").unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();
        send_text(&session.create_producer(Some(&queue)).unwrap(), "held");

        assert!(consumer.receive_no_wait().unwrap().is_none());
        assert!(
            consumer
                .receive_timeout(Duration::from_millis(50))
                .await
                .unwrap()
                .is_none()
        );
        connection.start().unwrap();
        assert_eq!(next_text(&consumer).await, "held");
    }

    /// An empty queue times out after roughly the requested wait.
    #[tokio::test]
    async fn test_receive_timeout() {
        let connection = started("session-timeout");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let consumer = session
            .create_consumer(&Destination::queue("empty"), None, false)
            .unwrap();
        let begin = std::time::Instant::now();
        let received = consumer
            .receive_timeout(Duration::from_millis(100))
            .await
            .unwrap();
        assert!(received.is_none());
        assert!(begin.elapsed() >= Duration::from_millis(100));
    }

    /// Closing a consumer wakes a blocked receive.
    #[tokio::test]
    async fn test_close_wakes_receive() {
        let connection = started("session-close-wakes");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let consumer = std::sync::Arc::new(
            session
                .create_consumer(&Destination::queue("q"), None, false)
                .unwrap(),
        );
        let waiter = {
            let consumer = std::sync::Arc::clone(&consumer);
            tokio::spawn(async move { consumer.receive().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        consumer.close();
        assert!(waiter.await.unwrap().unwrap().is_none());
        assert!(matches!(
            consumer.receive_no_wait(),
            Err(Error::IllegalState(_))
        ));
    }

    /// Queue consumers only take messages their selector accepts.
    #[tokio::test]
    async fn test_queue_selector() {
        let connection = started("session-selector");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let reds = session
            .create_consumer(&queue, Some("color = 'red'"), false)
            .unwrap();
        assert_eq!(reds.message_selector(), Some("color = 'red'"));

        for color in ["blue", "red"] {
            let mut message = Message::text(color);
            message.set_property("color", color).unwrap();
            producer.send(&mut message).unwrap();
        }
        assert_eq!(next_text(&reds).await, "red");
        assert!(reds.receive_no_wait().unwrap().is_none());

        assert!(matches!(
            session.create_consumer(&queue, Some("color ="), false),
            Err(Error::InvalidSelector(_))
        ));
    }

    /// Expired messages are never delivered.
    #[tokio::test]
    async fn test_time_to_live() {
        let connection = started("session-ttl");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();

        producer.set_time_to_live(1).unwrap();
        send_text(&producer, "short-lived");
        tokio::time::sleep(Duration::from_millis(20)).await;
        producer.set_time_to_live(0).unwrap();
        send_text(&producer, "kept");
        assert_eq!(next_text(&consumer).await, "kept");
    }
}

mod topics {
    use super::*;

    /// No-local consumers skip their own connection's publications.
    #[tokio::test]
    async fn test_no_local() {
        let local = started("topic-no-local");
        let remote = started("topic-no-local");
        let local_session = local.create_session(AckMode::Auto).unwrap();
        let remote_session = remote.create_session(AckMode::Auto).unwrap();
        let topic = local_session.create_topic("news").unwrap();

        let everything = local_session.create_consumer(&topic, None, false).unwrap();
        let others_only = local_session.create_consumer(&topic, None, true).unwrap();

        send_text(&local_session.create_producer(Some(&topic)).unwrap(), "mine");
        send_text(&remote_session.create_producer(Some(&topic)).unwrap(), "theirs");

        assert_eq!(next_text(&everything).await, "mine");
        assert_eq!(next_text(&everything).await, "theirs");
        assert_eq!(next_text(&others_only).await, "theirs");
        assert!(others_only.receive_no_wait().unwrap().is_none());
    }

    /// Durable subscriptions keep messages while no consumer is attached.
    #[tokio::test]
    async fn test_durable_subscription() {
        let connection = started("topic-durable");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let topic = session.create_topic("events").unwrap();
        let producer = session.create_producer(Some(&topic)).unwrap();

        let consumer = session
            .create_durable_consumer(&topic, "audit", None, false)
            .unwrap();
        assert!(matches!(
            session.create_durable_consumer(&topic, "audit", None, false),
            Err(Error::IllegalState(_))
        ));
        assert!(matches!(session.unsubscribe("audit"), Err(Error::IllegalState(_))));
        consumer.close();

        send_text(&producer, "while away");
        let consumer = session
            .create_durable_consumer(&topic, "audit", None, false)
            .unwrap();
        assert_eq!(next_text(&consumer).await, "while away");
        consumer.close();

        session.unsubscribe("audit").unwrap();
        assert!(matches!(
            session.unsubscribe("audit"),
            Err(Error::InvalidDestination(_))
        ));
    }

    /// Durable consumers need a regular topic.
    #[test]
    fn test_durable_on_queue() {
        let connection = started("topic-durable-queue");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let queue = session.create_queue("q").unwrap();
        assert!(matches!(
            session.create_durable_consumer(&queue, "sub", None, false),
            Err(Error::InvalidDestination(_))
        ));
    }
}

mod acknowledgement {
    use super::*;

    /// Recover redelivers everything not yet acknowledged in client mode.
    #[tokio::test]
    async fn test_client_ack_and_recover() {
        let connection = started("ack-client");
        let session = connection.create_session(AckMode::Client).unwrap();
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();
        send_text(&producer, "a");
        send_text(&producer, "b");

        let a = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        let _b = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        session.recover().unwrap();

        let again = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        assert_eq!(again.get_text().unwrap(), "a");
        assert!(again.redelivered());
        assert!(!a.redelivered());
        let b = consumer.receive_timeout(WAIT).await.unwrap().unwrap();

        // Acknowledging the last one covers the first as well.
        b.acknowledge().unwrap();
        session.recover().unwrap();
        assert!(consumer.receive_no_wait().unwrap().is_none());
    }

    /// Individual mode acknowledges only the given message.
    #[tokio::test]
    async fn test_individual_ack() {
        let connection = started("ack-individual");
        let session = connection.create_session(AckMode::Individual).unwrap();
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();
        send_text(&producer, "a");
        send_text(&producer, "b");

        let a = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        let _b = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        a.acknowledge().unwrap();
        session.recover().unwrap();
        assert_eq!(next_text(&consumer).await, "b");
    }

    /// Closing a client-ack session returns unacknowledged messages.
    #[tokio::test]
    async fn test_close_redelivers() {
        let connection = started("ack-close");
        let queue = Destination::queue("q");
        {
            let session = connection.create_session(AckMode::Client).unwrap();
            send_text(&session.create_producer(Some(&queue)).unwrap(), "pending");
            let consumer = session.create_consumer(&queue, None, false).unwrap();
            consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        }
        let session = connection.create_session(AckMode::Auto).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();
        let message = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        assert!(message.redelivered());
    }

    /// Acknowledging after the session closed is an illegal state.
    #[tokio::test]
    async fn test_ack_after_close() {
        let connection = started("ack-after-close");
        let session = connection.create_session(AckMode::Client).unwrap();
        let queue = session.create_queue("q").unwrap();
        send_text(&session.create_producer(Some(&queue)).unwrap(), "x");
        let consumer = session.create_consumer(&queue, None, false).unwrap();
        let message = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        session.close();
        assert!(matches!(message.acknowledge(), Err(Error::IllegalState(_))));
    }
}

mod transactions {
    use super::*;

    /// Sends become visible on commit; rolled-back sends never do.
    #[tokio::test]
    async fn test_commit_and_rollback() {
        let connection = started("tx-batch");
        let session = connection.create_session(AckMode::Transacted).unwrap();
        assert!(session.is_transacted());
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();

        for i in 0..50 {
            send_text(&producer, &format!("first {i}"));
        }
        assert!(consumer.receive_no_wait().unwrap().is_none());
        session.commit().unwrap();
        for i in 0..50 {
            assert_eq!(next_text(&consumer).await, format!("first {i}"));
        }
        session.commit().unwrap();

        for i in 0..50 {
            send_text(&producer, &format!("second {i}"));
        }
        session.rollback().unwrap();
        send_text(&producer, "after rollback");
        session.commit().unwrap();

        assert_eq!(next_text(&consumer).await, "after rollback");
        assert!(consumer.receive_no_wait().unwrap().is_none());
    }

    /// Rollback puts received messages back.
    #[tokio::test]
    async fn test_rollback_redelivers() {
        let connection = started("tx-redeliver");
        let session = connection.create_session(AckMode::Transacted).unwrap();
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        let consumer = session.create_consumer(&queue, None, false).unwrap();
        send_text(&producer, "once");
        session.commit().unwrap();

        assert_eq!(next_text(&consumer).await, "once");
        session.rollback().unwrap();
        let again = consumer.receive_timeout(WAIT).await.unwrap().unwrap();
        assert!(again.redelivered());
        session.commit().unwrap();
        assert!(consumer.receive_no_wait().unwrap().is_none());
    }

    /// Transaction and recovery calls are tied to the ack mode.
    #[test]
    fn test_mode_checks() {
        let connection = started("tx-modes");
        let auto = connection.create_session(AckMode::Auto).unwrap();
        assert!(matches!(auto.commit(), Err(Error::IllegalState(_))));
        assert!(matches!(auto.rollback(), Err(Error::IllegalState(_))));
        auto.recover().unwrap();

        let transacted = connection.create_session(AckMode::Transacted).unwrap();
        assert!(matches!(transacted.recover(), Err(Error::IllegalState(_))));
    }
}

mod producers {
    use super::*;

    /// Destination rules of bound and unbound producers.
    #[test]
    fn test_destination_rules() {
        let connection = started("producer-destinations");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let a = Destination::queue("a");
        let b = Destination::queue("b");
        let mode = DeliveryMode::Persistent;

        let unbound = session.create_producer(None).unwrap();
        assert!(matches!(
            unbound.send(&mut Message::new()),
            Err(Error::UnsupportedOperation(_))
        ));
        unbound.send_to(&a, &mut Message::new(), mode, 4, 0).unwrap();

        let bound = session.create_producer(Some(&a)).unwrap();
        bound.send_to(&a, &mut Message::new(), mode, 4, 0).unwrap();
        assert!(matches!(
            bound.send_to(&b, &mut Message::new(), mode, 4, 0),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    /// Configuration is validated and applied to sent messages.
    #[test]
    fn test_configuration() {
        let connection = started("producer-config");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let producer = session.create_producer(Some(&Destination::queue("q"))).unwrap();

        assert_eq!(producer.priority(), 4);
        assert!(producer.set_priority(10).is_err());
        assert!(producer.set_time_to_live(-1).is_err());
        producer.set_priority(7).unwrap();
        producer.set_delivery_mode(DeliveryMode::NonPersistent);
        producer.set_disable_message_id(true);
        producer.set_disable_message_timestamp(true);

        let mut message = Message::new();
        producer.send(&mut message).unwrap();
        assert_eq!(message.priority(), 7);
        assert_eq!(message.delivery_mode(), DeliveryMode::NonPersistent);
        assert_eq!(message.message_id(), "");
        assert_eq!(message.timestamp(), 0);
        assert_eq!(message.expiration(), 0);

        producer.close();
        assert!(matches!(
            producer.send(&mut message),
            Err(Error::IllegalState(_))
        ));
    }
}

mod browsing {
    use super::*;

    /// Browsing leaves messages on the queue.
    #[tokio::test]
    async fn test_browse_does_not_consume() {
        let connection = started("browse-queue");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let queue = session.create_queue("q").unwrap();
        let producer = session.create_producer(Some(&queue)).unwrap();
        send_text(&producer, "one");
        send_text(&producer, "two");

        let browser = session.create_browser(&queue, None).unwrap();
        let mut seen = Vec::new();
        while browser.has_more_messages().unwrap() {
            let message = browser.next_message().unwrap().unwrap();
            seen.push(message.get_text().unwrap().to_owned());
        }
        assert_eq!(seen, ["one", "two"]);
        assert!(browser.next_message().unwrap().is_none());

        let consumer = session.create_consumer(&queue, None, false).unwrap();
        assert_eq!(next_text(&consumer).await, "one");
    }

    /// Only queues can be browsed.
    #[test]
    fn test_browse_topic() {
        let connection = started("browse-topic");
        let session = connection.create_session(AckMode::Auto).unwrap();
        assert!(matches!(
            session.create_browser(&Destination::topic("t"), None),
            Err(Error::InvalidDestination(_))
        ));
    }
}

mod closing {
    use super::*;

    /// A message taken just as the session closed goes back to its store
    /// instead of reaching the application.
    #[test]
    fn test_delivery_after_close_is_requeued() {
        let connection = started("closing-late-delivery");
        let session = connection.create_session(AckMode::Client).unwrap();
        let store = Arc::new(MessageStore::default());
        store.push(Message::text("late"), connection.id());
        let envelope = store.take(None).unwrap();

        session.close();
        assert!(session.core.deliver(&store, envelope).is_none());

        let back = store.take(None).expect("message requeued");
        assert_eq!(back.message.get_text().unwrap(), "late");
        assert!(!back.message.redelivered());
    }

    /// Closing the session from another thread ends a receive that waits
    /// forever.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_close_wakes_receive() {
        let connection = started("closing-session-wakes");
        let session = connection.create_session(AckMode::Auto).unwrap();
        let consumer = session
            .create_consumer(&Destination::queue("q"), None, false)
            .unwrap();
        let waiter = tokio::spawn(async move { consumer.receive().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::task::spawn_blocking(move || session.close())
            .await
            .unwrap();
        let received = tokio::time::timeout(WAIT, waiter)
            .await
            .expect("receive returned")
            .unwrap()
            .unwrap();
        assert!(received.is_none());
    }

    /// Closing the connection from another thread ends a receive that waits
    /// forever.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_close_wakes_receive() {
        let connection = started("closing-connection-wakes");
        let session = connection.create_session(AckMode::Client).unwrap();
        let consumer = session
            .create_consumer(&Destination::queue("q"), None, false)
            .unwrap();
        let waiter = tokio::spawn(async move { consumer.receive().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::task::spawn_blocking(move || connection.close())
            .await
            .unwrap();
        let received = tokio::time::timeout(WAIT, waiter)
            .await
            .expect("receive returned")
            .unwrap()
            .unwrap();
        assert!(received.is_none());
        drop(session);
    }
}
