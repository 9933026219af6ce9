//! Tests for selector parsing and evaluation.

use super::*;

fn order(kind: &str, qty: i32) -> Message {
    let mut message = Message::text("payload");
    message.set_property("kind", kind).unwrap();
    message.set_property("qty", qty).unwrap();
    message.set_property("price", 2.5_f64).unwrap();
    message.set_message_type("order");
    message
}

fn selects(selector: &str, message: &Message) -> bool {
    Selector::parse(selector).unwrap().matches(message)
}

mod parsing {
    use super::*;

    /// Malformed expressions are rejected as invalid selectors.
    #[test]
    fn test_invalid_selectors() {
        for bad in [
            "qty >",
            "kind = 'open",
            "(qty = 1",
            "qty = 1 1",
            "kind LIKE 5",
            "qty NOT 3",
            "1 + 2",
            "kind IN ()",
            "qty # 3",
        ] {
            assert!(
                matches!(Selector::parse(bad), Err(Error::InvalidSelector(_))),
                "{bad} should be rejected"
            );
        }
    }

    /// Blank selectors mean no selector at all.
    #[test]
    fn test_optional_blank() {
        assert!(Selector::parse_optional(None).unwrap().is_none());
        assert!(Selector::parse_optional(Some("  ")).unwrap().is_none());
        let selector = Selector::parse_optional(Some("qty > 1")).unwrap().unwrap();
        assert_eq!(selector.source(), "qty > 1");
    }

    /// Keywords are case-insensitive.
    #[test]
    fn test_keyword_case() {
        let message = order("book", 3);
        assert!(selects("kind = 'book' and qty between 1 AND 5", &message));
        assert!(selects("NoT (qty < 1)", &message));
    }
}

mod evaluation {
    use super::*;

    /// Comparisons on numbers widen across integer and floating types.
    #[test]
    fn test_numeric_comparisons() {
        let message = order("book", 3);
        assert!(selects("qty = 3", &message));
        assert!(selects("qty <> 4", &message));
        assert!(selects("price > 2", &message));
        assert!(selects("qty * 2 >= 6.0", &message));
        assert!(selects("-qty < 0", &message));
        assert!(!selects("qty / 0 = 0", &message));
    }

    /// Strings support only equality, LIKE and IN.
    #[test]
    fn test_string_predicates() {
        let message = order("book_store", 1);
        assert!(selects("kind = 'book_store'", &message));
        assert!(selects("kind LIKE 'book%'", &message));
        assert!(selects("kind LIKE 'b__k%'", &message));
        assert!(selects("kind LIKE 'book\\_%' ESCAPE '\\'", &message));
        assert!(!selects("kind LIKE 'bookX%' ESCAPE 'X'", &message));
        assert!(selects("kind NOT LIKE 'c%'", &message));
        assert!(selects("kind IN ('pen', 'book_store')", &message));
        assert!(selects("kind NOT IN ('pen')", &message));
        assert!(!selects("kind > 'a'", &message));
    }

    /// Missing properties are NULL and make comparisons unknown.
    #[test]
    fn test_null_semantics() {
        let message = order("book", 1);
        assert!(selects("missing IS NULL", &message));
        assert!(selects("kind IS NOT NULL", &message));
        assert!(!selects("missing = 1", &message));
        assert!(!selects("NOT (missing = 1)", &message));
        assert!(selects("missing = 1 OR qty = 1", &message));
        assert!(!selects("missing = 1 AND qty = 1", &message));
    }

    /// Headers are visible under their JMS names.
    #[test]
    fn test_header_identifiers() {
        let message = order("book", 1);
        assert!(selects("JMSType = 'order'", &message));
        assert!(selects("JMSPriority = 4", &message));
        assert!(selects("JMSDeliveryMode = 'PERSISTENT'", &message));
    }

    /// Boolean properties and literals take part in logic directly.
    #[test]
    fn test_boolean_identifiers() {
        let mut message = Message::new();
        message.set_property("urgent", true).unwrap();
        assert!(selects("urgent", &message));
        assert!(selects("urgent = TRUE", &message));
        assert!(!selects("NOT urgent", &message));
        assert!(selects("TRUE", &message));
    }
}
