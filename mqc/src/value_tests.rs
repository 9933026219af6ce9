//! Tests for typed values and their conversions.

use super::*;

mod conversions {
    use super::*;

    /// Integers widen to every wider integer type.
    #[test]
    fn test_integer_widening() {
        let v = Value::Byte(-7);
        assert_eq!(v.as_short().unwrap(), -7);
        assert_eq!(v.as_int().unwrap(), -7);
        assert_eq!(v.as_long().unwrap(), -7);

        assert_eq!(Value::Int(70_000).as_long().unwrap(), 70_000);
    }

    /// Narrowing reads are format errors.
    #[test]
    fn test_integer_narrowing_rejected() {
        assert!(matches!(
            Value::Long(1).as_int(),
            Err(Error::MessageFormat(_))
        ));
        assert!(matches!(
            Value::Int(1).as_byte(),
            Err(Error::MessageFormat(_))
        ));
    }

    /// Strings parse into numbers and booleans.
    #[test]
    fn test_string_parsing() {
        assert_eq!(Value::from("42").as_int().unwrap(), 42);
        assert_eq!(Value::from(" 3.5 ").as_double().unwrap(), 3.5);
        assert!(Value::from("TRUE").as_bool().unwrap());
        assert!(!Value::from("yes").as_bool().unwrap());
        assert!(matches!(
            Value::from("forty").as_int(),
            Err(Error::MessageFormat(_))
        ));
    }

    /// Every primitive reads back as a string.
    #[test]
    fn test_to_string() {
        assert_eq!(Value::Bool(true).as_string().unwrap(), "true");
        assert_eq!(Value::Long(45).as_string().unwrap(), "45");
        assert_eq!(Value::Char(u16::from(b'x')).as_string().unwrap(), "x");
        assert!(Value::Bytes(vec![1]).as_string().is_err());
    }

    /// Float widens to double but not the other way round.
    #[test]
    fn test_float_double() {
        assert_eq!(Value::Float(1.5).as_double().unwrap(), 1.5);
        assert!(Value::Double(1.5).as_float().is_err());
        assert!(Value::Int(1).as_double().is_err());
    }
}

mod value_map {
    use super::*;

    /// Missing booleans and strings read as defaults, numbers do not.
    #[test]
    fn test_missing_names() {
        let map = ValueMap::new();
        assert!(!map.get_bool("absent").unwrap());
        assert_eq!(map.get_string("absent").unwrap(), "");
        assert!(matches!(map.get_int("absent"), Err(Error::MessageFormat(_))));
    }

    /// Names are listed in sorted order and cleared together.
    #[test]
    fn test_names_and_clear() {
        let mut map = ValueMap::new();
        map.set("b", true);
        map.set("a", 1_i32);
        map.set("c", "text");
        assert_eq!(map.len(), 3);
        assert_eq!(map.names(), vec!["a", "b", "c"]);
        assert!(map.contains("c"));

        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains("c"));
    }

    /// Setting an existing name replaces its value and type.
    #[test]
    fn test_replace() {
        let mut map = ValueMap::new();
        map.set("k", 1_i32);
        map.set("k", "one");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_string("k").unwrap(), "one");
        assert!(map.get_int("k").is_err());
    }
}
