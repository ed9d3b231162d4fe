//! Property tests for the value marshaler.

use std::collections::HashMap;

use proptest::prelude::*;

use luahost::{to_native, to_script, will_produce_table, HostValue, ScriptValue};

proptest! {
    /// Every string-keyed map converts, with exactly one mapping entry per
    /// source entry.
    #[test]
    fn string_keyed_maps_preserve_entries(m in proptest::collection::hash_map("[a-z]{1,8}", any::<i32>(), 0..16)) {
        let converted = to_script(&m).unwrap();
        let table = match converted {
            ScriptValue::Table(t) => t,
            other => panic!("expected table, got {other:?}"),
        };
        prop_assert!(table.seq.is_empty());
        prop_assert_eq!(table.map.len(), m.len());
        for (k, v) in &m {
            prop_assert_eq!(table.map.get(k), Some(&ScriptValue::Number(f64::from(*v))));
        }
    }

    /// Maps with integer keys always fail, whatever the values.
    #[test]
    fn integer_keyed_maps_are_rejected(m in proptest::collection::hash_map(any::<i64>(), "[a-z]{0,4}", 1..8)) {
        prop_assert!(to_script(&m).is_err());
    }

    /// Sequences keep their length and order.
    #[test]
    fn sequences_preserve_length_and_order(v in proptest::collection::vec("[a-z]{0,6}", 0..32)) {
        let table = match to_script(&v).unwrap() {
            ScriptValue::Table(t) => t,
            other => panic!("expected table, got {other:?}"),
        };
        prop_assert_eq!(table.seq.len(), v.len());
        for (i, s) in v.iter().enumerate() {
            prop_assert_eq!(&table.seq[i], &ScriptValue::Str(s.clone()));
        }
    }

    /// Strings pass through unchanged.
    #[test]
    fn strings_pass_through(s in "\\PC*") {
        prop_assert_eq!(to_script(s.as_str()).unwrap(), ScriptValue::Str(s));
    }

    /// Scalars never classify as tables; composites always do.
    #[test]
    fn table_predicate_matches_shape(n in any::<i64>(), v in proptest::collection::vec(any::<u8>(), 0..4)) {
        prop_assert!(!will_produce_table(&n));
        prop_assert!(will_produce_table(&v));
        let mut m = HashMap::new();
        m.insert("k".to_owned(), n);
        prop_assert!(will_produce_table(&m));
    }

    /// A table whose mapping part holds only strings converts back to a
    /// sequence of exactly those strings.
    #[test]
    fn all_string_tables_convert_back(m in proptest::collection::hash_map("[a-z]{1,8}", "[a-z]{0,8}", 0..16)) {
        let table = to_script(&m).unwrap();
        match to_native(&table).unwrap() {
            HostValue::Seq(mut values) => {
                let mut expected: Vec<String> = m.values().cloned().collect();
                values.sort();
                expected.sort();
                prop_assert_eq!(values, expected);
            }
            other => panic!("expected seq, got {other:?}"),
        }
    }

    /// Numbers narrow to integers on the way back out.
    #[test]
    fn numbers_narrow_on_the_way_back(n in any::<i32>()) {
        let sv = to_script(&n).unwrap();
        prop_assert_eq!(to_native(&sv).unwrap(), HostValue::Int(i64::from(n)));
    }
}
