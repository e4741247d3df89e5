//! Property tests for the binder.

mod common;

use std::collections::BTreeSet;

use proptest::collection::hash_map;
use proptest::option;
use proptest::prelude::*;

use cinch::prelude::*;

use common::{Mapped, Scaled, Sum, MIRRORED_KEYS};

fn small() -> impl Strategy<Value = i64> {
    -10i64..=10
}

fn key() -> impl Strategy<Value = String> {
    prop_oneof![Just("foo"), Just("bar"), Just("baz")].prop_map(String::from)
}

proptest! {
    #[test]
    fn failed_completion_leaves_value_untouched(a in small(), b in small(), c in small()) {
        let ctx = Context::new();
        let original = Sum::new(a, b, c);
        let mut sum = original.clone();
        match ctx.complete(&mut sum) {
            Ok(()) => {
                prop_assert_eq!(sum.a + sum.b, sum.c);
                prop_assert!(sum.c >= 5);
            }
            Err(_) => prop_assert_eq!(sum, original),
        }
    }

    #[test]
    fn valid_values_unify_to_themselves(a in 1i64..50, b in 1i64..50) {
        prop_assume!(a + b >= 5);
        let ctx = Context::new();
        let sum = Sum::new(a, b, a + b);
        prop_assert!(ctx.validate(&sum).is_ok());

        let result = ctx.evaluate(&sum).unwrap();
        prop_assert!(result.is_concrete());
        let encoded = sum.encode().unwrap();
        prop_assert_eq!(result.value(), encoded.as_ref());
    }

    #[test]
    fn map_keys_survive_completion(entries in hash_map(key(), option::of(small()), 0..3)) {
        let mut ctx = Context::new();
        ctx.constrain_type::<Mapped>(MIRRORED_KEYS).unwrap();

        let mut mapped = Mapped { m: entries };
        let before: BTreeSet<String> = mapped.m.keys().cloned().collect();
        let _ = ctx.complete(&mut mapped);
        let after: BTreeSet<String> = mapped.m.keys().cloned().collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn unset_factor_takes_its_default(base in -1000i64..1000) {
        let ctx = Context::new();
        let mut scaled = Scaled { factor: 0, base, scaled: 0 };
        ctx.complete(&mut scaled).unwrap();
        prop_assert_eq!(scaled.factor, 3);
        prop_assert_eq!(scaled.scaled, base * 3);
    }
}
