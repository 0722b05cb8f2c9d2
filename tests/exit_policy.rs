use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;
use procward::config::{parse_duration, SuccessCodes};
use procward::exec::{classify, ExecutionResult, Outcome};

proptest! {
    #[test]
    fn fired_watchdog_is_always_a_timeout(
        exit_code in any::<i32>(),
        codes in proptest::collection::btree_set(-5i32..300, 1..6),
    ) {
        let result = ExecutionResult { exit_code, watchdog_fired: true };
        prop_assert_eq!(classify(&result, &SuccessCodes::Only(codes)), Outcome::TimedOut);
        prop_assert_eq!(classify(&result, &SuccessCodes::Any), Outcome::TimedOut);
    }

    #[test]
    fn natural_exit_succeeds_iff_code_is_configured(
        exit_code in -5i32..300,
        codes in proptest::collection::btree_set(-5i32..300, 1..6),
    ) {
        let result = ExecutionResult { exit_code, watchdog_fired: false };
        let expected = if codes.contains(&exit_code) {
            Outcome::Succeeded
        } else {
            Outcome::Failed(exit_code)
        };
        prop_assert_eq!(classify(&result, &SuccessCodes::Only(codes)), expected);
    }

    #[test]
    fn second_durations_scale_linearly(secs in 0u64..1_000_000) {
        prop_assert_eq!(parse_duration(&format!("{secs}s")).unwrap(), Duration::from_secs(secs));
        prop_assert_eq!(
            parse_duration(&format!("{secs}m")).unwrap(),
            Duration::from_secs(secs * 60)
        );
    }
}

#[test]
fn default_success_codes_are_just_zero() {
    assert_eq!(SuccessCodes::default(), SuccessCodes::Only(BTreeSet::from([0])));
}
