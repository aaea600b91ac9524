use std::collections::BTreeMap;

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use ticket_page::{CountdownState, Page, TimerHandle, cache_key, read_cookie};

const PAGE_PROPTEST_REGRESSION_FILE: &str = "tests/proptest-regressions/page_property_test.txt";
const DEFAULT_PAGE_PROPTEST_CASES: u32 = 128;

const COUNTDOWN_HTML: &str = r#"
<div id="qr_0"><svg><path d="M0 0h4v4H0z"></path></svg></div>
<div id="timer_0" class="progress-bar"></div>
<button id="inc_1">+</button>
"#;

fn page_proptest_cases() -> u32 {
    std::env::var("TICKET_PAGE_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PAGE_PROPTEST_CASES)
}

fn cookie_name_strategy() -> BoxedStrategy<String> {
    "[a-z][a-z0-9_]{0,7}".boxed()
}

fn cookie_value_strategy() -> BoxedStrategy<String> {
    "[A-Za-z0-9=%._-]{0,12}".boxed()
}

fn cookie_map_strategy() -> BoxedStrategy<BTreeMap<String, String>> {
    btree_map(cookie_name_strategy(), cookie_value_strategy(), 1..6).boxed()
}

fn header_of(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}; "))
        .collect()
}

#[derive(Clone, Debug)]
enum CountdownAction {
    Start,
    CancelLast,
    Advance(i64),
}

fn countdown_action_strategy() -> BoxedStrategy<CountdownAction> {
    prop_oneof![
        3 => Just(CountdownAction::Start),
        1 => Just(CountdownAction::CancelLast),
        4 => (0i64..12_000).prop_map(CountdownAction::Advance),
    ]
    .boxed()
}

fn fail(err: ticket_page::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn assert_countdown_sequence_is_consistent(actions: &[CountdownAction]) -> TestCaseResult {
    let mut page = Page::from_html(COUNTDOWN_HTML).map_err(fail)?;
    let mut last: Option<TimerHandle> = None;
    let mut increments = 0usize;

    for (step, action) in actions.iter().enumerate() {
        match action {
            CountdownAction::Start => {
                if page.countdown_state("timer_0") != CountdownState::Expired {
                    last = Some(
                        page.show_for_duration("qr_0", "timer_0", "inc_1")
                            .map_err(fail)?,
                    );
                }
            }
            CountdownAction::CancelLast => {
                if let Some(handle) = last {
                    page.cancel_countdown(handle).map_err(fail)?;
                }
            }
            CountdownAction::Advance(delta_ms) => page.advance_time(*delta_ms).map_err(fail)?,
        }

        increments += page
            .take_dispatched_events()
            .iter()
            .filter(|event| event.event_type == "increment" && event.target_id == "inc_1")
            .count();
        let expired = page.countdown_state("timer_0") == CountdownState::Expired;
        let qr_children = page.child_count("qr_0").map_err(fail)?;

        prop_assert!(increments <= 1, "increment fired twice at step {step}: {actions:?}");
        prop_assert_eq!(expired, increments == 1, "state/event mismatch at step {}", step);
        prop_assert_eq!(qr_children == 0, expired, "qr/state mismatch at step {}", step);
        prop_assert!(page.pending_timers().len() <= 1, "overlap scheduled at step {step}");
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: page_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(PAGE_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn present_cookies_read_back_their_exact_value(cookies in cookie_map_strategy()) {
        let header = header_of(&cookies);
        for (name, value) in &cookies {
            let found = read_cookie(&header, name)
                .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
            prop_assert_eq!(found.as_deref(), Some(value.as_str()), "header={:?}", header);
        }
    }

    #[test]
    fn absent_cookies_are_not_found(
        cookies in cookie_map_strategy(),
        probe in cookie_name_strategy(),
    ) {
        prop_assume!(!cookies.contains_key(&probe));
        let header = header_of(&cookies);
        let found = read_cookie(&header, &probe)
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        prop_assert_eq!(found, None, "header={:?}", header);
    }

    #[test]
    fn cache_keys_are_injective(first in any::<u64>(), second in any::<u64>()) {
        prop_assert_eq!(cache_key(first) == cache_key(second), first == second);
    }

    #[test]
    fn countdown_fires_at_most_once(actions in vec(countdown_action_strategy(), 1..=20)) {
        assert_countdown_sequence_is_consistent(&actions)?;
    }
}
