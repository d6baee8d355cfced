//! Property-based tests using `proptest`.
//!
//! Pattern evaluation is stateless, per-file results are ordered and
//! deduplicated, and report cache keys ignore order and case.

use std::path::Path;
use std::sync::Arc;

use compliance_scanner::analyzer::{evaluate, scan_file, StandardSetKey};
use compliance_scanner::catalog::{Check, CheckScope, Control, Severity};
use proptest::prelude::*;

fn password_check() -> Check {
    Check::new(
        "AC-02",
        "hardcoded-password",
        r#"password\s*=\s*["'][^"']*["']"#,
        "i",
        "Hardcoded password",
        Severity::Error,
    )
    .unwrap()
}

fn controls() -> Vec<Arc<Control>> {
    let multiline = Check::new("SC-08", "http-block", r"listener[\s\S]*?http", "i", "HTTP", Severity::Warning)
        .unwrap()
        .with_scope(CheckScope::File);
    let literal = Check::new("SC-07", "open-cidr", r"0\.0\.0\.0/0", "", "Open CIDR", Severity::Error).unwrap();
    vec![
        Arc::new(Control::new("FedRAMP", "AC-02", "Account Management").with_check(password_check())),
        Arc::new(
            Control::new("FedRAMP", "SC-07", "Boundary Protection")
                .with_check(literal)
                .with_check(multiline),
        ),
    ]
}

// Short vocabulary so that generated text actually contains matches.
fn config_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("password = \"x\"".to_string()),
            Just("PASSWORD='hunter2'".to_string()),
            Just("0.0.0.0/0".to_string()),
            Just("listener".to_string()),
            Just("http".to_string()),
            Just("\n".to_string()),
            Just(" ".to_string()),
            "[a-zé=\"' ]{0,8}",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn evaluate_is_repeatable(text in config_text()) {
        let check = password_check();
        let first = evaluate(&check, &text);
        let second = evaluate(&check, &text);
        prop_assert_eq!(&first, &second);

        for m in &first {
            prop_assert!(m.length > 0);
            prop_assert_eq!(&text[m.offset..m.offset + m.length], m.matched_text.as_str());
        }
        for pair in first.windows(2) {
            prop_assert!(pair[0].offset + pair[0].length <= pair[1].offset);
        }
    }

    #[test]
    fn scan_file_is_ordered_and_deduplicated(text in config_text()) {
        let diagnostics = scan_file(Path::new("main.tf"), &text, &controls());
        let line_count = text.split('\n').count();

        for d in &diagnostics {
            prop_assert!(d.line >= 1 && d.line <= line_count);
            prop_assert!(d.column >= 1);
        }
        for pair in diagnostics.windows(2) {
            let a = (pair[0].line, pair[0].column, &pair[0].check_id);
            let b = (pair[1].line, pair[1].column, &pair[1].check_id);
            prop_assert!(a <= b);
        }

        let mut keys: Vec<(&str, &str, usize)> = diagnostics
            .iter()
            .map(|d| (d.control_id.as_str(), d.check_id.as_str(), d.line))
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), total);
    }

    #[test]
    fn scan_file_never_panics(text in "\\PC{0,300}") {
        let _ = scan_file(Path::new("notes.md"), &text, &controls());
    }

    #[test]
    fn standard_set_key_ignores_order_and_case(names in prop::collection::vec("[A-Za-z0-9-]{1,10}", 0..6)) {
        let key = StandardSetKey::new(&names);

        let mut shuffled: Vec<String> = names.iter().rev().map(|n| n.to_lowercase()).collect();
        shuffled.extend(names.iter().map(|n| format!(" {} ", n.to_uppercase())));
        prop_assert_eq!(StandardSetKey::new(&shuffled), key.clone());

        let sorted = key.names().windows(2).all(|w| w[0] < w[1]);
        prop_assert!(sorted);
    }
}
