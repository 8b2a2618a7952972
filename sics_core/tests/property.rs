mod common;

use common::{online, settings};
use proptest::prelude::*;
use sics_core::reply::{clean_line, leading_token, parse_code, parse_quoted, parse_weight};

proptest! {
    #[test]
    fn clean_line_is_idempotent(s in ".{0,64}") {
        let once = clean_line(&s);
        prop_assert_eq!(clean_line(&once), once.clone());
        prop_assert!(!once.contains('\r') && !once.contains('\n') && !once.contains('\x1b'));
    }

    #[test]
    fn parsers_never_panic(s in "[ -~]{0,48}") {
        let _ = parse_weight(&s);
        if let Some(tok) = leading_token(&s) {
            let _ = parse_quoted(tok, &s);
            let _ = parse_code(tok, &s);
        }
    }

    #[test]
    fn formatted_weights_parse_back(v in -99_999.0f64..99_999.0, stable in any::<bool>(), pad in 1usize..8) {
        let line = format!("S {}{}{:.3} g", if stable { 'S' } else { 'D' }, " ".repeat(pad), v);
        let r = parse_weight(&line).expect("well-formed");
        prop_assert_eq!(r.stable, stable);
        prop_assert!((r.value - v).abs() < 1e-3);
        prop_assert_eq!(r.unit, "g");
    }

    #[test]
    fn arbitrary_traffic_keeps_the_session_consistent(lines in prop::collection::vec("[ -~]{0,24}", 0..32)) {
        let mut r = online(settings());
        for l in &lines {
            r.line(l);
        }
        // at most one outstanding command, and the model still serializes
        prop_assert!(r.s.outstanding().timeout() > std::time::Duration::ZERO);
        prop_assert!(serde_json::to_string(r.s.meter_configuration()).is_ok());
        prop_assert!(serde_json::to_string(r.s.measurement()).is_ok());
    }
}
