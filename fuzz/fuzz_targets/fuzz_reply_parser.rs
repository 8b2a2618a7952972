#![no_main]
use libfuzzer_sys::fuzz_target;
use sics_core::reply;

fuzz_target!(|data: &str| {
    let line = reply::clean_line(data);
    assert!(!line.contains(['\r', '\n']));
    let Some(token) = reply::leading_token(&line) else {
        return;
    };
    let _ = reply::is_error_report(token);
    let _ = reply::ReplyKind::from_token(token);
    if let Some(w) = reply::parse_weight(&line) {
        assert!(w.value.is_finite());
    }
    if let Some(t) = reply::parse_tare(&line) {
        assert!(t.value.is_finite());
    }
    let _ = reply::parse_quoted(token, &line);
    let _ = reply::parse_code(token, &line);
});
