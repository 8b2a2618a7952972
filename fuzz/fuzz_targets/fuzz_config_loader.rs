#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(mut cfg) = sics_config::load_toml(data) {
        let _ = cfg.validate();
        // Reuse the document as every override value.
        cfg.apply_env(|_| Some(data.to_string()));
        let _ = cfg.validate();
    }
});
