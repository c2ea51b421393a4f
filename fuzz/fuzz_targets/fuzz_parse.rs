#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Neither list parser may panic, and every error must point inside
        // the input.
        for result in [irmatch_dsl::parse_fail_on(s), irmatch_dsl::parse_counts(s)] {
            if let Err(e) = result {
                if let Some(span) = e.span() {
                    assert!(span.offset() + span.len() <= s.len());
                }
            }
        }
    }
});
