#![no_main]
use libfuzzer_sys::fuzz_target;

use irmatch_engine::bitvec::CountBitVector;
use irmatch_engine::validate::validate_constraints;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let (fail_on, counts) = s.split_once(';').unwrap_or(("", s));
    let Ok(decl) = irmatch_dsl::parse_declaration(fail_on, counts) else {
        return;
    };
    // Accepted declarations leave every node with a satisfiable count, and
    // fail-on nodes able to occur zero times.
    if let Ok(nodes) = validate_constraints(&decl.fail_on, &decl.counts) {
        for (node, acc) in &nodes {
            assert_ne!(acc.permitted, CountBitVector::NONE);
            if decl.fail_on.iter().any(|c| &c.node == node) {
                assert!(acc.permitted.permits_zero());
            }
        }
    }
});
