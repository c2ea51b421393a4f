use criterion::{black_box, criterion_group, criterion_main, Criterion};

const FAIL_ON: &str = "ALLOC, ALLOC_ARRAY, AFTER_PARSING|PRINT_IDEAL:STORE_I, LOAD_I";
const COUNTS: &str = "compI_rReg = 2, compI_rReg_imm 1, LOAD >= 1 <= 3, \
                      FINAL_CODE:CALL_STATIC ne 0, STORE_I < 4, AND_I > 0";

fn bench_parse_fail_on(c: &mut Criterion) {
    c.bench_function("parse_fail_on", |b| {
        b.iter(|| irmatch_dsl::parse_fail_on(black_box(FAIL_ON)).unwrap())
    });
}

fn bench_parse_counts(c: &mut Criterion) {
    c.bench_function("parse_counts", |b| {
        b.iter(|| irmatch_dsl::parse_counts(black_box(COUNTS)).unwrap())
    });
}

criterion_group!(benches, bench_parse_fail_on, bench_parse_counts);
criterion_main!(benches);
