use criterion::{black_box, criterion_group, criterion_main, Criterion};

use irmatch_dsl::{CompilePhase, OutputClass};
use irmatch_engine::{
    check_rules, CapturedCompilation, EvalMode, NodeEntry, NodeRegistry, RuleDeclaration,
    VmConfig,
};

fn final_code(blocks: usize) -> String {
    let mut text = String::new();
    for i in 0..blocks {
        text.push_str(&format!("{:03x}   B{i}: #\tout( B{} ) <- in( B{} )\n", i * 16, i + 1, i));
        text.push_str(&format!("{:03x}   compI_rReg rax, rsi\t# int\n", i * 16 + 4));
        text.push_str(&format!("{:03x}   compI_rReg_imm rax, #{i}\n", i * 16 + 8));
        text.push_str(&format!("{:03x}   movl rdx, [rsi + #{i}]\n", i * 16 + 12));
    }
    text
}

fn bench_check_rules(c: &mut Criterion) {
    let registry = NodeRegistry::new([
        NodeEntry::new("compI_rReg")
            .with_class(OutputClass::Mach)
            .with_default(CompilePhase::FinalCode),
        NodeEntry::new("LOAD_I")
            .with_regex(r"movl \w+, \[")
            .with_class(OutputClass::Mach)
            .with_default(CompilePhase::FinalCode),
        NodeEntry::new("CALL")
            .with_regex(r"\bcall\b")
            .with_class(OutputClass::Mach)
            .with_default(CompilePhase::FinalCode),
    ])
    .unwrap();
    let vm = VmConfig::new(&registry);
    let compilation =
        CapturedCompilation::new().with_output(CompilePhase::FinalCode, final_code(2_000));
    let decls = [
        RuleDeclaration::new().fail_on("CALL").counts("compI_rReg >= 1, LOAD_I < 5000"),
        RuleDeclaration::new().counts("compI_rReg = 2000"),
    ];

    c.bench_function("check_rules_sequential", |b| {
        b.iter(|| {
            check_rules(black_box(&decls), &vm, &vm, &compilation, EvalMode::Sequential).unwrap()
        })
    });
    c.bench_function("check_rules_parallel", |b| {
        b.iter(|| {
            check_rules(black_box(&decls), &vm, &vm, &compilation, EvalMode::Parallel).unwrap()
        })
    });
}

criterion_group!(benches, bench_check_rules);
criterion_main!(benches);
