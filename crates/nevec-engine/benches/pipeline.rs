use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nevec_engine::ast::{BinaryOp, Decl, Expr, Program, Type};
use nevec_engine::compiler::{CompileOptions, Compiler};

/// `count` constants chained by addition, every one printed at the end
fn chain_program(count: usize) -> Program {
    let mut decls = vec![Decl::constant("c0", Type::Int, Expr::int(1))];
    for i in 1..count {
        let prev = Expr::access(format!("c{}", i - 1), Type::Int);
        let expr = Expr::binary(BinaryOp::Plus, prev, Expr::int(i as i64), Type::Int);
        decls.push(Decl::constant(format!("c{}", i), Type::Int, expr));
    }
    for i in 0..count {
        decls.push(Decl::print(Expr::access(format!("c{}", i), Type::Int)));
    }
    Program::new(decls)
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for size in [16usize, 128, 512] {
        let program = chain_program(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("optimized", size), &program, |b, program| {
            let compiler = Compiler::new(CompileOptions::default());
            b.iter(|| compiler.compile_to_bytes(black_box(program)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("unoptimized", size), &program, |b, program| {
            let compiler = Compiler::new(CompileOptions::unoptimized());
            b.iter(|| compiler.compile_to_bytes(black_box(program)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
