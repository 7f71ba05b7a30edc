use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pathplay_gcode::interpret;

/// A looped pocket-like program: arcs and drills repeated through R registers
fn looped_program() -> String {
    let mut program = String::from("G90\nG0 X0 Y0 Z5\nR1=200\nR2=4\n");
    program.push_str("ROW:\nG91\nG1 X1 F600\nG3 X2 Y0 I1 J0\nG2 X2 Y0 R1\n");
    program.push_str("REPEAT ROW P=R1\n");
    program.push_str("G90\nG0 Z5\nG83 X0 Y0 Z-10 R2 Q0.5\n");
    program.push_str("HOLES:\nG91\nX5\nG90\nREPEAT HOLES P=R2\nG80\nM30\n");
    program
}

fn bench_interpret(c: &mut Criterion) {
    let program = looped_program();
    c.bench_function("interpret_looped_program", |b| {
        b.iter(|| interpret(black_box(&program)))
    });

    let straight: String = (0..5000)
        .map(|i| format!("G1 X{} Y{} Z-1\n", i % 100, i / 100))
        .collect();
    c.bench_function("interpret_5000_linear_moves", |b| {
        b.iter(|| interpret(black_box(&straight)))
    });
}

criterion_group!(benches, bench_interpret);
criterion_main!(benches);
