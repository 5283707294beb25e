use RustedIntegrals::Utils::plots::{PlotSettings, render_comparison, sample_pair};
use RustedIntegrals::api::handlers::{IntegralRequest, SolverSettings, solve};
use RustedIntegrals::symbolic::symbolic_engine::Expr;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const INTEGRANDS: [&str; 5] = [
    "x**2",
    "sin(x) + x**2",
    "x**3*exp(2*x)",
    "exp(x)*cos(3*x)",
    "2*x*cos(x**2)",
];

fn bench_integrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrate");
    for input in INTEGRANDS {
        let expr = Expr::parse_expression(input).unwrap();
        group.bench_function(input, |b| b.iter(|| black_box(&expr).integrate("x").unwrap()));
    }
    group.finish();
}

fn bench_definite(c: &mut Criterion) {
    let expr = Expr::parse_expression("x*log(x)").unwrap();
    c.bench_function("definite x*log(x) on [0, 2]", |b| {
        b.iter(|| expr.definite_integrate("x", black_box(0.0), black_box(2.0), 2000).unwrap())
    });
}

fn bench_plot(c: &mut Criterion) {
    let settings = PlotSettings::default();
    let f = Expr::parse_expression("sin(x) + x**2").unwrap();
    let int = f.integrate("x").unwrap();
    let samples = sample_pair(&f, &int, "x", &settings).unwrap();
    c.bench_function("render comparison plot", |b| {
        b.iter(|| render_comparison(&samples, "sin(x) + x^2", "x^3/3 - cos(x)", &settings).unwrap())
    });
}

fn bench_solve(c: &mut Criterion) {
    let settings = SolverSettings::default();
    let request = IntegralRequest {
        expression: "x**2*exp(x)".to_string(),
        lower_limit: Some(0.0),
        upper_limit: Some(1.0),
    };
    c.bench_function("whole request", |b| b.iter(|| solve(black_box(&request), &settings).unwrap()));
}

criterion_group!(benches, bench_integrate, bench_definite, bench_plot, bench_solve);
criterion_main!(benches);
