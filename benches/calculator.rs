use criterion::{criterion_group, criterion_main, Criterion};
use muskox::{
    Assoc, Grammar, Parser,
    SymbolID::{N, T},
};

criterion_main!(benches);
criterion_group!(benches, bench_build, bench_parse);

fn calculator_grammar() -> Grammar<f64> {
    Grammar::<f64>::define(|g| {
        let number = g.terminal(
            "NUMBER",
            r"\d+(\.\d+)?",
            Assoc::None,
            Some(|tok| tok.raw.parse().unwrap_or_default()),
        )?;
        let pow = g.terminal("^", r"\^", Assoc::Right, None)?;
        let mul = g.terminal("*", r"\*", Assoc::Left, None)?;
        let div = g.terminal("/", r"/", Assoc::Left, None)?;
        let add = g.terminal("+", r"\+", Assoc::Left, None)?;
        let sub = g.terminal("-", r"-", Assoc::Left, None)?;
        let lparen = g.terminal("(", r"\(", Assoc::None, None)?;
        let rparen = g.terminal(")", r"\)", Assoc::None, None)?;

        let expr = g.nonterminal("expr")?;
        g.rule(expr, [T(number)], None)?;
        g.rule(
            expr,
            [T(lparen), N(expr), T(rparen)],
            Some(|args| args.get(1)),
        )?;
        g.rule(
            expr,
            [N(expr), T(pow), N(expr)],
            Some(|args| args.get(0).powf(args.get(2))),
        )?;
        g.rule(
            expr,
            [N(expr), T(mul), N(expr)],
            Some(|args| args.get(0) * args.get(2)),
        )?;
        g.rule(
            expr,
            [N(expr), T(div), N(expr)],
            Some(|args| args.get(0) / args.get(2)),
        )?;
        g.rule(
            expr,
            [N(expr), T(add), N(expr)],
            Some(|args| args.get(0) + args.get(2)),
        )?;
        g.rule(
            expr,
            [N(expr), T(sub), N(expr)],
            Some(|args| args.get(0) - args.get(2)),
        )?;
        g.start_symbol(expr)
    })
    .unwrap()
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build/calculator", |b| {
        b.iter(|| Parser::build(calculator_grammar()).unwrap());
    });
}

fn bench_parse(c: &mut Criterion) {
    let parser = Parser::build(calculator_grammar()).unwrap();
    let input = "1 + 2 * (3 - 4 / 2)^2 ^ 2 - (5 * 6 + 7) / 8 + 9^2 * 10 - 11";

    let mut group = c.benchmark_group("parse");
    group.bench_function("expression", |b| {
        b.iter(|| parser.parse(input).unwrap().into_value());
    });
    group.finish();
}
