use criterion::{black_box, criterion_group, criterion_main, Criterion};
use matchline::rules;
use matchline::{Ledger, PlayedMove};

const GAME: [&str; 20] = [
    "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7",
    "f1e1", "b7b5", "a4b3", "d7d6", "c2c3", "e8g8", "h2h3", "c6b8", "d2d4", "b8d7",
];

fn bench_replay(c: &mut Criterion) {
    let moves: Vec<PlayedMove> = GAME.iter().map(|m| m.parse().expect("notation")).collect();
    c.bench_function("replay_ruy_lopez_20_plies", |b| {
        b.iter(|| {
            let mut ledger = Ledger::default();
            for &m in &moves {
                rules::apply(&mut ledger, black_box(m)).expect("legal");
            }
            black_box(rules::outcome(&ledger))
        })
    });

    let mut ledger = Ledger::default();
    for &m in &moves { rules::apply(&mut ledger, m).expect("legal"); }
    c.bench_function("verify_chain_20_plies", |b| {
        b.iter(|| black_box(rules::verify_chain(black_box(ledger.positions())).is_ok()))
    });
}

criterion_group!(benches, bench_replay);
criterion_main!(benches);
