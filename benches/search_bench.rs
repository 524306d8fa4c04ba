use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use othello_engine::{Board, Engine, EngineConfig, EvaluationStrategy, HeuristicEvaluator, Side};

fn midgame_board() -> Board {
    let mut board = Board::new();
    let mut side = Side::Black;
    for _ in 0..20 {
        let moves = board.legal_move_list(side);
        let Some(&first) = moves.first() else {
            side = side.opponent();
            continue;
        };
        board = board.apply_move(side, first).unwrap();
        side = side.opponent();
    }
    board
}

fn bench_move_generation(c: &mut Criterion) {
    let board = midgame_board();
    c.bench_function("legal_moves midgame", |b| {
        b.iter(|| black_box(&board).legal_moves(Side::Black))
    });
}

fn bench_evaluation(c: &mut Criterion) {
    let board = midgame_board();
    let evaluator = HeuristicEvaluator::advanced();
    c.bench_function("evaluate advanced", |b| {
        b.iter(|| evaluator.evaluate(black_box(&board), Side::Black))
    });
}

fn bench_search(c: &mut Criterion) {
    let board = midgame_board();
    let mut config = EngineConfig::advanced();
    config.search_depth = 5;
    config.time_budget_ms = None;
    let engine = Engine::new(config).unwrap();

    c.bench_function("search depth 5", |b| {
        b.iter(|| engine.choose_move(black_box(&board), Side::Black, None))
    });
}

criterion_group!(benches, bench_move_generation, bench_evaluation, bench_search);
criterion_main!(benches);
