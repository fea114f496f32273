use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hopkins::{Board, START_BOARD_FEN};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

mod hopkins_engine {
    use hopkins::{engine::Engine, Board, Hopkins};

    pub fn search_to_depth(board: Board, depth: u32) {
        let mut engine = Hopkins::new_from_board(board);
        if let Err(e) = engine.search_to_depth(depth) {
            panic!("{e}");
        }
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    const SEARCH_DEPTHS: &[u32] = &[1, 2, 3];

    for (name, fen) in [("start", START_BOARD_FEN), ("kiwipete", KIWIPETE)] {
        let board = Board::from_fen(fen).unwrap();

        let mut group = c.benchmark_group(format!("hopkins::search_to_depth/{name}"));
        group.sample_size(10);
        for &depth in SEARCH_DEPTHS {
            group.bench_with_input(
                BenchmarkId::from_parameter(depth),
                &(depth, &board),
                |b, (depth, board)| {
                    b.iter(|| hopkins_engine::search_to_depth((*board).clone(), *depth));
                },
            );
        }
        group.finish();
    }

    c.bench_function("hopkins::select_move/start/2", |b| {
        b.iter(|| hopkins::select_move(START_BOARD_FEN, 2).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
