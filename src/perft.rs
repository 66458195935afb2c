use crate::board::BoardState;
use crate::movegen::{Move, MoveGenerator, MoveKind};
use rayon::prelude::*;

/// Counts the leaf nodes reachable in exactly `depth` plies.
///
/// Every pseudo-legal move is applied and rolled back through the move
/// guard, so this also exercises the legality filter and state restoration.
pub fn perft(board: &mut BoardState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    for mv in MoveGenerator::generate(board, MoveKind::All) {
        if let Some(mut child) = board.apply(mv) {
            nodes += perft(&mut child, depth - 1);
        }
    }
    nodes
}

/// Per-root-move node counts, computed in parallel on copies of `board`.
pub fn divide(board: &BoardState, depth: u32) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }

    MoveGenerator::generate_legal(board)
        .into_par_iter()
        .map(|mv| {
            let mut scratch = *board;
            let nodes = match scratch.apply(mv) {
                Some(mut child) => perft(&mut child, depth - 1),
                None => 0,
            };
            (mv, nodes)
        })
        .collect()
}
