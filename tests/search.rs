use rookery::search::MATE_SCORE;
use rookery::{
    parse_move, BoardState, MoveGenerator, Score, SearchEngine, SearchInfo, SearchLimits, TimeGovernor, STARTPOS,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

fn search_fen(fen: &str, depth: i32) -> rookery::SearchResult {
    let mut board = BoardState::from_fen(fen).unwrap();
    let mut engine = SearchEngine::new(8);
    engine.search(&mut board, &[], SearchLimits::depth(depth), &TimeGovernor::unlimited(), |_| {})
}

#[test]
fn test_wins_hanging_queen() {
    let result = search_fen("4k3/8/8/3q4/8/8/3R4/3K4 w - - 0 1", 3);
    assert_eq!(result.best_move.map(|m| m.to_uci()), Some("d2d5".to_string()));
    assert!(result.score > 300);
}

#[test]
fn test_back_rank_mate() {
    let result = search_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", 3);
    assert_eq!(result.best_move.map(|m| m.to_uci()), Some("a1a8".to_string()));
    assert!(result.score > MATE_SCORE);
    assert_eq!(Score::from_raw(result.score), Score::Mate(1));
}

#[test]
fn test_defends_against_mate() {
    // Black must give the king room or cover the back rank.
    let result = search_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 b - - 0 1", 4);
    assert!(result.score > -MATE_SCORE);
    assert!(result.best_move.is_some());
}

#[test]
fn test_info_lines_and_result_agree() {
    let mut board = BoardState::from_fen(STARTPOS).unwrap();
    let mut engine = SearchEngine::new(8);
    let mut lines = Vec::new();
    let mut last: Option<SearchInfo> = None;
    let result = engine.search(&mut board, &[], SearchLimits::depth(3), &TimeGovernor::unlimited(), |info| {
        lines.push(info.to_string());
        last = Some(info.clone());
    });

    assert_eq!(lines.len(), 3);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.starts_with(&format!("info depth {} score ", i + 1)), "{}", line);
        assert!(line.contains(" pv "));
    }
    let last = last.unwrap();
    assert_eq!(result.pv, last.pv);
    assert!(MoveGenerator::generate_legal(&board).contains(&result.best_move.unwrap()));
}

#[test]
fn test_movetime_budget_is_respected() {
    let mut board = BoardState::from_fen(STARTPOS).unwrap();
    let mut engine = SearchEngine::new(8);
    let governor = TimeGovernor::with_budget(Arc::new(AtomicBool::new(false)), Some(Duration::from_millis(200)));

    let start = std::time::Instant::now();
    let result = engine.search(&mut board, &[], SearchLimits::default(), &governor, |_| {});
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(result.best_move.is_some());
}

#[test]
fn test_history_makes_repetition_a_draw() {
    // White is a rook down; shuffling back into a known position holds the draw.
    let fen = "k7/8/8/8/8/8/r7/7K w - - 0 1";
    let mut board = BoardState::from_fen(fen).unwrap();
    let retreat = parse_move(&board, "h1g1").unwrap();
    let seen = {
        let mut scratch = board;
        let child = scratch.apply(retreat).unwrap();
        child.hash
    };

    let mut engine = SearchEngine::new(8);
    let result = engine.search(&mut board, &[seen], SearchLimits::depth(2), &TimeGovernor::unlimited(), |_| {});
    assert_eq!(result.best_move, Some(retreat));
    assert_eq!(result.score, 0);

    let mut engine = SearchEngine::new(8);
    let result = engine.search(&mut board, &[], SearchLimits::depth(2), &TimeGovernor::unlimited(), |_| {});
    assert!(result.score < -300);
}
