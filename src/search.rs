use crate::board::{BoardState, Piece, PieceKind};
use crate::eval::{Evaluate, Evaluator};
use crate::movegen::{Move, MoveGenerator, MoveKind, MoveList};
use crate::time::TimeGovernor;
use crate::tt::{Bound, TranspositionTable};
use log::debug;
use std::fmt;
use std::time::Instant;

pub const INFINITY: i32 = 50000;
pub const MATE_VALUE: i32 = 49000;
/// Scores beyond this magnitude encode a forced mate.
pub const MATE_SCORE: i32 = 48000;
pub const MAX_PLY: usize = 64;

// Per-ply tables get one spare slot for the leaf reached at MAX_PLY.
const PLY_SLOTS: usize = MAX_PLY + 1;

const NODE_POLL_MASK: u64 = 2047;
const ASPIRATION_WINDOW: i32 = 50;
const NULL_MOVE_REDUCTION: i32 = 2;
const FULL_DEPTH_MOVES: usize = 4;
const REDUCTION_LIMIT: i32 = 3;

// Move ordering
const PV_MOVE_SCORE: i32 = 20000;
const FIRST_KILLER_SCORE: i32 = 9000;
const SECOND_KILLER_SCORE: i32 = 8000;

/// Capture ordering indexed by [attacker][victim]: most valuable victim
/// first, least valuable attacker breaking ties.
#[rustfmt::skip]
const MVV_LVA: [[i32; 6]; 6] = [
    [105, 205, 305, 405, 505, 605],
    [104, 204, 304, 404, 504, 604],
    [103, 203, 303, 403, 503, 603],
    [102, 202, 302, 402, 502, 602],
    [101, 201, 301, 401, 501, 601],
    [100, 200, 300, 400, 500, 600],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: i32,
}

impl SearchLimits {
    pub fn depth(depth: i32) -> Self {
        SearchLimits { depth }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits { depth: MAX_PLY as i32 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    /// Moves to mate; negative when the side to move is getting mated
    Mate(i32),
}

impl Score {
    pub fn from_raw(score: i32) -> Self {
        if score > MATE_SCORE {
            Score::Mate((MATE_VALUE - score) / 2 + 1)
        } else if score < -MATE_SCORE {
            Score::Mate(-(score + MATE_VALUE) / 2 - 1)
        } else {
            Score::Cp(score)
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "cp {}", cp),
            Score::Mate(moves) => write!(f, "mate {}", moves),
        }
    }
}

/// Progress report for one completed iteration.
#[derive(Clone, Debug)]
pub struct SearchInfo {
    pub depth: i32,
    pub score: Score,
    pub nodes: u64,
    pub time_ms: u64,
    pub nps: u64,
    pub hashfull: usize,
    pub pv: Vec<Move>,
}

impl fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "info depth {} score {} nodes {} nps {} time {} hashfull {} pv",
            self.depth, self.score, self.nodes, self.nps, self.time_ms, self.hashfull
        )?;
        for mv in &self.pv {
            write!(f, " {}", mv)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    /// Last fully completed depth, 0 if none finished
    pub depth: i32,
    pub nodes: u64,
    pub pv: Vec<Move>,
}

pub struct SearchEngine<E = Evaluator> {
    tt: TranspositionTable,
    evaluator: E,
}

impl SearchEngine<Evaluator> {
    pub fn new(hash_mb: usize) -> Self {
        Self::with_evaluator(hash_mb, Evaluator)
    }
}

impl<E: Evaluate> SearchEngine<E> {
    pub fn with_evaluator(hash_mb: usize, evaluator: E) -> Self {
        SearchEngine {
            tt: TranspositionTable::new(hash_mb),
            evaluator,
        }
    }

    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    pub fn set_hash_size(&mut self, size_mb: usize) {
        self.tt.resize(size_mb);
    }

    pub fn new_game(&mut self) {
        self.clear_tt();
    }

    /// Iterative deepening from `board`. `history` holds the fingerprints of
    /// the positions that led to `board` and is used for repetition draws.
    /// `board` is left exactly as it was passed in.
    pub fn search<F>(
        &mut self,
        board: &mut BoardState,
        history: &[u64],
        limits: SearchLimits,
        governor: &TimeGovernor,
        mut report: F,
    ) -> SearchResult
    where
        F: FnMut(&SearchInfo),
    {
        let start = Instant::now();

        let Some(&first_legal) = MoveGenerator::generate_legal(board).first() else {
            let score = if board.in_check() { -MATE_VALUE } else { 0 };
            return SearchResult {
                best_move: None,
                score,
                depth: 0,
                nodes: 0,
                pv: Vec::new(),
            };
        };

        let max_depth = limits.depth.clamp(1, MAX_PLY as i32);
        let mut ctx = SearchContext::new(&mut self.tt, &self.evaluator, governor, history);

        let mut result = SearchResult {
            best_move: Some(first_legal),
            score: 0,
            depth: 0,
            nodes: 0,
            pv: vec![first_legal],
        };

        let mut alpha = -INFINITY;
        let mut beta = INFINITY;
        let mut depth = 1;

        while depth <= max_depth {
            ctx.follow_pv = true;
            let score = ctx.negamax(board, alpha, beta, depth);

            if ctx.stopped {
                debug!("depth {} interrupted after {} nodes", depth, ctx.nodes);
                break;
            }

            if score <= alpha || score >= beta {
                debug!("depth {} fell outside [{}, {}], re-searching with full window", depth, alpha, beta);
                alpha = -INFINITY;
                beta = INFINITY;
                continue;
            }

            alpha = score - ASPIRATION_WINDOW;
            beta = score + ASPIRATION_WINDOW;

            let pv = ctx.principal_variation();
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let info = SearchInfo {
                depth,
                score: Score::from_raw(score),
                nodes: ctx.nodes,
                time_ms: elapsed_ms,
                nps: ctx.nodes * 1000 / elapsed_ms.max(1),
                hashfull: ctx.tt.hashfull(),
                pv: pv.clone(),
            };
            debug!("depth {} score {} nodes {} pv {}", depth, score, ctx.nodes, pv.len());
            report(&info);

            result = SearchResult {
                best_move: pv.first().copied().or(Some(first_legal)),
                score,
                depth,
                nodes: ctx.nodes,
                pv,
            };
            depth += 1;
        }

        result.nodes = ctx.nodes;
        result
    }
}

/// Mutable state of one search: ordering heuristics, PV, repetition stack
/// and the cancellation bookkeeping.
pub struct SearchContext<'a, E> {
    tt: &'a mut TranspositionTable,
    evaluator: &'a E,
    governor: &'a TimeGovernor,
    ply: usize,
    repetition: Vec<u64>,
    killers: [[Option<Move>; 2]; PLY_SLOTS],
    history: [[i32; 64]; 12],
    pv_table: [[Option<Move>; PLY_SLOTS]; PLY_SLOTS],
    pv_length: [usize; PLY_SLOTS],
    follow_pv: bool,
    score_pv: bool,
    nodes: u64,
    stopped: bool,
}

impl<'a, E: Evaluate> SearchContext<'a, E> {
    pub fn new(
        tt: &'a mut TranspositionTable,
        evaluator: &'a E,
        governor: &'a TimeGovernor,
        history: &[u64],
    ) -> Self {
        SearchContext {
            tt,
            evaluator,
            governor,
            ply: 0,
            repetition: history.to_vec(),
            killers: [[None; 2]; PLY_SLOTS],
            history: [[0; 64]; 12],
            pv_table: [[None; PLY_SLOTS]; PLY_SLOTS],
            pv_length: [0; PLY_SLOTS],
            follow_pv: false,
            score_pv: false,
            nodes: 0,
            stopped: false,
        }
    }

    pub fn principal_variation(&self) -> Vec<Move> {
        self.pv_table[0][..self.pv_length[0]]
            .iter()
            .map_while(|mv| *mv)
            .collect()
    }

    #[inline(always)]
    fn poll(&mut self) {
        if self.nodes & NODE_POLL_MASK == 0 && self.governor.should_stop() {
            self.stopped = true;
        }
    }

    #[inline(always)]
    fn is_repetition(&self, hash: u64) -> bool {
        self.repetition.iter().any(|&h| h == hash)
    }

    /// Steps one ply down; `parent_hash` joins the repetition stack.
    #[inline(always)]
    fn enter(&mut self, parent_hash: u64) {
        self.ply += 1;
        self.repetition.push(parent_hash);
    }

    #[inline(always)]
    fn leave(&mut self) {
        self.ply -= 1;
        self.repetition.pop();
    }

    pub fn negamax(&mut self, board: &mut BoardState, mut alpha: i32, beta: i32, mut depth: i32) -> i32 {
        let ply = self.ply;
        self.pv_length[ply] = ply;

        if ply > 0 && self.is_repetition(board.hash) {
            return 0;
        }

        let pv_node = beta - alpha > 1;
        if ply > 0 && !pv_node {
            if let Some(score) = self.tt.probe(board.hash, alpha, beta, depth, ply) {
                return score;
            }
        }

        self.poll();

        if depth <= 0 {
            return self.quiescence(board, alpha, beta);
        }

        if ply >= MAX_PLY {
            return self.evaluator.evaluate(board);
        }

        self.nodes += 1;

        let in_check = board.in_check();
        if in_check {
            depth += 1;
        }

        // Null move pruning
        if depth >= 3 && !in_check && ply > 0 {
            let hash = board.hash;
            let mut null = board.apply_null();
            self.enter(hash);
            let score = -self.negamax(&mut null, -beta, -beta + 1, depth - 1 - NULL_MOVE_REDUCTION);
            self.leave();
            drop(null);

            if self.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
        }

        let mut moves = MoveGenerator::generate(board, MoveKind::All);
        if self.follow_pv {
            self.enable_pv_scoring(&moves);
        }
        self.order_moves(board, &mut moves);

        let mut bound = Bound::Upper;
        let mut legal_moves = 0;
        let mut moves_searched = 0;

        for mv in moves {
            let hash = board.hash;
            let Some(mut child) = board.apply(mv) else {
                continue;
            };
            self.enter(hash);
            legal_moves += 1;

            let score = if moves_searched == 0 {
                -self.negamax(&mut child, -beta, -alpha, depth - 1)
            } else {
                // Late move reduction
                let mut score = if moves_searched >= FULL_DEPTH_MOVES
                    && depth >= REDUCTION_LIMIT
                    && !in_check
                    && !mv.is_capture()
                    && !mv.is_promotion()
                {
                    -self.negamax(&mut child, -alpha - 1, -alpha, depth - 2)
                } else {
                    alpha + 1
                };

                // Principal variation search
                if score > alpha {
                    score = -self.negamax(&mut child, -alpha - 1, -alpha, depth - 1);
                    if score > alpha && score < beta {
                        score = -self.negamax(&mut child, -beta, -alpha, depth - 1);
                    }
                }
                score
            };

            self.leave();
            drop(child);

            if self.stopped {
                return 0;
            }

            moves_searched += 1;

            if score > alpha {
                bound = Bound::Exact;
                if !mv.is_capture() {
                    self.history[mv.piece.index()][mv.to as usize] += depth;
                }

                alpha = score;
                self.update_pv(mv);

                if score >= beta {
                    self.tt.store(board.hash, beta, depth, Bound::Lower, ply);
                    if !mv.is_capture() {
                        self.killers[ply][1] = self.killers[ply][0];
                        self.killers[ply][0] = Some(mv);
                    }
                    return beta;
                }
            }
        }

        if legal_moves == 0 {
            return if in_check { -MATE_VALUE + ply as i32 } else { 0 };
        }

        self.tt.store(board.hash, alpha, depth, bound, ply);
        alpha
    }

    pub fn quiescence(&mut self, board: &mut BoardState, mut alpha: i32, beta: i32) -> i32 {
        self.poll();
        self.nodes += 1;

        if self.ply >= MAX_PLY {
            return self.evaluator.evaluate(board);
        }

        let stand_pat = self.evaluator.evaluate(board);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut moves = MoveGenerator::generate(board, MoveKind::Captures);
        self.order_moves(board, &mut moves);

        for mv in moves {
            let hash = board.hash;
            let Some(mut child) = board.apply(mv) else {
                continue;
            };
            self.enter(hash);
            let score = -self.quiescence(&mut child, -beta, -alpha);
            self.leave();
            drop(child);

            if self.stopped {
                return 0;
            }

            if score > alpha {
                alpha = score;
                if score >= beta {
                    return beta;
                }
            }
        }

        alpha
    }

    fn update_pv(&mut self, mv: Move) {
        let ply = self.ply;
        self.pv_table[ply][ply] = Some(mv);
        for next in (ply + 1)..self.pv_length[ply + 1] {
            self.pv_table[ply][next] = self.pv_table[ply + 1][next];
        }
        self.pv_length[ply] = self.pv_length[ply + 1].max(ply + 1);
    }

    /// Keeps following the previous iteration's PV only while it is among
    /// the moves of this node.
    fn enable_pv_scoring(&mut self, moves: &MoveList) {
        self.follow_pv = false;
        if let Some(pv_move) = self.pv_table[0][self.ply] {
            if moves.contains(&pv_move) {
                self.follow_pv = true;
                self.score_pv = true;
            }
        }
    }

    fn score_move(&mut self, board: &BoardState, mv: Move) -> i32 {
        if self.score_pv && self.pv_table[0][self.ply] == Some(mv) {
            self.score_pv = false;
            return PV_MOVE_SCORE;
        }

        if mv.is_capture() {
            let victim = if mv.is_en_passant() {
                PieceKind::Pawn
            } else {
                board.piece_at(mv.to).map_or(PieceKind::Pawn, Piece::kind)
            };
            return MVV_LVA[mv.piece.kind().index()][victim.index()];
        }

        if self.killers[self.ply][0] == Some(mv) {
            FIRST_KILLER_SCORE
        } else if self.killers[self.ply][1] == Some(mv) {
            SECOND_KILLER_SCORE
        } else {
            self.history[mv.piece.index()][mv.to as usize]
        }
    }

    fn order_moves(&mut self, board: &BoardState, moves: &mut MoveList) {
        let mut scored: Vec<(i32, Move)> = moves.iter().map(|&mv| (self.score_move(board, mv), mv)).collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        moves.clear();
        moves.extend(scored.into_iter().map(|(_, mv)| mv));
    }
}
