use crate::board::BoardState;
use crate::config::EngineConfig;
use crate::movegen::play_move;
use crate::perft::divide;
use crate::search::{SearchEngine, SearchLimits};
use crate::time::{TimeControl, TimeGovernor};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const MIN_HASH_MB: usize = 1;
const MAX_HASH_MB: usize = 4096;

/// Line-oriented protocol driver. Searches run on a worker thread so that
/// `stop`, `isready` and `quit` are answered while thinking.
pub struct UciEngine {
    board: BoardState,
    /// Fingerprints of the positions that led to `board`
    history: Vec<u64>,
    engine: Arc<Mutex<SearchEngine>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    config: EngineConfig,
}

impl UciEngine {
    pub fn new(config: EngineConfig) -> Self {
        UciEngine {
            board: BoardState::default(),
            history: Vec::new(),
            engine: Arc::new(Mutex::new(SearchEngine::new(config.hash_mb))),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            config,
        }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn history(&self) -> &[u64] {
        &self.history
    }

    pub fn run(&mut self) {
        info!("{} {} ready", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            let Ok(command) = line else {
                break;
            };
            let command = command.trim();
            if !command.is_empty() && !self.handle_command(command) {
                break;
            }
        }

        self.stop_search();
        info!("shutting down");
    }

    /// Returns false once the driver should exit.
    pub fn handle_command(&mut self, command: &str) -> bool {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return true;
        }

        match parts[0] {
            "uci" => self.uci(),
            "isready" => println!("readyok"),
            "ucinewgame" => self.ucinewgame(),
            "position" => self.position(&parts[1..]),
            "go" => self.go(&parts[1..]),
            "stop" => self.stop_search(),
            "quit" => {
                self.stop_search();
                return false;
            }
            "setoption" => self.setoption(&parts[1..]),
            "d" => println!("{}", self.board),
            "perft" => self.perft(&parts[1..]),
            _ => warn!("ignoring unknown command: {}", command),
        }

        true
    }

    fn uci(&self) {
        println!("id name {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        println!("id author the {} developers", env!("CARGO_PKG_NAME"));
        println!(
            "option name Hash type spin default {} min {} max {}",
            self.config.hash_mb, MIN_HASH_MB, MAX_HASH_MB
        );
        println!("option name Clear Hash type button");
        println!("uciok");
    }

    fn ucinewgame(&mut self) {
        self.stop_search();
        self.engine.lock().new_game();
        self.board = BoardState::default();
        self.history.clear();
        info!("new game");
    }

    fn position(&mut self, args: &[&str]) {
        if args.is_empty() {
            return;
        }

        let mut move_idx = 1;

        let board = if args[0] == "startpos" {
            BoardState::default()
        } else if args[0] == "fen" {
            while move_idx < args.len() && args[move_idx] != "moves" {
                move_idx += 1;
            }
            let fen = args[1..move_idx].join(" ");
            match BoardState::from_fen(&fen) {
                Ok(board) => board,
                Err(e) => {
                    warn!("{}", e);
                    return;
                }
            }
        } else {
            warn!("ignoring position command without startpos or fen");
            return;
        };

        self.board = board;
        self.history.clear();

        if move_idx < args.len() && args[move_idx] == "moves" {
            for move_str in &args[move_idx + 1..] {
                let hash = self.board.hash;
                if let Err(e) = play_move(&mut self.board, move_str) {
                    warn!("stopping replay: {}", e);
                    break;
                }
                self.history.push(hash);
            }
        }

        debug!("position set: {}", self.board.to_fen());
    }

    fn go(&mut self, args: &[&str]) {
        self.stop_search();

        let tc = TimeControl::parse(args);
        let budget = tc.budget(self.board.side_to_move, self.config.move_overhead_ms);
        let depth = tc.depth.unwrap_or(self.config.max_depth) as i32;
        debug!("go: depth {} budget {:?}", depth, budget);

        self.stop.store(false, Ordering::Relaxed);
        let governor = TimeGovernor::with_budget(Arc::clone(&self.stop), budget);
        let engine = Arc::clone(&self.engine);
        let mut board = self.board;
        let history = self.history.clone();

        self.worker = Some(thread::spawn(move || {
            let result = engine.lock().search(
                &mut board,
                &history,
                SearchLimits::depth(depth),
                &governor,
                |info| println!("{}", info),
            );

            match result.best_move {
                Some(best_move) => println!("bestmove {}", best_move),
                None => println!("bestmove 0000"),
            }
        }));
    }

    /// Signals the running search, if any, and waits for its `bestmove`.
    fn stop_search(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.stop.store(true, Ordering::Relaxed);
            if worker.join().is_err() {
                warn!("search thread panicked");
            }
        }
    }

    fn setoption(&mut self, args: &[&str]) {
        if args.len() < 2 || args[0] != "name" {
            return;
        }

        let mut value_idx = 1;
        while value_idx < args.len() && args[value_idx] != "value" {
            value_idx += 1;
        }

        let name = args[1..value_idx].join(" ").to_lowercase();
        let value = args.get(value_idx + 1).copied();

        self.stop_search();

        match (name.as_str(), value) {
            ("clear hash", _) => {
                self.engine.lock().clear_tt();
                info!("hash cleared");
            }
            ("hash", Some(value)) => match value.parse::<usize>() {
                Ok(size_mb) => {
                    let size_mb = size_mb.clamp(MIN_HASH_MB, MAX_HASH_MB);
                    self.engine.lock().set_hash_size(size_mb);
                    self.config.hash_mb = size_mb;
                    info!("hash set to {} MB", size_mb);
                }
                Err(_) => warn!("invalid Hash value: {}", value),
            },
            _ => warn!("ignoring unknown option: {}", name),
        }
    }

    fn perft(&mut self, args: &[&str]) {
        let Some(depth) = args.first().and_then(|d| d.parse::<u32>().ok()) else {
            warn!("perft needs a depth");
            return;
        };

        let mut total = 0;
        for (mv, nodes) in divide(&self.board, depth) {
            println!("{}: {}", mv, nodes);
            total += nodes;
        }
        println!();
        println!("Nodes searched: {}", total);
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.stop_search();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> UciEngine {
        UciEngine::new(EngineConfig {
            hash_mb: 1,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_position_startpos_with_moves() {
        let mut uci = driver();
        assert!(uci.handle_command("position startpos moves e2e4 e7e5 g1f3"));
        assert_eq!(
            uci.board().to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
        assert_eq!(uci.history().len(), 3);
        assert_eq!(uci.history()[0], BoardState::startpos().hash);
    }

    #[test]
    fn test_position_fen() {
        let mut uci = driver();
        uci.handle_command("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4");
        assert_eq!(uci.board().to_fen(), "4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1");
        assert_eq!(uci.history().len(), 1);
    }

    #[test]
    fn test_replay_stops_at_illegal_move() {
        let mut uci = driver();
        uci.handle_command("position startpos moves e2e4 e2e4 d7d5");
        assert_eq!(uci.history().len(), 1);
        assert_eq!(uci.board().side_to_move, crate::board::Color::Black);

        // A bad FEN leaves the previous position alone.
        uci.handle_command("position fen not a fen");
        assert_eq!(uci.history().len(), 1);

        // So does a placement the move generator cannot handle.
        let before = *uci.board();
        uci.handle_command("position fen P3k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(*uci.board(), before);
    }

    #[test]
    fn test_go_depth_and_options() {
        let mut uci = driver();
        uci.handle_command("position startpos");
        uci.handle_command("go depth 2");
        uci.handle_command("stop");
        assert!(uci.worker.is_none());

        uci.handle_command("setoption name Hash value 2");
        assert_eq!(uci.config.hash_mb, 2);
        uci.handle_command("setoption name Clear Hash");
        assert!(uci.engine.lock().tt().is_empty());

        uci.handle_command("ucinewgame");
        assert_eq!(*uci.board(), BoardState::startpos());
        assert!(uci.handle_command("isready"));
        assert!(!uci.handle_command("quit"));
    }
}
