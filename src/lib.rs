pub mod bitboard;
pub mod board;
pub mod config;
pub mod error;
pub mod eval;
pub mod movegen;
pub mod perft;
pub mod search;
pub mod time;
pub mod tt;
pub mod uci;
pub mod zobrist;

pub use board::{BoardState, Color, MoveGuard, Piece, PieceKind, STARTPOS};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use eval::{Evaluate, Evaluator};
pub use movegen::{parse_move, play_move, Move, MoveGenerator, MoveKind};
pub use perft::{divide, perft};
pub use search::{Score, SearchEngine, SearchInfo, SearchLimits, SearchResult};
pub use time::{TimeControl, TimeGovernor};
pub use tt::TranspositionTable;

#[cfg(feature = "python")]
mod python {
    use super::{play_move, BoardState, SearchEngine, SearchLimits, TimeGovernor};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::PyDict;
    use std::time::Duration;

    #[pymodule]
    fn rookery(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<PyEngine>()?;
        m.add_class::<PyBoardState>()?;
        Ok(())
    }

    #[pyclass(name = "Engine")]
    struct PyEngine {
        engine: SearchEngine,
    }

    #[pymethods]
    impl PyEngine {
        #[new]
        #[pyo3(signature = (hash_mb=None))]
        fn new(hash_mb: Option<usize>) -> Self {
            PyEngine {
                engine: SearchEngine::new(hash_mb.unwrap_or(64)),
            }
        }

        #[pyo3(signature = (fen, depth=None, time_ms=None))]
        fn search(&mut self, py: Python<'_>, fen: &str, depth: Option<i32>, time_ms: Option<u64>) -> PyResult<PyObject> {
            let mut board = BoardState::from_fen(fen).map_err(|e| PyValueError::new_err(e.to_string()))?;
            let governor = TimeGovernor::with_budget(
                std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
                time_ms.map(Duration::from_millis),
            );
            let limits = depth.map_or_else(SearchLimits::default, SearchLimits::depth);

            let result = py.allow_threads(|| self.engine.search(&mut board, &[], limits, &governor, |_| {}));

            let dict = PyDict::new_bound(py);
            let move_str = result.best_move.map_or_else(|| "none".to_string(), |m| m.to_uci());
            dict.set_item("move", move_str)?;
            dict.set_item("score", result.score)?;
            dict.set_item("depth", result.depth)?;
            dict.set_item("nodes", result.nodes)?;
            Ok(dict.into())
        }

        fn new_game(&mut self) {
            self.engine.new_game();
        }

        fn set_hash_size(&mut self, size_mb: usize) {
            self.engine.set_hash_size(size_mb);
        }
    }

    #[pyclass(name = "Board")]
    struct PyBoardState {
        board: BoardState,
    }

    #[pymethods]
    impl PyBoardState {
        #[new]
        #[pyo3(signature = (fen=None))]
        fn new(fen: Option<&str>) -> PyResult<Self> {
            let board = match fen {
                Some(fen) => BoardState::from_fen(fen).map_err(|e| PyValueError::new_err(e.to_string()))?,
                None => BoardState::default(),
            };
            Ok(PyBoardState { board })
        }

        fn to_fen(&self) -> String {
            self.board.to_fen()
        }

        /// Plays a coordinate move; returns False if it is not legal here.
        fn make_move(&mut self, uci: &str) -> bool {
            play_move(&mut self.board, uci).is_ok()
        }

        fn is_in_check(&self) -> bool {
            self.board.in_check()
        }

        fn __str__(&self) -> String {
            self.board.to_string()
        }
    }
}
