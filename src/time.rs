use crate::board::Color;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MOVES_TO_GO: u64 = 30;
const SLICE_MARGIN_THRESHOLD_MS: u64 = 1500;
const SLICE_MARGIN_MS: u64 = 50;

/// Cancellation signal polled by the search: an external stop flag plus an
/// optional wall-clock deadline.
#[derive(Clone, Debug)]
pub struct TimeGovernor {
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl TimeGovernor {
    pub fn new(stop: Arc<AtomicBool>, deadline: Option<Instant>) -> Self {
        TimeGovernor { stop, deadline }
    }

    /// Starts the clock now, stopping after `budget` if one is given.
    pub fn with_budget(stop: Arc<AtomicBool>, budget: Option<Duration>) -> Self {
        Self::new(stop, budget.map(|b| Instant::now() + b))
    }

    pub fn unlimited() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), None)
    }

    pub fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

}

/// Clock parameters of a `go` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeControl {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
    pub infinite: bool,
}

impl TimeControl {
    /// Parses the arguments following `go`. Unknown tokens and unparsable
    /// values are skipped.
    pub fn parse(args: &[&str]) -> Self {
        let mut tc = TimeControl::default();
        let mut i = 0;

        while i < args.len() {
            let value = args.get(i + 1).and_then(|v| v.parse::<u64>().ok());
            let consumed = match args[i] {
                "wtime" => { tc.wtime = value; 2 }
                "btime" => { tc.btime = value; 2 }
                "winc" => { tc.winc = value; 2 }
                "binc" => { tc.binc = value; 2 }
                "movestogo" => { tc.movestogo = value.filter(|&n| n > 0); 2 }
                "movetime" => { tc.movetime = value; 2 }
                "depth" => { tc.depth = value.and_then(|d| u32::try_from(d).ok()); 2 }
                "infinite" => { tc.infinite = true; 1 }
                _ => 1,
            };
            i += consumed;
        }

        tc
    }

    /// Thinking time for `side`, or `None` when the search should run until
    /// stopped or until its depth limit.
    pub fn budget(&self, side: Color, overhead_ms: u64) -> Option<Duration> {
        if self.infinite {
            return None;
        }

        let (clock, inc) = match side {
            Color::White => (self.wtime, self.winc),
            Color::Black => (self.btime, self.binc),
        };

        let (time, moves_to_go) = match self.movetime {
            Some(movetime) => (movetime, 1),
            None => (clock?, self.movestogo.unwrap_or(DEFAULT_MOVES_TO_GO)),
        };

        let mut slice = time / moves_to_go;
        if slice > SLICE_MARGIN_THRESHOLD_MS {
            slice -= SLICE_MARGIN_MS;
        }
        slice += inc.unwrap_or(0);

        Some(Duration::from_millis(slice.saturating_sub(overhead_ms)))
    }
}
