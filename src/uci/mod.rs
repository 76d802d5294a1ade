//! The UCI command interface: one command per line on stdin, replies on
//! stdout.
//!
//! Two threads matter: the command thread running `Engine::handle_line` and
//! the search thread spawned by `go`. They share the transposition table
//! (behind a mutex the search holds for its duration), a `SearchControl` for
//! cooperative cancellation, and the output `Sink`. The engine's own
//! `Position` is never the one the search mutates; `go` hands the search
//! thread a clone.

mod error;

pub use error::UciError;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::info;

use crate::board::{Color, Position};
use crate::moves::movegen::generate_moves;
use crate::moves::perft::perft_divide;
use crate::moves::types::{Move, MoveList};
use crate::search::search::{SearchReport, search};
use crate::search::time::{Limits, SearchControl, TimeManager};
use crate::search::tt::TranspositionTable;
use crate::search::{MATE, MATE_BOUND};

pub const ENGINE_NAME: &str = "Meridian";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_AUTHOR: &str = "the Meridian authors";

const HASH_MIN_MB: usize = 1;
const HASH_MAX_MB: usize = 33_554_432;

/// Where protocol output goes. Production uses stdout; tests collect lines.
pub trait Sink: Send + Sync {
    fn line(&self, text: &str);
}

pub struct StdoutSink;

impl Sink for StdoutSink {
    fn line(&self, text: &str) {
        println!("{text}");
    }
}

/// Options the engine accepts via `setoption`.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub ponder: bool,
    /// Reserved: only 1 is accepted.
    pub threads: usize,
}

impl Default for EngineOptions {
    fn default() -> EngineOptions {
        EngineOptions {
            hash_mb: 16,
            ponder: false,
            threads: 1,
        }
    }
}

pub enum Flow {
    Continue,
    Quit,
}

struct ActiveSearch {
    control: Arc<SearchControl>,
    handle: JoinHandle<()>,
    pondering: bool,
    /// The clock arguments `go ponder` carried, applied on `ponderhit`.
    real_limits: Limits,
    side_to_move: Color,
}

pub struct Engine {
    pos: Position,
    options: EngineOptions,
    tt: Arc<Mutex<TranspositionTable>>,
    sink: Arc<dyn Sink>,
    active: Option<ActiveSearch>,
}

impl Engine {
    pub fn new(sink: Arc<dyn Sink>) -> Engine {
        let options = EngineOptions::default();
        Engine {
            pos: Position::startpos(),
            tt: Arc::new(Mutex::new(TranspositionTable::new(options.hash_mb))),
            options,
            sink,
            active: None,
        }
    }

    /// Dispatch one command line. Errors are diagnostics: the caller prints
    /// them and continues reading.
    pub fn handle_line(&mut self, line: &str) -> Result<Flow, UciError> {
        self.reap_finished();

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else {
            return Ok(Flow::Continue);
        };

        match command {
            "uci" => self.cmd_uci(),
            "isready" => self.sink.line("readyok"),
            "ucinewgame" => self.cmd_newgame()?,
            "position" => self.cmd_position(&tokens[1..])?,
            "go" => self.cmd_go(&tokens[1..])?,
            "stop" => self.cmd_stop()?,
            "ponderhit" => self.cmd_ponderhit()?,
            "setoption" => self.cmd_setoption(&tokens[1..])?,
            "d" => self.cmd_display(),
            "perft" => self.cmd_perft(&tokens[1..])?,
            "quit" => {
                self.abort_search();
                return Ok(Flow::Quit);
            }
            other => return Err(UciError::Parse(format!("unknown command {other:?}"))),
        }
        Ok(Flow::Continue)
    }

    fn cmd_uci(&self) {
        self.sink
            .line(&format!("id name {ENGINE_NAME} {ENGINE_VERSION}"));
        self.sink.line(&format!("id author {ENGINE_AUTHOR}"));
        self.sink.line(&format!(
            "option name Hash type spin default {} min {HASH_MIN_MB} max {HASH_MAX_MB}",
            EngineOptions::default().hash_mb
        ));
        self.sink
            .line("option name Ponder type check default false");
        self.sink
            .line("option name Threads type spin default 1 min 1 max 1");
        self.sink.line("uciok");
    }

    fn cmd_newgame(&mut self) -> Result<(), UciError> {
        self.ensure_idle("ucinewgame")?;
        self.tt.lock().clear();
        self.pos = Position::startpos();
        Ok(())
    }

    fn cmd_position(&mut self, args: &[&str]) -> Result<(), UciError> {
        let mut pos;
        let mut rest;
        match args.first() {
            Some(&"startpos") => {
                pos = Position::startpos();
                rest = &args[1..];
            }
            Some(&"fen") => {
                let end = args
                    .iter()
                    .position(|&t| t == "moves")
                    .unwrap_or(args.len());
                if end == 1 {
                    return Err(UciError::Usage("fen requires fields".into()));
                }
                pos = Position::from_fen(&args[1..end].join(" "))?;
                rest = &args[end..];
            }
            Some(other) => {
                return Err(UciError::Usage(format!(
                    "expected startpos or fen, got {other:?}"
                )));
            }
            None => {
                return Err(UciError::Usage(
                    "position requires startpos or fen".into(),
                ));
            }
        }

        if let Some(&"moves") = rest.first() {
            rest = &rest[1..];
            for &text in rest {
                let mv = parse_move(&pos, text)?;
                pos.make_move(mv);
            }
        } else if !rest.is_empty() {
            return Err(UciError::Parse(format!("unexpected token {:?}", rest[0])));
        }

        self.pos = pos;
        Ok(())
    }

    fn cmd_go(&mut self, args: &[&str]) -> Result<(), UciError> {
        self.ensure_idle("go")?;
        let limits = parse_go(args)?;
        if limits.ponder && !self.options.ponder {
            return Err(UciError::Usage(
                "go ponder requires the Ponder option".into(),
            ));
        }

        let side = self.pos.side_to_move();
        let manager = TimeManager::from_limits(&limits, side);
        let control = Arc::new(SearchControl::new(manager));

        let mut pos = self.pos.clone();
        let tt = Arc::clone(&self.tt);
        let thread_control = Arc::clone(&control);
        let sink = Arc::clone(&self.sink);
        let thread_limits = limits.clone();

        let handle = thread::Builder::new()
            .name("search".into())
            .spawn(move || {
                let mut tt = tt.lock();
                let result = search(&mut pos, &mut tt, &thread_limits, &thread_control, |report| {
                    sink.line(&format_report(report));
                });
                let mut line = format!("bestmove {}", result.best);
                if !result.ponder.is_null() {
                    line.push_str(&format!(" ponder {}", result.ponder));
                }
                sink.line(&line);
            })
            .map_err(|e| UciError::State(format!("cannot spawn search thread: {e}")))?;

        info!(ponder = limits.ponder, "search started");
        self.active = Some(ActiveSearch {
            control,
            handle,
            pondering: limits.ponder,
            real_limits: Limits {
                ponder: false,
                ..limits
            },
            side_to_move: side,
        });
        Ok(())
    }

    fn cmd_stop(&mut self) -> Result<(), UciError> {
        let Some(active) = self.active.take() else {
            return Err(UciError::State("no search is running".into()));
        };
        active.control.request_stop();
        // bestmove is printed by the search thread before this returns
        let _ = active.handle.join();
        Ok(())
    }

    fn cmd_ponderhit(&mut self) -> Result<(), UciError> {
        let Some(active) = self.active.as_mut() else {
            return Err(UciError::State("no search is running".into()));
        };
        if !active.pondering {
            return Err(UciError::State("not pondering".into()));
        }
        // wait until the search thread is observably running so the manager
        // swap cannot be overwritten by its startup; the search either sets
        // the flag or terminates
        while !active.control.is_running() && !active.handle.is_finished() {
            thread::yield_now();
        }
        active
            .control
            .replace_manager(TimeManager::from_limits(&active.real_limits, active.side_to_move));
        active.pondering = false;
        Ok(())
    }

    fn cmd_setoption(&mut self, args: &[&str]) -> Result<(), UciError> {
        if args.first() != Some(&"name") {
            return Err(UciError::Usage("setoption requires name".into()));
        }
        let value_at = args.iter().position(|&t| t == "value");
        let name = args[1..value_at.unwrap_or(args.len())].join(" ");
        let value = value_at.map(|i| args[i + 1..].join(" "));

        match name.as_str() {
            "Hash" => {
                self.ensure_idle("setoption Hash")?;
                let mb: usize = value
                    .as_deref()
                    .unwrap_or("")
                    .parse()
                    .map_err(|_| UciError::Usage("Hash requires an integer value".into()))?;
                if !(HASH_MIN_MB..=HASH_MAX_MB).contains(&mb) {
                    return Err(UciError::Usage(format!("Hash out of range: {mb}")));
                }
                self.options.hash_mb = mb;
                self.tt.lock().resize(mb);
            }
            "Ponder" => {
                self.options.ponder = match value.as_deref() {
                    Some("true") => true,
                    Some("false") => false,
                    _ => return Err(UciError::Usage("Ponder requires true or false".into())),
                };
            }
            "Threads" => {
                let threads: usize = value
                    .as_deref()
                    .unwrap_or("")
                    .parse()
                    .map_err(|_| UciError::Usage("Threads requires an integer value".into()))?;
                if threads != 1 {
                    return Err(UciError::Usage("Threads supports only 1".into()));
                }
                self.options.threads = threads;
            }
            other => return Err(UciError::Usage(format!("unknown option {other:?}"))),
        }
        Ok(())
    }

    fn cmd_display(&self) {
        self.sink.line(&self.pos.board_string());
        self.sink.line(&format!("Fen: {}", self.pos.to_fen()));
    }

    fn cmd_perft(&mut self, args: &[&str]) -> Result<(), UciError> {
        let depth: u32 = args
            .first()
            .unwrap_or(&"1")
            .parse()
            .map_err(|_| UciError::Parse("perft requires a depth".into()))?;
        let start = Instant::now();
        let mut pos = self.pos.clone();
        let divided = perft_divide(&mut pos, depth);
        let total: u64 = divided.iter().map(|(_, nodes)| nodes).sum();
        for (text, nodes) in divided {
            self.sink.line(&format!("{text}: {nodes}"));
        }
        self.sink.line(&format!(
            "perft {depth}: {total} nodes in {} ms",
            start.elapsed().as_millis()
        ));
        Ok(())
    }

    /// Engine state check for commands that need an idle searcher.
    fn ensure_idle(&mut self, what: &str) -> Result<(), UciError> {
        self.reap_finished();
        if self.active.is_some() {
            return Err(UciError::State(format!("{what} while a search is running")));
        }
        Ok(())
    }

    /// A completed search thread transitions the engine back to idle.
    fn reap_finished(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.handle.is_finished())
        {
            if let Some(active) = self.active.take() {
                let _ = active.handle.join();
            }
        }
    }

    fn abort_search(&mut self) {
        if let Some(active) = self.active.take() {
            active.control.request_stop();
            let _ = active.handle.join();
        }
    }
}

/// Resolve a long-algebraic move string against the legal moves of `pos`.
fn parse_move(pos: &Position, text: &str) -> Result<Move, UciError> {
    let mut list = MoveList::new();
    generate_moves(pos, &mut list);
    list.iter()
        .copied()
        .find(|mv| mv.to_string() == text)
        .ok_or_else(|| UciError::Parse(format!("illegal move {text:?}")))
}

fn parse_go(args: &[&str]) -> Result<Limits, UciError> {
    let mut limits = Limits::default();

    let mut iter = args.iter();
    while let Some(&token) = iter.next() {
        let mut next_u64 = |what: &str| -> Result<u64, UciError> {
            iter.next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| UciError::Parse(format!("{what} requires a number")))
        };
        match token {
            "depth" => limits.depth = Some(next_u64("depth")? as u32),
            "nodes" => limits.nodes = Some(next_u64("nodes")?),
            "movetime" => limits.movetime = Some(next_u64("movetime")?),
            "wtime" => limits.wtime = Some(next_u64("wtime")?),
            "btime" => limits.btime = Some(next_u64("btime")?),
            "winc" => limits.winc = Some(next_u64("winc")?),
            "binc" => limits.binc = Some(next_u64("binc")?),
            "movestogo" => limits.movestogo = Some(next_u64("movestogo")? as u32),
            "infinite" => limits.infinite = true,
            "ponder" => limits.ponder = true,
            other => return Err(UciError::Parse(format!("unknown go token {other:?}"))),
        }
    }

    let clock = limits.wtime.is_some()
        || limits.btime.is_some()
        || limits.winc.is_some()
        || limits.binc.is_some()
        || limits.movestogo.is_some();
    let exclusive = usize::from(limits.movetime.is_some())
        + usize::from(limits.infinite)
        + usize::from(clock);
    if exclusive > 1 {
        return Err(UciError::Usage(
            "movetime, infinite and clock controls are mutually exclusive".into(),
        ));
    }
    if clock && (limits.wtime.is_none() || limits.btime.is_none()) {
        return Err(UciError::Usage(
            "clock controls require both wtime and btime".into(),
        ));
    }
    if limits.winc.is_some() != limits.binc.is_some() {
        return Err(UciError::Usage(
            "winc and binc must appear together".into(),
        ));
    }
    Ok(limits)
}

fn format_score(score: i32) -> String {
    if score > MATE_BOUND {
        format!("mate {}", (MATE - score + 1) / 2)
    } else if score < -MATE_BOUND {
        format!("mate -{}", (MATE + score + 1) / 2)
    } else {
        format!("cp {score}")
    }
}

fn format_report(report: &SearchReport) -> String {
    format!(
        "info depth {} score {} nodes {} nps {} time {} pv {}",
        report.depth,
        format_score(report.score),
        report.nodes,
        report.nps,
        report.time_ms,
        report.pv
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_token_validation() {
        assert!(parse_go(&["depth", "6"]).is_ok());
        assert!(parse_go(&["wtime", "1000", "btime", "1000"]).is_ok());
        assert!(parse_go(&["movetime", "100", "infinite"]).is_err());
        assert!(parse_go(&["wtime", "1000"]).is_err());
        assert!(parse_go(&["wtime", "1000", "btime", "1000", "winc", "10"]).is_err());
        assert!(parse_go(&["bogus"]).is_err());
    }

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(MATE - 3), "mate 2");
        assert_eq!(format_score(MATE - 1), "mate 1");
        assert_eq!(format_score(-(MATE - 4)), "mate -2");
    }

    #[test]
    fn move_parsing_rejects_illegal() {
        let pos = Position::startpos();
        assert!(parse_move(&pos, "e2e4").is_ok());
        assert!(parse_move(&pos, "e2e5").is_err());
        assert!(parse_move(&pos, "zz99").is_err());
    }
}
