use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;

use meridian::logger::init_logging;
use meridian::uci::{Engine, Flow, StdoutSink};

fn main() -> ExitCode {
    init_logging("logs/meridian.log", "info");

    let mut engine = Engine::new(Arc::new(StdoutSink));
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("input error: {err}");
                return ExitCode::FAILURE;
            }
        };
        match engine.handle_line(line.trim()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => return ExitCode::SUCCESS,
            // diagnostics keep the REPL alive
            Err(err) => println!("info string {err}"),
        }
    }
    ExitCode::SUCCESS
}
