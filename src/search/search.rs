//! Iterative-deepening alpha-beta with quiescence, a shared transposition
//! table and cooperative cancellation.
//!
//! Cancellation is a sentinel, not an unwind: once the stop flag or the time
//! manager fires, every frame returns immediately and the caller discards
//! the partial iteration.

use std::time::Instant;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::board::Position;
use crate::moves::movegen::{generate_captures, generate_moves};
use crate::moves::types::{Move, MoveList, PrincipalVariation};
use crate::search::eval::evaluate;
use crate::search::ordering::{mvv_lva, order_moves};
use crate::search::time::{Limits, SearchControl};
use crate::search::tt::{Bound, TranspositionTable};
use crate::search::{DRAW, INF, MATE, MAX_PLY};

/// Poll the stop conditions every 4096 nodes.
const CHECKUP_MASK: u64 = 4095;

const LMR_MIN_DEPTH: i32 = 3;
const LMR_MIN_INDEX: usize = 4;
const HISTORY_BONUS_CAP: i32 = 400;

/// `REDUCTIONS[depth][index] = 1 + log2(depth) * log2(index) / 2`, clamped to
/// the table edge for deeper and later entries.
static REDUCTIONS: Lazy<[[i32; 64]; 64]> = Lazy::new(|| {
    let mut table = [[0i32; 64]; 64];
    for depth in 1..64 {
        for index in 1..64 {
            table[depth][index] =
                1 + ((depth as f64).log2() * (index as f64).log2() / 2.0) as i32;
        }
    }
    table
});

/// One iteration's progress line.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub depth: u32,
    pub score: i32,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u128,
    pub pv: PrincipalVariation,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best: Move,
    pub ponder: Move,
    pub score: i32,
    pub pv: PrincipalVariation,
    pub nodes: u64,
}

struct Searcher<'a> {
    pos: &'a mut Position,
    tt: &'a mut TranspositionTable,
    control: &'a SearchControl,
    nodes: u64,
    stopped: bool,
    killers: [[Move; 2]; MAX_PLY],
    history: [[i32; 64]; 64],
}

/// Run an iterative-deepening search. Reports each completed iteration
/// through `on_iteration`; partial iterations cut short by cancellation are
/// discarded. The control's running flag brackets the whole call.
pub fn search(
    pos: &mut Position,
    tt: &mut TranspositionTable,
    limits: &Limits,
    control: &SearchControl,
    mut on_iteration: impl FnMut(&SearchReport),
) -> SearchResult {
    let start = Instant::now();
    control.set_running(true);
    tt.age();

    let mut root_moves = MoveList::new();
    generate_moves(pos, &mut root_moves);

    let mut result = SearchResult {
        // never resign to a zero move while legal moves exist
        best: root_moves.first().copied().unwrap_or(Move::NULL),
        ponder: Move::NULL,
        score: 0,
        pv: PrincipalVariation::new(),
        nodes: 0,
    };

    let mut searcher = Searcher {
        pos,
        tt,
        control,
        nodes: 0,
        stopped: false,
        killers: [[Move::NULL; 2]; MAX_PLY],
        history: [[0; 64]; 64],
    };

    let max_depth = limits.depth.unwrap_or(MAX_PLY as u32 - 1).clamp(1, MAX_PLY as u32 - 1);
    if !root_moves.is_empty() {
        for depth in 1..=max_depth {
            let score = searcher.negamax(depth as i32, 0, -INF, INF);
            if searcher.stopped {
                break;
            }

            let pv = searcher.extract_pv(depth as usize);
            result.score = score;
            if !pv.is_empty() {
                result.best = pv.get(0);
                result.ponder = pv.get(1);
                result.pv = pv;
            }

            let elapsed = start.elapsed();
            let report = SearchReport {
                depth,
                score,
                nodes: searcher.nodes,
                nps: (searcher.nodes as f64 / elapsed.as_secs_f64().max(1e-6)) as u64,
                time_ms: elapsed.as_millis(),
                pv: result.pv.clone(),
            };
            debug!(depth, score, nodes = searcher.nodes, "iteration done");
            on_iteration(&report);

            if control.should_stop(searcher.nodes) {
                break;
            }
        }
    }

    result.nodes = searcher.nodes;
    control.set_running(false);
    result
}

impl Searcher<'_> {
    fn checkup(&mut self) {
        if self.nodes & CHECKUP_MASK == 0 && self.control.should_stop(self.nodes) {
            self.stopped = true;
        }
    }

    fn negamax(&mut self, depth: i32, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        self.checkup();
        if self.stopped {
            return 0;
        }
        self.nodes += 1;

        if ply > 0 {
            if self.pos.draw_clock() >= 100
                || self.pos.insufficient_material()
                || self.pos.is_repetition()
            {
                return DRAW;
            }
            if ply >= MAX_PLY - 1 {
                return evaluate(self.pos);
            }
        }

        let hash = self.pos.hash();
        let probe = self.tt.probe(hash, depth, alpha, beta, ply);
        if ply > 0 {
            if let Some(score) = probe.score {
                return score;
            }
        }

        let in_check = self.pos.in_check();
        if depth <= 0 && !in_check {
            return self.quiescence(ply, alpha, beta);
        }

        let mut list = MoveList::new();
        generate_moves(self.pos, &mut list);
        if list.is_empty() {
            return if in_check { -MATE + ply as i32 } else { DRAW };
        }
        order_moves(&mut list, self.pos, probe.best, &self.killers[ply], &self.history);

        // searching one ply deeper while in check resolves forced sequences
        let extension = i32::from(in_check);
        let original_alpha = alpha;
        let mut best_score = -INF;
        let mut best_move = Move::NULL;

        for (index, &mv) in list.iter().enumerate() {
            let child_depth = depth - 1 + extension;
            self.pos.make_move(mv);

            let score = if index == 0 {
                -self.negamax(child_depth, ply + 1, -beta, -alpha)
            } else {
                let quiet = !mv.is_capture() && !mv.is_promotion();
                let mut reduction = 0;
                if quiet && !in_check && depth >= LMR_MIN_DEPTH && index >= LMR_MIN_INDEX {
                    reduction = REDUCTIONS[depth.min(63) as usize][index.min(63)]
                        .min(child_depth - 1)
                        .max(0);
                }
                let mut score = -self.negamax(child_depth - reduction, ply + 1, -beta, -alpha);
                if reduction > 0 && score > alpha && !self.stopped {
                    // the reduced search failed high: verify at full depth
                    score = -self.negamax(child_depth, ply + 1, -beta, -alpha);
                }
                score
            };

            self.pos.unmake_move();
            if self.stopped {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                self.tt
                    .store(hash, depth, best_score, Bound::Lower, best_move.compact(), ply);
                if !mv.is_capture() {
                    self.remember_quiet_cutoff(mv, ply, depth);
                }
                return best_score;
            }
        }

        let bound = if alpha > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt.store(hash, depth, best_score, bound, best_move.compact(), ply);
        best_score
    }

    fn quiescence(&mut self, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        self.checkup();
        if self.stopped {
            return 0;
        }
        self.nodes += 1;

        let stand_pat = evaluate(self.pos);
        if ply >= MAX_PLY - 1 || stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut list = MoveList::new();
        generate_captures(self.pos, &mut list);
        list.sort_by_cached_key(|&mv| {
            -(mvv_lva(self.pos, mv) + if mv.is_promotion() { 1_000 } else { 0 })
        });

        let mut best = stand_pat;
        for &mv in &list {
            self.pos.make_move(mv);
            let score = -self.quiescence(ply + 1, -beta, -alpha);
            self.pos.unmake_move();
            if self.stopped {
                return 0;
            }
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    fn remember_quiet_cutoff(&mut self, mv: Move, ply: usize, depth: i32) {
        if self.killers[ply][0] != mv {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = mv;
        }
        let bonus = (depth * depth).min(HISTORY_BONUS_CAP);
        self.history[mv.from().index() as usize][mv.to().index() as usize] += bonus;
    }

    /// Rebuild the best line by following transposition-table best moves from
    /// the root; stops at the first unknown or repeated position.
    fn extract_pv(&mut self, max_len: usize) -> PrincipalVariation {
        let mut pv = PrincipalVariation::new();
        let mut made = 0;
        while made < max_len {
            let best = self.tt.probe_move(self.pos.hash());
            if best == 0 {
                break;
            }
            let mut list = MoveList::new();
            generate_moves(self.pos, &mut list);
            let Some(&mv) = list.iter().find(|m| m.compact() == best) else {
                break;
            };
            pv.push(mv);
            self.pos.make_move(mv);
            made += 1;
            if self.pos.is_repetition() {
                break;
            }
        }
        for _ in 0..made {
            self.pos.unmake_move();
        }
        pv
    }
}
