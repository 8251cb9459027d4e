/* Tangent, a Texel tuner for chess evaluations
   Copyright (C) 2018-2020  Maximilian Lupke

   This program is free software: you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation, either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use shakmaty::{Board, Chess, Color, Position, Role};

use crate::score::{Weight, MAX_PHASE};

/// What an evaluation reports for a single position.
pub struct Evaluation {
    /// Static score in centipawns from white's perspective, computed with
    /// the evaluation's built-in weights.
    pub score: i32,
    /// Damping applied to the endgame half for this position, in (0, 1].
    pub endgame_scale: f64,
    /// Dense coefficient vector: for every tunable parameter, how often the
    /// term fired for white minus how often it fired for black.
    pub coefficients: Vec<i16>,
}

/// The contract a tunable evaluation implements.
///
/// The evaluation is chosen at build time (`config::TunedEval`), so all of
/// this monomorphizes; there are no virtual calls in coefficient extraction,
/// which runs once per visited node during quiescence.
///
/// The parameter ordering must be consistent between `initial_parameters`,
/// `evaluate` and `print_parameters`; nothing else about the term layout is
/// prescribed.
pub trait Evaluator {
    /// Identifier used in progress output.
    const NAME: &'static str;

    /// Whether parameters carry separate midgame/endgame halves.
    const TAPERED: bool;

    /// Whether the reported score contains residue outside the span of the
    /// parameter vector (tempo, scaling remainders). If set, the loader
    /// caches `score - linear` per entry.
    const INCLUDES_ADDITIONAL_SCORE: bool;

    /// Whether `evaluate` accepts an already-parsed board. Required for
    /// quiescence, which hands the evaluation interior nodes directly.
    const SUPPORTS_EXTERNAL_BOARD: bool;

    /// Fixed sigmoid scale; any value <= 0 requests calibration.
    const PREFERRED_K: f64;

    const MAX_EPOCH: u32;
    const INITIAL_LEARNING_RATE: f64;
    const LEARNING_RATE_DROP_INTERVAL: u32;
    const LEARNING_RATE_DROP_RATIO: f64;

    /// Start from a zeroed parameter vector instead of the built-in weights.
    const RETUNE_FROM_ZERO: bool;

    /// Resolve every training position to a quiet leaf before extraction.
    const ENABLE_QSEARCH: bool;

    /// Skip root positions where the side to move is in check.
    const FILTER_IN_CHECK: bool;

    fn initial_parameters() -> Vec<Weight>;

    fn evaluate(pos: &Chess) -> Evaluation;

    /// Writes the parameter vector to stdout as a source fragment the engine
    /// can take back verbatim.
    fn print_parameters(parameters: &[Weight]);
}

/// Game phase of a position: one unit per knight or bishop, two per rook,
/// four per queen, over both colors, clamped to `MAX_PHASE`. Positions with
/// promoted material can briefly exceed the cap.
pub fn phase(pos: &Chess) -> i32 {
    let board = pos.board();
    let minors = (board.by_role(Role::Knight) | board.by_role(Role::Bishop)).count() as i32;
    let rooks = board.by_role(Role::Rook).count() as i32;
    let queens = board.by_role(Role::Queen).count() as i32;
    (minors + 2 * rooks + 4 * queens).min(MAX_PHASE)
}

pub fn piece_count(board: &Board, color: Color, role: Role) -> i32 {
    (board.by_color(color) & board.by_role(role)).count() as i32
}
