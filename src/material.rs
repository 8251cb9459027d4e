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

//! Material-only evaluation with a single weight per piece kind. Mostly a
//! vehicle for drills and smoke tests; the interesting evaluation lives in
//! `classical`.

use shakmaty::{Chess, Color, Position, Role};

use crate::emit;
use crate::eval::{piece_count, Evaluation, Evaluator};
use crate::score::Weight;

const PIECE_VALUES: [i32; 5] = [100, 300, 300, 500, 900];

const PIECE_NAMES: [&str; 5] = [
    "PAWN_VALUE",
    "KNIGHT_VALUE",
    "BISHOP_VALUE",
    "ROOK_VALUE",
    "QUEEN_VALUE",
];

const ROLES: [Role; 5] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
];

pub struct MaterialEval;

impl Evaluator for MaterialEval {
    const NAME: &'static str = "material";

    const TAPERED: bool = false;
    const INCLUDES_ADDITIONAL_SCORE: bool = false;
    const SUPPORTS_EXTERNAL_BOARD: bool = true;

    const PREFERRED_K: f64 = 2.5;
    const MAX_EPOCH: u32 = 5_000;
    const INITIAL_LEARNING_RATE: f64 = 0.03;
    const LEARNING_RATE_DROP_INTERVAL: u32 = 1_000;
    const LEARNING_RATE_DROP_RATIO: f64 = 0.5;
    const RETUNE_FROM_ZERO: bool = false;
    const ENABLE_QSEARCH: bool = false;
    const FILTER_IN_CHECK: bool = false;

    fn initial_parameters() -> Vec<Weight> {
        PIECE_VALUES
            .iter()
            .map(|&value| Weight::splat(f64::from(value)))
            .collect()
    }

    fn evaluate(pos: &Chess) -> Evaluation {
        let board = pos.board();

        let mut trace = [[0i16; 2]; 5];
        for (piece, &role) in ROLES.iter().enumerate() {
            trace[piece][1] = piece_count(board, Color::White, role) as i16;
            trace[piece][0] = piece_count(board, Color::Black, role) as i16;
        }

        let mut score = 0;
        let mut coefficients = Vec::with_capacity(ROLES.len());
        for (piece, counts) in trace.iter().enumerate() {
            let net = counts[1] - counts[0];
            score += i32::from(net) * PIECE_VALUES[piece];
            coefficients.push(net);
        }

        Evaluation {
            score,
            endgame_scale: 1.0,
            coefficients,
        }
    }

    fn print_parameters(parameters: &[Weight]) {
        for (piece, name) in PIECE_NAMES.iter().enumerate() {
            println!("{}", emit::value(name, parameters[piece]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::CastlingMode;

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    #[test]
    fn test_coefficient_length_matches_parameters() {
        let evaluation = MaterialEval::evaluate(&Chess::default());
        assert_eq!(
            evaluation.coefficients.len(),
            MaterialEval::initial_parameters().len()
        );
    }

    #[test]
    fn test_balanced_position_has_zero_coefficients() {
        let evaluation = MaterialEval::evaluate(&Chess::default());
        assert!(evaluation.coefficients.iter().all(|&c| c == 0));
        assert_eq!(evaluation.score, 0);
    }

    #[test]
    fn test_extra_white_pawn() {
        // Starting position with the black b-pawn removed.
        let pos = position("rnbqkbnr/p1pppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let evaluation = MaterialEval::evaluate(&pos);
        assert_eq!(evaluation.coefficients[0], 1);
        assert_eq!(evaluation.score, 100);
    }

    #[test]
    fn test_mirrored_position_negates_coefficients() {
        let pos = position("rnbqkbnr/p1pppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let mirrored = position("rnbqkbnr/pppppppp/8/8/8/8/P1PPPPPP/RNBQKBNR b KQkq - 0 1");
        let a = MaterialEval::evaluate(&pos);
        let b = MaterialEval::evaluate(&mirrored);
        for (x, y) in a.coefficients.iter().zip(&b.coefficients) {
            assert_eq!(*x, -y);
        }
    }
}
