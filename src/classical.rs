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

//! The hand-crafted tapered evaluation: material, piece-square tables,
//! mobility, pawn structure and rook files. Evaluation walks the board once
//! while counting, per term, how often it fired for either color; the signed
//! count difference is the term's coefficient.

use shakmaty::{attacks, Bitboard, Board, Chess, Color, Position, Role};

use crate::emit;
use crate::eval::{self, piece_count, Evaluation, Evaluator};
use crate::score::{Weight, MAX_PHASE};

// Parameter vector layout. The ordering here, in `Trace::coefficients` and
// in `print_parameters` must stay in lockstep.
const MATERIAL: usize = 0;
const PST: usize = MATERIAL + 5;
const MOBILITY_KNIGHT: usize = PST + 6 * 64;
const MOBILITY_BISHOP: usize = MOBILITY_KNIGHT + 9;
const MOBILITY_ROOK: usize = MOBILITY_BISHOP + 14;
const MOBILITY_QUEEN: usize = MOBILITY_ROOK + 15;
const BISHOP_PAIR: usize = MOBILITY_QUEEN + 28;
const ROOK_OPEN_FILE: usize = BISHOP_PAIR + 1;
const ROOK_HALFOPEN_FILE: usize = ROOK_OPEN_FILE + 1;
const DOUBLED_PAWN: usize = ROOK_HALFOPEN_FILE + 1;
const ISOLATED_PAWN: usize = DOUBLED_PAWN + 1;
const PASSED_PAWN: usize = ISOLATED_PAWN + 1;
const PARAMETER_COUNT: usize = PASSED_PAWN + 8;

const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

const PIECE_VALUES: [Weight; 5] = [
    Weight::new(100.0, 120.0),
    Weight::new(320.0, 300.0),
    Weight::new(330.0, 320.0),
    Weight::new(500.0, 550.0),
    Weight::new(950.0, 1000.0),
];

const BISHOP_PAIR_WEIGHT: Weight = Weight::new(25.0, 45.0);
const ROOK_OPEN_FILE_WEIGHT: Weight = Weight::new(30.0, 10.0);
const ROOK_HALFOPEN_FILE_WEIGHT: Weight = Weight::new(12.0, 15.0);
const DOUBLED_PAWN_WEIGHT: Weight = Weight::new(-8.0, -18.0);
const ISOLATED_PAWN_WEIGHT: Weight = Weight::new(-16.0, -8.0);

// Indexed by relative rank, most advanced first; ranks 0 and 7 cannot hold a
// pawn.
const PASSED_PAWN_WEIGHTS: [Weight; 8] = [
    Weight::ZERO,
    Weight::new(60.0, 130.0),
    Weight::new(45.0, 85.0),
    Weight::new(28.0, 48.0),
    Weight::new(16.0, 26.0),
    Weight::new(10.0, 12.0),
    Weight::new(6.0, 8.0),
    Weight::ZERO,
];

/// Fixed side-to-move bonus. Not spanned by the parameter vector; it reaches
/// the tuner through `additional_score`.
const TEMPO: f64 = 12.0;

/// Scale between piece-square table units and material units in the engine
/// source.
const PST_QUANTIZATION: f64 = 1.0;

// Piece-square tables and mobility start at zero and are tuned from scratch.
const fn default_parameters() -> [Weight; PARAMETER_COUNT] {
    let mut parameters = [Weight::ZERO; PARAMETER_COUNT];
    let mut i = 0;
    while i < 5 {
        parameters[MATERIAL + i] = PIECE_VALUES[i];
        i += 1;
    }
    parameters[BISHOP_PAIR] = BISHOP_PAIR_WEIGHT;
    parameters[ROOK_OPEN_FILE] = ROOK_OPEN_FILE_WEIGHT;
    parameters[ROOK_HALFOPEN_FILE] = ROOK_HALFOPEN_FILE_WEIGHT;
    parameters[DOUBLED_PAWN] = DOUBLED_PAWN_WEIGHT;
    parameters[ISOLATED_PAWN] = ISOLATED_PAWN_WEIGHT;
    let mut i = 0;
    while i < 8 {
        parameters[PASSED_PAWN + i] = PASSED_PAWN_WEIGHTS[i];
        i += 1;
    }
    parameters
}

static DEFAULTS: [Weight; PARAMETER_COUNT] = default_parameters();

const MATERIAL_NAMES: [&str; 5] = [
    "PAWN_SCORE",
    "KNIGHT_SCORE",
    "BISHOP_SCORE",
    "ROOK_SCORE",
    "QUEEN_SCORE",
];

const PST_NAMES: [&str; 6] = [
    "PAWN_PST",
    "KNIGHT_PST",
    "BISHOP_PST",
    "ROOK_PST",
    "QUEEN_PST",
    "KING_PST",
];

/// Per-term firing counts, `[black, white]` like everywhere else.
struct Trace {
    material: [[i16; 2]; 5],
    pst: [[[i16; 2]; 64]; 6],
    mobility_knight: [[i16; 2]; 9],
    mobility_bishop: [[i16; 2]; 14],
    mobility_rook: [[i16; 2]; 15],
    mobility_queen: [[i16; 2]; 28],
    bishop_pair: [i16; 2],
    rook_open_file: [i16; 2],
    rook_halfopen_file: [i16; 2],
    doubled_pawn: [i16; 2],
    isolated_pawn: [i16; 2],
    passed_pawn: [[i16; 2]; 8],
}

impl Trace {
    fn new() -> Trace {
        Trace {
            material: [[0; 2]; 5],
            pst: [[[0; 2]; 64]; 6],
            mobility_knight: [[0; 2]; 9],
            mobility_bishop: [[0; 2]; 14],
            mobility_rook: [[0; 2]; 15],
            mobility_queen: [[0; 2]; 28],
            bishop_pair: [0; 2],
            rook_open_file: [0; 2],
            rook_halfopen_file: [0; 2],
            doubled_pawn: [0; 2],
            isolated_pawn: [0; 2],
            passed_pawn: [[0; 2]; 8],
        }
    }

    fn from_position(pos: &Chess) -> Trace {
        let board = pos.board();
        let mut trace = Trace::new();
        for &color in &[Color::White, Color::Black] {
            trace.count_material(board, color);
            trace.count_psts(board, color);
            trace.count_mobility(board, color);
            trace.count_pawns(board, color);
            trace.count_rooks(board, color);
        }
        trace
    }

    fn count_material(&mut self, board: &Board, color: Color) {
        let side = color.is_white() as usize;
        for (piece, &role) in ROLES[..5].iter().enumerate() {
            self.material[piece][side] = piece_count(board, color, role) as i16;
        }
        if piece_count(board, color, Role::Bishop) >= 2 {
            self.bishop_pair[side] = 1;
        }
    }

    fn count_psts(&mut self, board: &Board, color: Color) {
        let side = color.is_white() as usize;
        let us = board.by_color(color);
        for (piece, &role) in ROLES.iter().enumerate() {
            for square in board.by_role(role) & us {
                let relative = relative_square(color, square);
                // Pawn squares outside the tunable ranks stay at zero; rank
                // six folds into the material value, the outer ranks cannot
                // hold a pawn at all.
                if role == Role::Pawn && !(1..=5).contains(&(relative / 8)) {
                    continue;
                }
                self.pst[piece][relative][side] += 1;
            }
        }
    }

    fn count_mobility(&mut self, board: &Board, color: Color) {
        let side = color.is_white() as usize;
        let us = board.by_color(color);
        let occupied = board.occupied();

        for square in board.by_role(Role::Knight) & us {
            let moves = attacks::knight_attacks(square) & !us;
            self.mobility_knight[moves.count()][side] += 1;
        }
        for square in board.by_role(Role::Bishop) & us {
            let moves = attacks::bishop_attacks(square, occupied) & !us;
            self.mobility_bishop[moves.count()][side] += 1;
        }
        for square in board.by_role(Role::Rook) & us {
            let moves = attacks::rook_attacks(square, occupied) & !us;
            self.mobility_rook[moves.count()][side] += 1;
        }
        for square in board.by_role(Role::Queen) & us {
            let moves = (attacks::bishop_attacks(square, occupied)
                | attacks::rook_attacks(square, occupied))
                & !us;
            self.mobility_queen[moves.count()][side] += 1;
        }
    }

    fn count_pawns(&mut self, board: &Board, color: Color) {
        let side = color.is_white() as usize;
        let our_pawns = board.by_role(Role::Pawn) & board.by_color(color);
        let their_pawns = board.by_role(Role::Pawn) & board.by_color(!color);

        for square in our_pawns {
            let file = usize::from(square) % 8;
            let doubled = !(forward_file(color, square) & our_pawns).is_empty();
            let passed = (passed_corridor(color, square) & their_pawns).is_empty();
            let isolated = (adjacent_files(file) & our_pawns).is_empty();

            if doubled {
                self.doubled_pawn[side] += 1;
            }
            if passed && !doubled {
                self.passed_pawn[relative_rank(color, square)][side] += 1;
            }
            if isolated {
                self.isolated_pawn[side] += 1;
            }
        }
    }

    fn count_rooks(&mut self, board: &Board, color: Color) {
        let side = color.is_white() as usize;
        let us = board.by_color(color);
        let pawns = board.by_role(Role::Pawn);

        for square in board.by_role(Role::Rook) & us {
            let file = file_squares(usize::from(square) % 8);
            if (file & pawns).is_empty() {
                self.rook_open_file[side] += 1;
            } else if (file & pawns & us).is_empty() {
                self.rook_halfopen_file[side] += 1;
            }
        }
    }

    fn coefficients(&self) -> Vec<i16> {
        let mut dense = Vec::with_capacity(PARAMETER_COUNT);
        for counts in &self.material {
            dense.push(counts[1] - counts[0]);
        }
        for piece in &self.pst {
            for counts in piece.iter() {
                dense.push(counts[1] - counts[0]);
            }
        }
        for counts in &self.mobility_knight {
            dense.push(counts[1] - counts[0]);
        }
        for counts in &self.mobility_bishop {
            dense.push(counts[1] - counts[0]);
        }
        for counts in &self.mobility_rook {
            dense.push(counts[1] - counts[0]);
        }
        for counts in &self.mobility_queen {
            dense.push(counts[1] - counts[0]);
        }
        dense.push(self.bishop_pair[1] - self.bishop_pair[0]);
        dense.push(self.rook_open_file[1] - self.rook_open_file[0]);
        dense.push(self.rook_halfopen_file[1] - self.rook_halfopen_file[0]);
        dense.push(self.doubled_pawn[1] - self.doubled_pawn[0]);
        dense.push(self.isolated_pawn[1] - self.isolated_pawn[0]);
        for counts in &self.passed_pawn {
            dense.push(counts[1] - counts[0]);
        }
        debug_assert_eq!(dense.len(), PARAMETER_COUNT);
        dense
    }
}

fn relative_square(color: Color, square: shakmaty::Square) -> usize {
    let index = usize::from(square);
    if color.is_white() {
        index ^ 56
    } else {
        index
    }
}

fn relative_rank(color: Color, square: shakmaty::Square) -> usize {
    let rank = usize::from(square) / 8;
    if color.is_white() {
        rank ^ 7
    } else {
        rank
    }
}

fn file_squares(file: usize) -> Bitboard {
    Bitboard(0x0101_0101_0101_0101 << file)
}

fn adjacent_files(file: usize) -> Bitboard {
    let mut mask = Bitboard(0);
    if file > 0 {
        mask |= file_squares(file - 1);
    }
    if file < 7 {
        mask |= file_squares(file + 1);
    }
    mask
}

fn forward_ranks(color: Color, rank: usize) -> Bitboard {
    if color.is_white() {
        if rank >= 7 {
            Bitboard(0)
        } else {
            Bitboard(!0u64 << (8 * (rank + 1)))
        }
    } else {
        Bitboard(!(!0u64 << (8 * rank)))
    }
}

fn forward_file(color: Color, square: shakmaty::Square) -> Bitboard {
    let index = usize::from(square);
    forward_ranks(color, index / 8) & file_squares(index % 8)
}

fn passed_corridor(color: Color, square: shakmaty::Square) -> Bitboard {
    let index = usize::from(square);
    let file = index % 8;
    forward_ranks(color, index / 8) & (file_squares(file) | adjacent_files(file))
}

/// Winning a pawnless position is hard; halve the endgame half for the side
/// that is ahead but has no pawns left.
fn endgame_scale(board: &Board, score: f64) -> f64 {
    let strong = if score >= 0.0 {
        Color::White
    } else {
        Color::Black
    };
    if (board.by_color(strong) & board.by_role(Role::Pawn)).is_empty() {
        0.5
    } else {
        1.0
    }
}

/// Mean-centers each piece-square table, moving the mean into the piece's
/// material value so the total evaluation is unchanged. Pawn tables average
/// their tunable ranks only; the king has no material value and keeps its
/// table as-is.
fn rebalance(parameters: &mut [Weight]) {
    for piece in 0..5 {
        let squares: Vec<usize> = (0..64)
            .filter(|sq| piece != 0 || (1..=5).contains(&(sq / 8)))
            .collect();

        let mut mean = Weight::ZERO;
        for &sq in &squares {
            mean += parameters[PST + piece * 64 + sq];
        }
        mean = mean * (1.0 / squares.len() as f64);

        for &sq in &squares {
            parameters[PST + piece * 64 + sq] -= mean;
        }
        parameters[MATERIAL + piece] += mean * PST_QUANTIZATION;
    }
}

pub struct ClassicalEval;

impl Evaluator for ClassicalEval {
    const NAME: &'static str = "classical";

    const TAPERED: bool = true;
    const INCLUDES_ADDITIONAL_SCORE: bool = true;
    const SUPPORTS_EXTERNAL_BOARD: bool = true;

    const PREFERRED_K: f64 = 0.0;
    const MAX_EPOCH: u32 = 10_000;
    const INITIAL_LEARNING_RATE: f64 = 0.03;
    const LEARNING_RATE_DROP_INTERVAL: u32 = 2_500;
    const LEARNING_RATE_DROP_RATIO: f64 = 0.5;
    const RETUNE_FROM_ZERO: bool = false;
    const ENABLE_QSEARCH: bool = true;
    const FILTER_IN_CHECK: bool = true;

    fn initial_parameters() -> Vec<Weight> {
        DEFAULTS.to_vec()
    }

    fn evaluate(pos: &Chess) -> Evaluation {
        let trace = Trace::from_position(pos);
        let coefficients = trace.coefficients();

        let mut mg = 0.0;
        let mut eg = 0.0;
        for (i, &coefficient) in coefficients.iter().enumerate() {
            if coefficient != 0 {
                mg += f64::from(coefficient) * DEFAULTS[i].mg;
                eg += f64::from(coefficient) * DEFAULTS[i].eg;
            }
        }

        let phase = f64::from(eval::phase(pos));
        let max_phase = f64::from(MAX_PHASE);
        let unscaled = (mg * phase + eg * (max_phase - phase)) / max_phase;
        let endgame_scale = endgame_scale(pos.board(), unscaled);

        let tempo = if pos.turn() == Color::White {
            TEMPO
        } else {
            -TEMPO
        };
        let score = (mg * phase + eg * endgame_scale * (max_phase - phase)) / max_phase + tempo;

        Evaluation {
            score: score.round() as i32,
            endgame_scale,
            coefficients,
        }
    }

    fn print_parameters(parameters: &[Weight]) {
        let mut parameters = parameters.to_vec();
        rebalance(&mut parameters);

        for (piece, name) in MATERIAL_NAMES.iter().enumerate() {
            println!("{}", emit::single(name, parameters[MATERIAL + piece]));
        }
        for (piece, name) in PST_NAMES.iter().enumerate() {
            let table = &parameters[PST + piece * 64..PST + (piece + 1) * 64];
            println!("{}", emit::pst(name, table));
        }
        println!(
            "{}",
            emit::array("KNIGHT_MOBILITY", &parameters[MOBILITY_KNIGHT..MOBILITY_BISHOP])
        );
        println!(
            "{}",
            emit::array("BISHOP_MOBILITY", &parameters[MOBILITY_BISHOP..MOBILITY_ROOK])
        );
        println!(
            "{}",
            emit::array("ROOK_MOBILITY", &parameters[MOBILITY_ROOK..MOBILITY_QUEEN])
        );
        println!(
            "{}",
            emit::array("QUEEN_MOBILITY", &parameters[MOBILITY_QUEEN..BISHOP_PAIR])
        );
        println!("{}", emit::single("BISHOP_PAIR", parameters[BISHOP_PAIR]));
        println!("{}", emit::single("ROOK_OPEN_FILE", parameters[ROOK_OPEN_FILE]));
        println!(
            "{}",
            emit::single("ROOK_HALFOPEN_FILE", parameters[ROOK_HALFOPEN_FILE])
        );
        println!("{}", emit::single("DOUBLED_PAWN", parameters[DOUBLED_PAWN]));
        println!("{}", emit::single("ISOLATED_PAWN", parameters[ISOLATED_PAWN]));
        println!(
            "{}",
            emit::array("PASSED_PAWN", &parameters[PASSED_PAWN..PARAMETER_COUNT])
        );
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
        let parameters = ClassicalEval::initial_parameters();
        assert_eq!(parameters.len(), PARAMETER_COUNT);

        for fen in &[
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ] {
            let evaluation = ClassicalEval::evaluate(&position(fen));
            assert_eq!(evaluation.coefficients.len(), PARAMETER_COUNT);
        }
    }

    #[test]
    fn test_balanced_position_is_symmetric() {
        let evaluation = ClassicalEval::evaluate(&Chess::default());
        assert!(evaluation.coefficients.iter().all(|&c| c == 0));
        // Only the tempo bonus remains.
        assert_eq!(evaluation.score, TEMPO as i32);
    }

    #[test]
    fn test_mirrored_position_negates_coefficients() {
        let pos = position("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 1");
        let mirrored =
            position("rnbqkb1r/pppp1ppp/5n2/4p3/4P3/2N5/PPPP1PPP/R1BQKBNR b KQkq - 0 1");

        let a = ClassicalEval::evaluate(&pos);
        let b = ClassicalEval::evaluate(&mirrored);
        for (x, y) in a.coefficients.iter().zip(&b.coefficients) {
            assert_eq!(*x, -y);
        }
        assert_eq!(a.score, -b.score);
    }

    #[test]
    fn test_passed_pawn_detection() {
        // White pawn on b5 is passed, everything else is blocked out.
        let pos = position("4k3/8/8/1P6/8/8/6pp/4K3 w - - 0 1");
        let trace = Trace::from_position(&pos);
        // b5 for white is relative rank 4 from the promotion side.
        assert_eq!(trace.passed_pawn[3][1], 1);
        // The black g- and h-pawns are passed too.
        assert_eq!(trace.passed_pawn[1].iter().sum::<i16>(), 2);
    }

    #[test]
    fn test_doubled_and_isolated_pawns() {
        let pos = position("4k3/8/8/8/8/3P4/3P4/4K3 w - - 0 1");
        let trace = Trace::from_position(&pos);
        assert_eq!(trace.doubled_pawn[1], 1);
        assert_eq!(trace.isolated_pawn[1], 2);
    }

    #[test]
    fn test_rook_files() {
        // White rook a1 on an open file, d1 rook behind an enemy pawn only.
        let pos = position("4k3/3p4/8/8/8/8/6P1/R2R2K1 w - - 0 1");
        let trace = Trace::from_position(&pos);
        assert_eq!(trace.rook_open_file[1], 1);
        assert_eq!(trace.rook_halfopen_file[1], 1);
    }

    #[test]
    fn test_endgame_scale_halves_pawnless_attacker() {
        let pos = position("4k3/8/8/8/8/8/8/QQ2K3 w - - 0 1");
        let evaluation = ClassicalEval::evaluate(&pos);
        assert_eq!(evaluation.endgame_scale, 0.5);

        let with_pawn = position("4k3/8/8/8/8/8/P7/QQ2K3 w - - 0 1");
        let evaluation = ClassicalEval::evaluate(&with_pawn);
        assert_eq!(evaluation.endgame_scale, 1.0);
    }

    #[test]
    fn test_rebalance_centers_tables_and_preserves_evaluation() {
        let mut parameters = ClassicalEval::initial_parameters();
        for sq in 0..64 {
            parameters[PST + 64 + sq] = Weight::new(10.0, 20.0);
        }
        parameters[PST + 64 + 28] = Weight::new(50.0, 80.0);

        // Both white knights are on the board while black has none, so the
        // table mean genuinely moves between table and material here.
        let pos = position("r1bqkb1r/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 1");
        let coefficients = ClassicalEval::evaluate(&pos).coefficients;
        let dot = |parameters: &[Weight]| {
            let mut mg = 0.0;
            for (i, &c) in coefficients.iter().enumerate() {
                mg += f64::from(c) * parameters[i].mg;
            }
            mg
        };

        let before = dot(&parameters);
        let mut rebalanced = parameters.clone();
        rebalance(&mut rebalanced);
        let after = dot(&rebalanced);
        assert!((before - after).abs() < 1e-9);

        let knight_mean: f64 = (0..64).map(|sq| rebalanced[PST + 64 + sq].mg).sum::<f64>() / 64.0;
        assert!(knight_mean.abs() < 1e-9);
        assert!(rebalanced[MATERIAL + 1].mg > parameters[MATERIAL + 1].mg);
    }

    #[test]
    fn test_pawn_pst_skips_untunable_ranks() {
        let trace = Trace::from_position(&Chess::default());
        let pawn_pst: i16 = trace.pst[0].iter().map(|c| c[0] + c[1]).sum();
        // All sixteen pawns sit on their home rank, which carries no table
        // term.
        assert_eq!(pawn_pst, 0);
    }
}
