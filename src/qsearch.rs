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

//! Captures-only search used while loading training data. Game records are
//! full of hanging tactics a linear evaluation cannot express; resolving
//! every root to the quiet end of its capture sequence gives the tuner a
//! position its evaluation has a chance of explaining.

use shakmaty::{Chess, Color, Move, Position, Role};

use crate::eval::Evaluator;

const MAX_PLY: usize = 64;
const MATE: i32 = 20_000;

/// Ordering values only; the tuned weights play no part in move ordering.
fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight | Role::Bishop => 300,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

/// Most-valuable-victim / least-valuable-attacker: sixteen bits keep every
/// victim class strictly above every attacker difference.
fn mvv_lva(mov: &Move) -> i32 {
    let victim = mov.capture().map_or(0, piece_value);
    (victim << 16) - piece_value(mov.role())
}

struct PvTable {
    moves: [[Option<Move>; MAX_PLY]; MAX_PLY],
    length: [usize; MAX_PLY],
}

impl PvTable {
    fn new() -> PvTable {
        PvTable {
            moves: std::array::from_fn(|_| std::array::from_fn(|_| None)),
            length: [0; MAX_PLY],
        }
    }

    /// Prepends `mov` to the child line one ply down.
    fn record(&mut self, ply: usize, mov: Move) {
        let child_length = self.length[ply + 1];
        let (parent, child) = self.moves.split_at_mut(ply + 1);
        let line = &mut parent[ply];

        line[0] = Some(mov);
        for i in 0..child_length {
            line[i + 1] = child[0][i].clone();
        }
        self.length[ply] = child_length + 1;
    }
}

/// Resolves `root` to the position at the end of the principal variation of
/// a captures-only search. The returned position may have the other side to
/// move than the root did.
pub fn quiet_position<E: Evaluator>(root: &Chess) -> Chess {
    let mut pv = PvTable::new();
    search::<E>(root, -MATE, MATE, 0, &mut pv);

    let mut pos = root.clone();
    for i in 0..pv.length[0] {
        if let Some(mov) = pv.moves[0][i].clone() {
            pos.play_unchecked(&mov);
        }
    }
    pos
}

fn search<E: Evaluator>(pos: &Chess, mut alpha: i32, beta: i32, ply: usize, pv: &mut PvTable) -> i32 {
    pv.length[ply] = 0;

    let white_to_move = pos.turn() == Color::White;
    let evaluation = E::evaluate(pos);
    let stand_pat = if white_to_move {
        evaluation.score
    } else {
        -evaluation.score
    };

    if ply >= MAX_PLY - 1 {
        return stand_pat;
    }
    if stand_pat >= beta {
        return stand_pat;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut moves = pos.capture_moves();
    let mut scores: Vec<i32> = moves.iter().map(mvv_lva).collect();

    for index in 0..moves.len() {
        // Selection sort in place: pull the best remaining capture forward.
        let mut best = index;
        for i in index + 1..moves.len() {
            if scores[i] > scores[best] {
                best = i;
            }
        }
        moves.swap(index, best);
        scores.swap(index, best);

        let mov = moves[index].clone();
        let mut child = pos.clone();
        child.play_unchecked(&mov);

        let score = -search::<E>(&child, -beta, -alpha, ply + 1, pv);
        if score >= beta {
            return score;
        }
        if score > alpha {
            alpha = score;
            pv.record(ply, mov);
        }
    }

    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::{CastlingMode, Square};

    use crate::material::MaterialEval;

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    #[test]
    fn test_mvv_lva_prefers_valuable_victims() {
        let queen_takes_pawn = Move::Normal {
            role: Role::Queen,
            from: Square::D1,
            capture: Some(Role::Pawn),
            to: Square::D7,
            promotion: None,
        };
        let pawn_takes_queen = Move::Normal {
            role: Role::Pawn,
            from: Square::C6,
            capture: Some(Role::Queen),
            to: Square::D7,
            promotion: None,
        };
        assert!(mvv_lva(&pawn_takes_queen) > mvv_lva(&queen_takes_pawn));

        // And among equal victims the cheapest attacker wins.
        let rook_takes_pawn = Move::Normal {
            role: Role::Rook,
            from: Square::D1,
            capture: Some(Role::Pawn),
            to: Square::D7,
            promotion: None,
        };
        assert!(mvv_lva(&queen_takes_pawn) < mvv_lva(&rook_takes_pawn));
    }

    #[test]
    fn test_quiet_root_is_returned_unchanged() {
        let root = Chess::default();
        let leaf = quiet_position::<MaterialEval>(&root);
        assert_eq!(leaf.board(), root.board());
    }

    #[test]
    fn test_hanging_queen_is_captured() {
        // Black to move with the white queen hanging to the a6 pawn.
        let root = position("7k/8/p7/1Q6/8/8/8/K7 b - - 0 1");
        let leaf = quiet_position::<MaterialEval>(&root);
        assert!((leaf.board().by_role(Role::Queen)).is_empty());
        assert_eq!(leaf.turn(), Color::White);
    }

    #[test]
    fn test_losing_capture_is_not_forced() {
        // White could take the defended pawn with the queen but stands pat
        // instead.
        let root = position("3k4/2pp4/8/2Q5/8/8/8/3K4 w - - 0 1");
        let leaf = quiet_position::<MaterialEval>(&root);
        assert_eq!(leaf.board(), root.board());
    }
}
