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
use crate::score::{Weight, MAX_PHASE};

/// One non-zero element of a position's dense coefficient vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficient {
    pub index: u16,
    pub value: i16,
}

/// A fully preprocessed training position.
///
/// Coefficients are stored sparse; at the usual 20-40 non-zero terms per
/// position this is what makes datasets of several million positions fit in
/// memory. Entries are created once by the loader and never mutated.
#[derive(Clone, Debug)]
pub struct Entry {
    pub coefficients: Vec<Coefficient>,
    /// Game result from white's perspective: 1.0, 0.5 or 0.0.
    pub wdl: f64,
    pub white_to_move: bool,
    /// Remaining non-pawn material in [0, MAX_PHASE]. Untapered evaluations
    /// pin this to MAX_PHASE so the endgame half drops out.
    pub phase: i32,
    /// Per-position damping of the endgame half, in (0, 1].
    pub endgame_scale: f64,
    /// Evaluation residue outside the span of the parameter vector, e.g. a
    /// fixed tempo bonus.
    pub additional_score: f64,
}

/// One training data file plus its read limits.
#[derive(Clone, Debug)]
pub struct DataSource {
    pub path: String,
    /// Maximum number of lines to read; 0 reads the whole file.
    pub position_limit: i64,
    /// Whether WDL labels in this file are given from the side to move
    /// rather than from white.
    pub side_to_move_wdl: bool,
}

/// Drops the zeros from a dense coefficient vector.
pub fn compress(dense: &[i16]) -> Vec<Coefficient> {
    debug_assert!(dense.len() <= usize::from(u16::max_value()));
    dense
        .iter()
        .enumerate()
        .filter(|(_, &value)| value != 0)
        .map(|(index, &value)| Coefficient {
            index: index as u16,
            value,
        })
        .collect()
}

impl Entry {
    /// Blended linear evaluation of this entry under `parameters`:
    /// the midgame and endgame dot products interpolated by phase, with the
    /// endgame half damped by the scale factor, plus the cached residue.
    pub fn evaluate(&self, parameters: &[Weight]) -> f64 {
        let mut mg = 0.0;
        let mut eg = 0.0;
        for coefficient in &self.coefficients {
            let weight = parameters[usize::from(coefficient.index)];
            let value = f64::from(coefficient.value);
            mg += value * weight.mg;
            eg += value * weight.eg;
        }
        eg *= self.endgame_scale;

        let phase = f64::from(self.phase);
        let linear = (mg * phase + eg * (f64::from(MAX_PHASE) - phase)) / f64::from(MAX_PHASE);
        linear + self.additional_score
    }
}
