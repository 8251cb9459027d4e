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

//! Renders tuned parameters as source fragments the engine ingests verbatim.
//! Tapered weights print as `S(mg, eg)`, or a bare `0` when both halves
//! round to zero.

use crate::score::Weight;

/// Rounds half away from zero, which is what the engine's quantization
/// expects; `f64::round` already has exactly that behavior.
pub fn rounded(value: f64) -> i64 {
    value.round() as i64
}

fn cell(weight: Weight) -> String {
    let mg = rounded(weight.mg);
    let eg = rounded(weight.eg);
    if mg == 0 && eg == 0 {
        format!("{:>13}", 0)
    } else {
        format!("S({:>4}, {:>4})", mg, eg)
    }
}

/// An untapered parameter as a plain integer constant.
pub fn value(name: &str, weight: Weight) -> String {
    format!("pub const {}: i32 = {};", name, rounded(weight.mg))
}

/// A single tapered parameter.
pub fn single(name: &str, weight: Weight) -> String {
    let mg = rounded(weight.mg);
    let eg = rounded(weight.eg);
    if mg == 0 && eg == 0 {
        format!("pub const {}: EScore = 0;", name)
    } else {
        format!("pub const {}: EScore = S({}, {});", name, mg, eg)
    }
}

/// A tapered parameter array, four entries per row.
pub fn array(name: &str, weights: &[Weight]) -> String {
    let mut out = String::new();
    out.push_str("#[rustfmt::skip]\n");
    out.push_str(&format!("pub const {}: [EScore; {}] = [", name, weights.len()));
    for (i, &weight) in weights.iter().enumerate() {
        if i % 4 == 0 {
            out.push_str("\n    ");
        }
        out.push_str(&cell(weight));
        out.push_str(", ");
    }
    out.push_str("\n];");
    out
}

/// A piece-square table, eight entries per row so the board shape survives.
pub fn pst(name: &str, weights: &[Weight]) -> String {
    debug_assert_eq!(weights.len(), 64);
    let mut out = String::new();
    out.push_str("#[rustfmt::skip]\n");
    out.push_str(&format!("pub const {}: [EScore; 64] = [", name));
    for (i, &weight) in weights.iter().enumerate() {
        if i % 8 == 0 {
            out.push_str("\n    ");
        }
        out.push_str(&cell(weight));
        out.push_str(", ");
    }
    out.push_str("\n];");
    out
}
