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
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Phase units on the board with full starting material. Knights and bishops
/// count one unit, rooks two, queens four.
pub const MAX_PHASE: i32 = 24;

/// A tunable evaluation term, held as an unpacked midgame/endgame pair.
///
/// The engine packs both halves into a single 32-bit word. During tuning the
/// packed form only costs precision, so the halves live in two floats and are
/// rounded back to integers when parameters are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Weight {
    pub mg: f64,
    pub eg: f64,
}

impl Weight {
    pub const ZERO: Weight = Weight { mg: 0.0, eg: 0.0 };

    pub const fn new(mg: f64, eg: f64) -> Weight {
        Weight { mg, eg }
    }

    /// A weight with the same value in both game phases.
    pub const fn splat(value: f64) -> Weight {
        Weight {
            mg: value,
            eg: value,
        }
    }
}

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Weight) -> Weight {
        Weight {
            mg: self.mg + rhs.mg,
            eg: self.eg + rhs.eg,
        }
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Weight) {
        self.mg += rhs.mg;
        self.eg += rhs.eg;
    }
}

impl Sub for Weight {
    type Output = Weight;

    fn sub(self, rhs: Weight) -> Weight {
        Weight {
            mg: self.mg - rhs.mg,
            eg: self.eg - rhs.eg,
        }
    }
}

impl SubAssign for Weight {
    fn sub_assign(&mut self, rhs: Weight) {
        self.mg -= rhs.mg;
        self.eg -= rhs.eg;
    }
}

impl Neg for Weight {
    type Output = Weight;

    fn neg(self) -> Weight {
        Weight {
            mg: -self.mg,
            eg: -self.eg,
        }
    }
}

impl Mul<f64> for Weight {
    type Output = Weight;

    fn mul(self, rhs: f64) -> Weight {
        Weight {
            mg: self.mg * rhs,
            eg: self.eg * rhs,
        }
    }
}
