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
use std::io;

use thiserror::Error;

/// Anything that aborts a tuning run. A broken line poisons the whole
/// training set, so load failures are not recoverable.
#[derive(Debug, Error)]
pub enum TunerError {
    #[error("please provide at least one data file")]
    ArgsMissing,

    #[error("cannot parse position limit '{0}'")]
    InvalidLimit(String),

    #[error("cannot read {path}: {source}")]
    FileOpen { path: String, source: io::Error },

    #[error("malformed FEN line: {0}")]
    MalformedFen(String),

    #[error("no WDL marker found on line: {0}")]
    WdlMissing(String),

    #[error("multiple WDL markers found on line: {0}")]
    WdlAmbiguous(String),

    #[error("evaluation returned {got} coefficients, expected {expected}")]
    ParameterMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, TunerError>;
