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
use crate::classical::ClassicalEval;
use crate::eval::Evaluator;

/// The evaluation this binary tunes. One build per evaluation; swap the
/// alias to tune another one.
pub type TunedEval = ClassicalEval;

pub const THREAD_COUNT: usize = 4;
pub const DATA_LOAD_THREAD_COUNT: usize = 4;
pub const DATA_LOAD_PRINT_INTERVAL: u64 = 10_000;
pub const PRINT_DATA_ENTRIES: bool = false;

/// Whether WDL labels are given from the side to move rather than from
/// white. Applies to every data source passed on the command line.
pub const SIDE_TO_MOVE_WDL: bool = false;

/// Runtime view of the build-time knobs, so the tuner and loader take one
/// value instead of reaching for globals.
#[derive(Clone, Debug)]
pub struct Config {
    pub threads: usize,
    pub data_load_threads: usize,
    pub data_load_print_interval: u64,
    pub print_data_entries: bool,
}

impl Config {
    pub fn for_eval<E: Evaluator>() -> Config {
        assert!(
            !E::ENABLE_QSEARCH || E::SUPPORTS_EXTERNAL_BOARD,
            "quiescence hands the evaluation parsed positions"
        );

        Config {
            threads: THREAD_COUNT,
            data_load_threads: DATA_LOAD_THREAD_COUNT,
            data_load_print_interval: DATA_LOAD_PRINT_INTERVAL,
            print_data_entries: PRINT_DATA_ENTRIES,
        }
    }

    /// Worker count for the shared pool; loading and tuning reuse the same
    /// workers.
    pub fn pool_threads(&self) -> usize {
        self.threads.max(self.data_load_threads)
    }
}
