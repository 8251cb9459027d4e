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
mod classical;
mod config;
mod data;
mod emit;
mod error;
mod eval;
mod loader;
mod material;
mod pool;
mod qsearch;
mod score;
mod tuner;

use std::process;

use crate::config::{Config, TunedEval, SIDE_TO_MOVE_WDL};
use crate::data::DataSource;
use crate::error::TunerError;

/// `tangent <path> [limit] <path> [limit] ...` — each data file optionally
/// followed by a maximum position count.
fn parse_sources(args: &[String]) -> Result<Vec<DataSource>, TunerError> {
    if args.is_empty() {
        return Err(TunerError::ArgsMissing);
    }

    let mut sources = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let path = args[i].clone();
        i += 1;

        let mut position_limit = 0;
        if i < args.len() && is_limit_token(&args[i]) {
            position_limit = args[i]
                .parse()
                .map_err(|_| TunerError::InvalidLimit(args[i].clone()))?;
            i += 1;
        }

        sources.push(DataSource {
            path,
            position_limit,
            side_to_move_wdl: SIDE_TO_MOVE_WDL,
        });
    }
    Ok(sources)
}

fn is_limit_token(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let sources = match parse_sources(&args) {
        Ok(sources) => sources,
        Err(error) => {
            println!("{}", error);
            process::exit(-1);
        }
    };

    let config = Config::for_eval::<TunedEval>();
    if let Err(error) = tuner::run::<TunedEval>(&sources, &config) {
        println!("{}", error);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_paths_without_limits() {
        let sources = parse_sources(&args(&["a.book", "b.book"])).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].path, "a.book");
        assert_eq!(sources[0].position_limit, 0);
        assert_eq!(sources[1].path, "b.book");
    }

    #[test]
    fn test_limits_attach_to_the_preceding_path() {
        let sources = parse_sources(&args(&["a.book", "5000", "b.book"])).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].position_limit, 5000);
        assert_eq!(sources[1].position_limit, 0);
    }

    #[test]
    fn test_no_arguments_is_an_error() {
        match parse_sources(&[]) {
            Err(TunerError::ArgsMissing) => {}
            other => panic!("expected ArgsMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_limit_is_an_error() {
        let result = parse_sources(&args(&["a.book", "99999999999999999999999"]));
        match result {
            Err(TunerError::InvalidLimit(_)) => {}
            other => panic!("expected InvalidLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_looking_paths_are_paths() {
        // A limit token is all digits; anything else is a path.
        let sources = parse_sources(&args(&["2024.book"])).unwrap();
        assert_eq!(sources[0].path, "2024.book");
    }
}
