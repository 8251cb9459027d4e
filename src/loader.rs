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

//! Turns label-annotated FEN files into training entries. Reading is
//! sequential; parsing, quiescence and coefficient extraction run on the
//! worker pool in batches. Batch results land in batch-indexed slots and are
//! concatenated in batch order, so the entry list does not depend on
//! scheduling.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Position};

use crate::config::Config;
use crate::data::{compress, DataSource, Entry};
use crate::error::{Result, TunerError};
use crate::eval::{self, Evaluator};
use crate::pool::ThreadPool;
use crate::qsearch;
use crate::score::{Weight, MAX_PHASE};
use crate::tuner;

const BATCH_SIZE: usize = 10_000;

/// A whitespace token that looks like a game result. The value is `None`
/// for tokens that count as a label but cannot be read as one, like a bare
/// `2.0`.
fn wdl_candidate(token: &str) -> Option<Option<f64>> {
    let token = token
        .trim_matches(|c: char| c == '"' || c == ';' || c == '[' || c == ']' || c == '(' || c == ')' || c == ',');

    if token.contains("1/2-1/2") {
        return Some(Some(0.5));
    }
    if token.contains("1-0") {
        return Some(Some(1.0));
    }
    if token.contains("0-1") {
        return Some(Some(0.0));
    }

    if is_decimal(token) {
        let value = match token {
            "1.0" => Some(1.0),
            "0.5" => Some(0.5),
            "0.0" => Some(0.0),
            _ if token.starts_with("0.") => token.parse().ok(),
            _ => None,
        };
        return Some(value);
    }

    None
}

fn is_decimal(token: &str) -> bool {
    token.bytes().next().map_or(false, |b| b.is_ascii_digit())
        && token.bytes().filter(|&b| b == b'.').count() == 1
        && token.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

/// Extracts the game result from a line. Exactly one label-like token may
/// be present.
pub fn parse_wdl(line: &str) -> Result<f64> {
    let mut label = None;
    let mut candidates = 0;
    for token in line.split_whitespace() {
        if let Some(value) = wdl_candidate(token) {
            candidates += 1;
            if label.is_none() {
                label = value;
            }
        }
    }

    match candidates {
        0 => Err(TunerError::WdlMissing(line.to_string())),
        1 => label.ok_or_else(|| TunerError::WdlMissing(line.to_string())),
        _ => Err(TunerError::WdlAmbiguous(line.to_string())),
    }
}

/// Parses the FEN prefix of a line, cut off at the fourth space so labels
/// and other annotations never reach the FEN parser.
pub fn parse_position(line: &str) -> Result<Chess> {
    let mut spaces = 0;
    let mut end = line.len();
    for (i, b) in line.bytes().enumerate() {
        if b == b' ' {
            spaces += 1;
            if spaces == 4 {
                end = i;
                break;
            }
        }
    }

    let fen: Fen = line[..end]
        .parse()
        .map_err(|_| TunerError::MalformedFen(line.to_string()))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|_| TunerError::MalformedFen(line.to_string()))
}

fn parse_line<E: Evaluator>(
    line: &str,
    side_to_move_wdl: bool,
    parameters: &[Weight],
) -> Result<Option<Entry>> {
    let mut wdl = parse_wdl(line)?;
    let root = parse_position(line)?;

    if E::FILTER_IN_CHECK && root.is_check() {
        return Ok(None);
    }
    // Normalize the label to white's perspective before quiescence can hand
    // the board to the other side.
    if side_to_move_wdl && root.turn() == Color::Black {
        wdl = 1.0 - wdl;
    }

    let pos = if E::ENABLE_QSEARCH {
        qsearch::quiet_position::<E>(&root)
    } else {
        root
    };

    let evaluation = E::evaluate(&pos);
    if evaluation.coefficients.len() != parameters.len() {
        return Err(TunerError::ParameterMismatch {
            expected: parameters.len(),
            got: evaluation.coefficients.len(),
        });
    }

    let mut entry = Entry {
        coefficients: compress(&evaluation.coefficients),
        wdl,
        white_to_move: pos.turn() == Color::White,
        phase: if E::TAPERED { eval::phase(&pos) } else { MAX_PHASE },
        endgame_scale: evaluation.endgame_scale,
        additional_score: 0.0,
    };
    if E::INCLUDES_ADDITIONAL_SCORE {
        entry.additional_score = f64::from(evaluation.score) - entry.evaluate(parameters);
    }

    Ok(Some(entry))
}

fn read_lines(source: &DataSource) -> Result<Vec<String>> {
    let file = File::open(&source.path).map_err(|error| TunerError::FileOpen {
        path: source.path.clone(),
        source: error,
    })?;

    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|error| TunerError::FileOpen {
            path: source.path.clone(),
            source: error,
        })?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
        if source.position_limit > 0 && lines.len() as i64 >= source.position_limit {
            break;
        }
    }
    Ok(lines)
}

fn parse_batches<E: Evaluator + 'static>(
    lines: Vec<String>,
    source: &DataSource,
    parameters: &[Weight],
    pool: &ThreadPool,
    config: &Config,
    start: Instant,
) -> Result<Vec<Entry>> {
    let line_count = lines.len();
    let batch_count = (line_count + BATCH_SIZE - 1) / BATCH_SIZE;

    let lines = Arc::new(lines);
    let parameters = Arc::new(parameters.to_vec());
    let slots: Arc<Vec<Mutex<Option<Result<Vec<Entry>>>>>> =
        Arc::new((0..batch_count).map(|_| Mutex::new(None)).collect());
    let next_batch = Arc::new(Mutex::new(0usize));
    let processed = Arc::new(AtomicU64::new(0));

    let side_to_move_wdl = source.side_to_move_wdl;
    let interval = config.data_load_print_interval;

    for thread_id in 0..config.data_load_threads {
        let lines = Arc::clone(&lines);
        let parameters = Arc::clone(&parameters);
        let slots = Arc::clone(&slots);
        let next_batch = Arc::clone(&next_batch);
        let processed = Arc::clone(&processed);

        pool.enqueue(move || loop {
            let batch = {
                let mut next = next_batch.lock().unwrap();
                if *next >= batch_count {
                    break;
                }
                let batch = *next;
                *next += 1;
                batch
            };

            let begin = batch * BATCH_SIZE;
            let end = (begin + BATCH_SIZE).min(lines.len());

            let mut entries = Vec::with_capacity(end - begin);
            let mut failure = Ok(());
            for line in &lines[begin..end] {
                match parse_line::<E>(line, side_to_move_wdl, &parameters) {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => {}
                    Err(error) => {
                        failure = Err(error);
                        break;
                    }
                }
            }

            let count = (end - begin) as u64;
            let done = processed.fetch_add(count, Ordering::SeqCst) + count;
            if thread_id == 0 && interval > 0 && done / interval > (done - count) / interval {
                tuner::print_elapsed(start);
                println!("Loaded {} positions...", done);
            }

            *slots[batch].lock().unwrap() = Some(failure.map(|_| entries));
        });
    }

    pool.wait_for_completion();

    let mut entries = Vec::with_capacity(line_count);
    for slot in slots.iter() {
        let result = slot.lock().unwrap().take().expect("batch left unparsed");
        entries.extend(result?);
    }
    Ok(entries)
}

pub fn load_sources<E: Evaluator + 'static>(
    sources: &[DataSource],
    parameters: &[Weight],
    pool: &ThreadPool,
    config: &Config,
    start: Instant,
) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for source in sources {
        println!("Loading {}", source.path);
        let lines = read_lines(source)?;
        let loaded = parse_batches::<E>(lines, source, parameters, pool, config, start)?;
        let count = loaded.len();
        entries.extend(loaded);

        tuner::print_elapsed(start);
        println!(
            "Loaded {} entries from {}, {} total",
            count,
            source.path,
            entries.len()
        );
    }
    println!("Data loading complete");

    if config.print_data_entries {
        for entry in &entries {
            println!(
                "wdl {:.1} stm {} phase {:>2} scale {:.2} terms {}",
                entry.wdl,
                if entry.white_to_move { 'w' } else { 'b' },
                entry.phase,
                entry.endgame_scale,
                entry.coefficients.len()
            );
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::ClassicalEval;
    use crate::data::Coefficient;
    use crate::material::MaterialEval;

    const START_LINE: &str = "rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK1NR w KQkq - 0 1; 1.0";

    fn data_file(name: &str, contents: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("tangent-test-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn source(path: String) -> DataSource {
        DataSource {
            path,
            position_limit: 0,
            side_to_move_wdl: false,
        }
    }

    fn test_config() -> Config {
        Config {
            threads: 2,
            data_load_threads: 2,
            data_load_print_interval: 0,
            print_data_entries: false,
        }
    }

    #[test]
    fn test_parse_wdl_markers() {
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 w - - c9 \"1-0\";").unwrap(), 1.0);
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 w - - c9 \"1/2-1/2\";").unwrap(), 0.5);
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 w - - c9 \"0-1\";").unwrap(), 0.0);
        assert_eq!(parse_wdl(START_LINE).unwrap(), 1.0);
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 b - - 0.5").unwrap(), 0.5);
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 b - - 0.0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_wdl_fractional_fallback() {
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 w - - 0.3").unwrap(), 0.3);
        assert_eq!(parse_wdl("8/8/8/8/8/8/8/8 w - - [0.25]").unwrap(), 0.25);
    }

    #[test]
    fn test_parse_wdl_missing() {
        match parse_wdl("8/8/8/8/8/8/8/8 w - - 0 1") {
            Err(TunerError::WdlMissing(_)) => {}
            other => panic!("expected WdlMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_wdl_ambiguous() {
        match parse_wdl(&format!("{}; 2.0", START_LINE)) {
            Err(TunerError::WdlAmbiguous(_)) => {}
            other => panic!("expected WdlAmbiguous, got {:?}", other),
        }
        match parse_wdl("8/8/8/8/8/8/8/8 w - - 1-0 0-1") {
            Err(TunerError::WdlAmbiguous(_)) => {}
            other => panic!("expected WdlAmbiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_position_strips_annotations() {
        let pos = parse_position(START_LINE).unwrap();
        assert_eq!(pos.turn(), Color::White);
    }

    #[test]
    fn test_parse_position_rejects_garbage() {
        match parse_position("rnbqkbnr/ppppp w - -") {
            Err(TunerError::MalformedFen(_)) => {}
            other => panic!("expected MalformedFen, got {:?}", other),
        }
    }

    #[test]
    fn test_load_single_line() {
        let path = data_file("single", &format!("{}\n", START_LINE));
        let config = test_config();
        let pool = ThreadPool::start(config.pool_threads());
        let parameters = MaterialEval::initial_parameters();

        let entries = load_sources::<MaterialEval>(
            &[source(path)],
            &parameters,
            &pool,
            &config,
            Instant::now(),
        )
        .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].wdl, 1.0);
        assert!(entries[0].white_to_move);
        // White is a bishop down, black a queen.
        assert_eq!(entries[0].coefficients.len(), 2);
        assert_eq!(entries[0].coefficients[0], Coefficient { index: 2, value: -1 });
        assert_eq!(entries[0].coefficients[1], Coefficient { index: 4, value: 1 });
    }

    #[test]
    fn test_load_rejects_ambiguous_label() {
        let path = data_file("ambiguous", &format!("{}; 2.0\n", START_LINE));
        let config = test_config();
        let pool = ThreadPool::start(config.pool_threads());
        let parameters = MaterialEval::initial_parameters();

        let result = load_sources::<MaterialEval>(
            &[source(path)],
            &parameters,
            &pool,
            &config,
            Instant::now(),
        );
        match result {
            Err(TunerError::WdlAmbiguous(_)) => {}
            other => panic!("expected WdlAmbiguous, got {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn test_load_respects_position_limit() {
        let line = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1; 0.5";
        let path = data_file("limit", &format!("{0}\n{0}\n{0}\n", line));
        let config = test_config();
        let pool = ThreadPool::start(config.pool_threads());
        let parameters = MaterialEval::initial_parameters();

        let mut src = source(path);
        src.position_limit = 2;
        let entries =
            load_sources::<MaterialEval>(&[src], &parameters, &pool, &config, Instant::now())
                .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_side_to_move_wdl_is_flipped_for_black() {
        let line = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0.0";
        let path = data_file("stm", &format!("{}\n", line));
        let config = test_config();
        let pool = ThreadPool::start(config.pool_threads());
        let parameters = MaterialEval::initial_parameters();

        let mut src = source(path);
        src.side_to_move_wdl = true;
        let entries =
            load_sources::<MaterialEval>(&[src], &parameters, &pool, &config, Instant::now())
                .unwrap();
        assert_eq!(entries[0].wdl, 1.0);
    }

    #[test]
    fn test_additional_score_captures_tempo() {
        let line = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1; 0.5";
        let parameters = ClassicalEval::initial_parameters();
        let entry = parse_line::<ClassicalEval>(line, false, &parameters)
            .unwrap()
            .unwrap();
        // The starting position has no non-zero coefficients, so the cached
        // residue is exactly the tempo bonus.
        assert!(entry.coefficients.is_empty());
        assert_eq!(entry.additional_score, 12.0);
    }

    #[test]
    fn test_in_check_roots_are_filtered() {
        // White king in check from the black rook.
        let line = "4k3/8/8/8/8/8/4r3/4K3 w - - 0.5";
        let parameters = ClassicalEval::initial_parameters();
        let entry = parse_line::<ClassicalEval>(line, false, &parameters).unwrap();
        assert!(entry.is_none());
    }
}
