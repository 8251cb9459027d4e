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

//! Fits the parameter vector to the training labels: mean squared error of
//! the sigmoid-squashed evaluation, minimized with Adam. Gradients are exact
//! (the model is linear under the blend), accumulated in parallel over
//! contiguous entry slices and reduced on the caller's thread.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::Config;
use crate::data::{DataSource, Entry};
use crate::error::Result;
use crate::eval::Evaluator;
use crate::loader;
use crate::pool::ThreadPool;
use crate::score::{Weight, MAX_PHASE};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Centipawns per logit unit in the sigmoid.
const SIGMOID_SCALE: f64 = 400.0;

const REPORT_INTERVAL: u32 = 100;

pub fn print_elapsed(start: Instant) {
    print!("[{}s] ", start.elapsed().as_secs());
}

pub fn sigmoid(k: f64, eval: f64) -> f64 {
    1.0 / (1.0 + (-k * eval / SIGMOID_SCALE).exp())
}

/// Adds one entry's contribution to the raw gradient accumulator. The
/// `-K/400 / |D|` factor common to every term is applied once per epoch in
/// `adam_step`.
fn update_single_gradient(gradient: &mut [Weight], entry: &Entry, parameters: &[Weight], k: f64) {
    let sig = sigmoid(k, entry.evaluate(parameters));
    let residual = (entry.wdl - sig) * sig * (1.0 - sig);

    let mg_share = residual * f64::from(entry.phase) / f64::from(MAX_PHASE);
    let eg_share = (residual - mg_share) * entry.endgame_scale;

    for coefficient in &entry.coefficients {
        let value = f64::from(coefficient.value);
        let slot = &mut gradient[usize::from(coefficient.index)];
        slot.mg += mg_share * value;
        slot.eg += eg_share * value;
    }
}

/// Contiguous slice of the entry list owned by one worker; the division
/// remainder goes to the last worker.
fn partition(len: usize, threads: usize, thread_id: usize) -> (usize, usize) {
    let per_thread = len / threads;
    let begin = thread_id * per_thread;
    let end = if thread_id == threads - 1 {
        len
    } else {
        begin + per_thread
    };
    (begin, end)
}

fn compute_gradient(
    pool: &ThreadPool,
    entries: &Arc<Vec<Entry>>,
    parameters: &[Weight],
    k: f64,
    threads: usize,
) -> Vec<Weight> {
    let shared_parameters = Arc::new(parameters.to_vec());
    let slots: Arc<Vec<Mutex<Vec<Weight>>>> = Arc::new(
        (0..threads)
            .map(|_| Mutex::new(Vec::new()))
            .collect(),
    );

    for thread_id in 0..threads {
        let entries = Arc::clone(entries);
        let parameters = Arc::clone(&shared_parameters);
        let slots = Arc::clone(&slots);

        pool.enqueue(move || {
            let (begin, end) = partition(entries.len(), threads, thread_id);
            let mut local = vec![Weight::ZERO; parameters.len()];
            for entry in &entries[begin..end] {
                update_single_gradient(&mut local, entry, &parameters, k);
            }
            *slots[thread_id].lock().unwrap() = local;
        });
    }
    pool.wait_for_completion();

    let mut gradient = vec![Weight::ZERO; parameters.len()];
    for slot in slots.iter() {
        let local = slot.lock().unwrap();
        for (total, partial) in gradient.iter_mut().zip(local.iter()) {
            *total += *partial;
        }
    }
    gradient
}

fn average_error(
    pool: &ThreadPool,
    entries: &Arc<Vec<Entry>>,
    parameters: &[Weight],
    k: f64,
    threads: usize,
) -> f64 {
    let shared_parameters = Arc::new(parameters.to_vec());
    let slots: Arc<Vec<Mutex<f64>>> = Arc::new((0..threads).map(|_| Mutex::new(0.0)).collect());

    for thread_id in 0..threads {
        let entries = Arc::clone(entries);
        let parameters = Arc::clone(&shared_parameters);
        let slots = Arc::clone(&slots);

        pool.enqueue(move || {
            let (begin, end) = partition(entries.len(), threads, thread_id);
            let mut error = 0.0;
            for entry in &entries[begin..end] {
                let diff = entry.wdl - sigmoid(k, entry.evaluate(&parameters));
                error += diff * diff;
            }
            *slots[thread_id].lock().unwrap() = error;
        });
    }
    pool.wait_for_completion();

    let total: f64 = slots.iter().map(|slot| *slot.lock().unwrap()).sum();
    total / entries.len() as f64
}

/// Gradient descent on K itself, with the derivative taken numerically by
/// central difference.
fn calibrate_k(
    pool: &ThreadPool,
    entries: &Arc<Vec<Entry>>,
    parameters: &[Weight],
    threads: usize,
) -> f64 {
    const RATE: f64 = 10.0;
    const DELTA: f64 = 1e-5;
    const GOAL: f64 = 1e-6;

    let mut k = 2.5;
    loop {
        let up = average_error(pool, entries, parameters, k + DELTA, threads);
        let down = average_error(pool, entries, parameters, k - DELTA, threads);
        let deviation = (up - down) / (2.0 * DELTA);
        if deviation.abs() < GOAL {
            break;
        }
        k -= RATE * deviation;
    }
    k
}

/// One optimizer step over the whole parameter vector. Bias correction is
/// left out.
fn adam_step(
    parameters: &mut [Weight],
    gradient: &[Weight],
    momentum: &mut [Weight],
    velocity: &mut [Weight],
    k: f64,
    learning_rate: f64,
    entry_count: f64,
) {
    for i in 0..parameters.len() {
        let g_mg = -k / SIGMOID_SCALE * gradient[i].mg / entry_count;
        let g_eg = -k / SIGMOID_SCALE * gradient[i].eg / entry_count;

        momentum[i].mg = BETA1 * momentum[i].mg + (1.0 - BETA1) * g_mg;
        momentum[i].eg = BETA1 * momentum[i].eg + (1.0 - BETA1) * g_eg;
        velocity[i].mg = BETA2 * velocity[i].mg + (1.0 - BETA2) * g_mg * g_mg;
        velocity[i].eg = BETA2 * velocity[i].eg + (1.0 - BETA2) * g_eg * g_eg;

        parameters[i].mg -= learning_rate * momentum[i].mg / (EPSILON + velocity[i].mg.sqrt());
        parameters[i].eg -= learning_rate * momentum[i].eg / (EPSILON + velocity[i].eg.sqrt());
    }
}

pub fn run<E: Evaluator + 'static>(sources: &[DataSource], config: &Config) -> Result<()> {
    let start = Instant::now();
    println!("Starting tuning for '{}'", E::NAME);

    let mut parameters = E::initial_parameters();
    let mut pool = ThreadPool::start(config.pool_threads());

    let entries = loader::load_sources::<E>(sources, &parameters, &pool, config, start)?;
    let entries = Arc::new(entries);
    if entries.is_empty() {
        println!("No training positions loaded");
        pool.stop();
        return Ok(());
    }

    let k = if E::PREFERRED_K > 0.0 {
        E::PREFERRED_K
    } else {
        println!("Calibrating K...");
        calibrate_k(&pool, &entries, &parameters, config.threads)
    };
    println!("K = {}", k);

    if E::RETUNE_FROM_ZERO {
        for parameter in parameters.iter_mut() {
            *parameter = Weight::ZERO;
        }
    }

    let initial_error = average_error(&pool, &entries, &parameters, k, config.threads);
    print_elapsed(start);
    println!("Initial error = {:.8}", initial_error);
    println!("Initial parameters:");
    E::print_parameters(&parameters);

    let mut momentum = vec![Weight::ZERO; parameters.len()];
    let mut velocity = vec![Weight::ZERO; parameters.len()];
    let mut learning_rate = E::INITIAL_LEARNING_RATE;
    let entry_count = entries.len() as f64;

    let mut window = Instant::now();
    for epoch in 1..=E::MAX_EPOCH {
        let gradient = compute_gradient(&pool, &entries, &parameters, k, config.threads);
        adam_step(
            &mut parameters,
            &gradient,
            &mut momentum,
            &mut velocity,
            k,
            learning_rate,
            entry_count,
        );

        if epoch % REPORT_INTERVAL == 0 {
            let error = average_error(&pool, &entries, &parameters, k, config.threads);
            let epochs_per_second = f64::from(REPORT_INTERVAL) / window.elapsed().as_secs_f64();
            window = Instant::now();

            print_elapsed(start);
            println!(
                "Epoch {}, error {:.8}, lr {}, {:.1} epochs/s",
                epoch, error, learning_rate, epochs_per_second
            );
            E::print_parameters(&parameters);
        }

        if E::LEARNING_RATE_DROP_INTERVAL > 0 && epoch % E::LEARNING_RATE_DROP_INTERVAL == 0 {
            learning_rate *= E::LEARNING_RATE_DROP_RATIO;
        }
    }

    pool.stop();
    Ok(())
}
