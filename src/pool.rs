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

//! A fixed set of workers draining one FIFO task queue. Tasks carry no
//! return value; anything a task produces goes into shared slots owned by
//! the submitter, so the hot loops never contend on this queue.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<Task>,
    /// Tasks enqueued but not yet finished.
    pending: usize,
    stop: bool,
}

struct Shared {
    state: Mutex<State>,
    task_ready: Condvar,
    all_done: Condvar,
}

pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn start(threads: usize) -> ThreadPool {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                pending: 0,
                stop: false,
            }),
            task_ready: Condvar::new(),
            all_done: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("worker #{:>3}", id))
                    .spawn(move || worker_loop(&shared))
                    .unwrap()
            })
            .collect();

        ThreadPool { shared, workers }
    }

    pub fn enqueue<F: FnOnce() + Send + 'static>(&self, task: F) {
        let mut state = self.shared.state.lock().unwrap();
        state.queue.push_back(Box::new(task));
        state.pending += 1;
        self.shared.task_ready.notify_one();
    }

    /// Blocks the caller until every task enqueued so far has run to
    /// completion.
    pub fn wait_for_completion(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.pending > 0 {
            state = self.shared.all_done.wait(state).unwrap();
        }
    }

    /// Lets the workers drain the queue, then joins them.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.stop = true;
        }
        self.shared.task_ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if let Some(task) = state.queue.pop_front() {
                    break task;
                }
                if state.stop {
                    return;
                }
                state = shared.task_ready.wait(state).unwrap();
            }
        };

        task();

        let mut state = shared.state.lock().unwrap();
        state.pending -= 1;
        if state.pending == 0 {
            shared.all_done.notify_all();
        }
    }
}
