//! A bounded worker pool for file-parallel loading (§5), built from
//! `std::thread::spawn` and `mpsc` channels rather than an external
//! executor crate — the teacher never reaches for one (see
//! `rch-worker`'s executor, which streams stdout/stderr on plain
//! `std::thread::spawn` handles), and this engine's loading phase has
//! the same shape: a fixed batch of independent, short-lived units of
//! work whose results collect into one place.

use std::sync::mpsc;
use std::thread;

/// Resolve the pool size per §5: 75% of available cores, clamped to
/// `[2, 16]`, overridable by `--jobs`.
pub fn resolve_pool_size(override_jobs: Option<usize>, available_cores: usize) -> usize {
    if let Some(jobs) = override_jobs {
        return jobs.clamp(2, 16);
    }
    let suggested = (available_cores * 3) / 4;
    suggested.clamp(2, 16)
}

/// Run `work_items` through `f` using up to `worker_count` threads,
/// collecting results in input order. `f` receives the item's index so
/// diagnostics can reference the original position.
///
/// `continue_on_error` mirrors §5's load semantics: an `Err` from one
/// item never aborts the batch; the caller inspects each `Result` after
/// the pool drains.
pub fn run_bounded<T, R, F>(work_items: Vec<T>, worker_count: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> R + Send + Sync + 'static,
{
    let worker_count = worker_count.max(1).min(work_items.len().max(1));
    let (work_tx, work_rx) = mpsc::channel::<(usize, T)>();
    let work_rx = std::sync::Arc::new(std::sync::Mutex::new(work_rx));
    let (result_tx, result_rx) = mpsc::channel::<(usize, R)>();
    let f = std::sync::Arc::new(f);

    for (index, item) in work_items.into_iter().enumerate() {
        work_tx.send((index, item)).expect("worker channel open");
    }
    drop(work_tx);

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let work_rx = std::sync::Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let f = std::sync::Arc::clone(&f);
        handles.push(thread::spawn(move || loop {
            let next = { work_rx.lock().expect("worker lock").recv() };
            match next {
                Ok((index, item)) => {
                    let result = f(index, item);
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }));
    }
    drop(result_tx);

    let mut collected: Vec<(usize, R)> = result_rx.into_iter().collect();
    for handle in handles {
        let _ = handle.join();
    }
    collected.sort_by_key(|(index, _)| *index);
    collected.into_iter().map(|(_, r)| r).collect()
}
