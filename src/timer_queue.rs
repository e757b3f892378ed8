use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, HashSet},
    fmt,
    sync::{Arc, Condvar, Mutex},
    thread,
    time::{Duration, Instant},
};

use log::debug;

pub type TimerCallback = Box<dyn FnOnce(bool) + Send>;

/// Executes handlers at a specified time in the future, on a dedicated
/// worker thread.
///
/// Guarantees:
/// - every handler runs exactly once, even when cancelled (the `aborted`
///   parameter is `true` in that case);
/// - handlers always run on the worker thread;
/// - dropping the queue cancels everything and joins the worker.
///
/// Cancellation never removes an item from the middle of the heap: the
/// callback is detached and re-queued as an immediately-due tombstone, so
/// the heap order stays intact.
pub struct TimerQueue {
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    deadline: Instant,
    id: u64,
}

struct State {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    callbacks: HashMap<u64, TimerCallback>,
    cancelled: HashSet<u64>,
    id_counter: u64,
    finish: bool,
}

struct Shared {
    state: Mutex<State>,
    work_changed: Condvar,
}

impl TimerQueue {
    pub fn new() -> TimerQueue {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                callbacks: HashMap::new(),
                cancelled: HashSet::new(),
                id_counter: 0,
                finish: false,
            }),
            work_changed: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("timer-queue".to_string())
            .spawn(move || run_worker(&worker_shared))
            .expect("failed to spawn timer queue worker");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Adds a new timer. Returns the id usable with [`TimerQueue::cancel`].
    pub fn add(&self, delay: Duration, handler: impl FnOnce(bool) + Send + 'static) -> u64 {
        let mut state = self.shared.state.lock().unwrap();
        state.id_counter += 1;
        let id = state.id_counter;

        state.heap.push(Reverse(HeapEntry {
            deadline: Instant::now() + delay,
            id,
        }));
        state.callbacks.insert(id, Box::new(handler));
        drop(state);

        self.shared.work_changed.notify_one();
        id
    }

    /// Cancels the timer. Returns `false` when it was too late (or the id
    /// was never valid). The handler still runs on the worker thread, with
    /// `aborted == true`.
    pub fn cancel(&self, id: u64) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        if !state.callbacks.contains_key(&id) {
            return false;
        }
        state.cancelled.insert(id);
        state.heap.push(Reverse(HeapEntry {
            deadline: Instant::now(),
            id,
        }));
        drop(state);

        self.shared.work_changed.notify_one();
        true
    }

    /// Cancels every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.shared.state.lock().unwrap();
        let now = Instant::now();
        let pending: Vec<u64> = state.callbacks.keys().copied().collect();
        for id in &pending {
            state.cancelled.insert(*id);
            state.heap.push(Reverse(HeapEntry { deadline: now, id: *id }));
        }
        drop(state);

        self.shared.work_changed.notify_one();
        pending.len()
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().unwrap().callbacks.len()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerQueue {
    fn drop(&mut self) {
        self.cancel_all();
        {
            let mut state = self.shared.state.lock().unwrap();
            state.finish = true;
        }
        self.shared.work_changed.notify_one();

        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerQueue(pending: {})", self.pending())
    }
}

fn run_worker(shared: &Shared) {
    let mut state = shared.state.lock().unwrap();

    loop {
        if state.finish && state.callbacks.is_empty() {
            break;
        }

        let head: Option<HeapEntry> = state.heap.peek().map(|Reverse(entry)| *entry);

        match head {
            Some(entry) if entry.deadline <= Instant::now() => {
                state.heap.pop();
                // A duplicate of an already-executed tombstone pops with no
                // callback left; skip it.
                if let Some(callback) = state.callbacks.remove(&entry.id) {
                    let aborted = state.cancelled.remove(&entry.id);
                    drop(state);
                    debug!("timer {} fired (aborted: {aborted})", entry.id);
                    callback(aborted);
                    state = shared.state.lock().unwrap();
                } else {
                    state.cancelled.remove(&entry.id);
                }
            }
            Some(entry) => {
                let wait = entry.deadline.saturating_duration_since(Instant::now());
                let (next, _) = shared.work_changed.wait_timeout(state, wait).unwrap();
                state = next;
            }
            None => {
                let (next, _) = shared
                    .work_changed
                    .wait_timeout(state, Duration::from_millis(10))
                    .unwrap();
                state = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_in_deadline_order() {
        let queue = TimerQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (delay, label) in [(40u64, 'b'), (10, 'a'), (70, 'c')] {
            let order = Arc::clone(&order);
            queue.add(Duration::from_millis(delay), move |aborted| {
                if !aborted {
                    order.lock().unwrap().push(label);
                }
            });
        }

        thread::sleep(Duration::from_millis(150));
        assert_eq!(*order.lock().unwrap(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn cancelled_handler_runs_aborted() {
        let queue = TimerQueue::new();
        let aborted_count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&aborted_count);
        let id = queue.add(Duration::from_secs(60), move |aborted| {
            if aborted {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(queue.cancel(id));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(aborted_count.load(Ordering::SeqCst), 1);
        // Too late to cancel twice
        assert!(!queue.cancel(id));
    }

    #[test]
    fn drop_cancels_pending() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let queue = TimerQueue::new();
            let counter = Arc::clone(&fired);
            queue.add(Duration::from_secs(60), move |aborted| {
                assert!(aborted);
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
