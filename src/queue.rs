use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use parking_lot::{Condvar, Mutex};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderTask {
    pub x: u32,
    pub y: u32,
    pub scale: u32,
    /// The origin pixel was already evaluated (and painted) by the parent.
    pub top_left_done: bool,
    pub priority: u32,
}

impl RenderTask {
    pub fn root(scale: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            scale,
            top_left_done: false,
            priority: 0,
        }
    }

    fn key(&self) -> Reverse<u32> {
        Reverse(self.priority)
    }
}

// BinaryHeap is a max-heap; ordering on the reversed priority makes it pop
// the smallest priority first.
struct Queued(RenderTask);

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.0.key() == other.0.key()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.key().cmp(&other.0.key())
    }
}

struct State {
    heap: BinaryHeap<Queued>,
    closed: bool,
}

/// Once closed, pushes are discarded and `pop` returns `None`.
pub struct TaskQueue {
    state: Mutex<State>,
    ready: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn push(&self, task: RenderTask) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.heap.push(Queued(task));
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Waits for the task with the smallest priority. `None` once closed.
    pub fn pop(&self) -> Option<RenderTask> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(Queued(task)) = state.heap.pop() {
                return Some(task);
            }
            self.ready.wait(&mut state);
        }
    }

    pub fn try_pop(&self) -> Option<RenderTask> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.heap.pop().map(|Queued(task)| task)
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.heap.clear();
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn task(priority: u32) -> RenderTask {
        RenderTask {
            x: priority,
            y: 0,
            scale: 1,
            top_left_done: false,
            priority,
        }
    }

    #[test]
    fn test_smallest_priority_first() {
        let q = TaskQueue::new();
        for p in [5, 1, 9, 3, 3, 0, 7] {
            q.push(task(p));
        }
        assert_eq!(q.len(), 7);
        let order: Vec<u32> = (0..7).map(|_| q.pop().unwrap().priority).collect();
        assert_eq!(order, vec![0, 1, 3, 3, 5, 7, 9]);
        assert!(q.is_empty());
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_close_discards_and_rejects() {
        let q = TaskQueue::new();
        q.push(task(1));
        q.push(task(2));
        q.close();
        assert!(q.is_closed());
        assert_eq!(q.len(), 0);
        assert!(!q.push(task(3)));
        assert_eq!(q.len(), 0);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_blocked_pop_wakes_on_push() {
        let q = Arc::new(TaskQueue::new());
        let (tx, rx) = mpsc::channel();
        let consumer = {
            let q = q.clone();
            thread::spawn(move || {
                tx.send(()).unwrap();
                q.pop()
            })
        };
        rx.recv().unwrap();
        q.push(task(42));
        assert_eq!(consumer.join().unwrap(), Some(task(42)));
    }

    #[test]
    fn test_blocked_pop_wakes_on_close() {
        let q = Arc::new(TaskQueue::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let q = q.clone();
                thread::spawn(move || q.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        q.close();
        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }
}
