use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error};

use crate::errors::*;

/// Counts jobs that panicked. A panicking job is logged and skipped so the
/// thread that ran it stays alive.
#[derive(Clone, Debug, Default)]
pub struct Faults(Arc<AtomicUsize>);

impl Faults {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Runs `f`, catching and logging a panic. Returns false if it panicked.
    pub fn guard<F: FnOnce()>(&self, name: &str, f: F) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(()) => true,
            Err(cause) => {
                self.0.fetch_add(1, Ordering::SeqCst);
                error!("{}: job panicked: {}", name, panic_message(&*cause));
                false
            }
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown cause".to_string()
    }
}

pub fn spawn_named<F>(name: String, f: F) -> Result<Worker>
where
    F: FnOnce() + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .chain_err(|| format!("failed to spawn thread '{}'", name))?;
    Ok(Worker { name, handle })
}

pub struct Worker {
    name: String,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| ErrorKind::WorkerPanicked(self.name).into())
    }
}

/// Fixed set of threads pulling jobs from one bounded channel. The pool
/// shuts down once every sender returned by `spawn` is dropped and the
/// channel is drained.
pub struct ThreadPool {
    workers: Vec<Worker>,
    faults: Faults,
}

impl ThreadPool {
    pub fn spawn<T, F>(
        name: &str,
        n: usize,
        faults: Faults,
        handler: F,
    ) -> Result<(Sender<T>, Self)>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let n = n.max(1);
        let (tx, rx) = bounded::<T>(n);
        let handler = Arc::new(handler);
        let mut workers = Vec::with_capacity(n);
        for i in 0..n {
            let thread_name = format!("{}-{}", name, i);
            let rx: Receiver<T> = rx.clone();
            let handler = handler.clone();
            let faults = faults.clone();
            let label = thread_name.clone();
            workers.push(spawn_named(thread_name, move || {
                for job in rx.iter() {
                    faults.guard(&label, || handler(job));
                }
                debug!("{} exiting", label);
            })?);
        }
        Ok((tx, Self { workers, faults }))
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Joins every worker, reporting the first that panicked outside a job.
    pub fn join(self) -> Result<()> {
        let mut result = Ok(());
        for worker in self.workers {
            let joined = worker.join();
            if result.is_ok() {
                result = joined;
            }
        }
        result
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicU64;

    use super::*;

    #[test]
    fn test_pool_runs_every_job() {
        let total = Arc::new(AtomicU64::new(0));
        let sum = total.clone();
        let (tx, pool) = ThreadPool::spawn("sum", 4, Faults::default(), move |x: u64| {
            sum.fetch_add(x, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(pool.size(), 4);
        for x in 1..=100 {
            tx.send(x).unwrap();
        }
        drop(tx);
        pool.join().unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 5050);
    }

    #[test]
    fn test_panicking_job_is_counted_and_pool_survives() {
        let done = Arc::new(AtomicU64::new(0));
        let counter = done.clone();
        let (tx, pool) = ThreadPool::spawn("faulty", 2, Faults::default(), move |x: u64| {
            if x % 10 == 0 {
                panic!("bad job {}", x);
            }
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let faults = pool.faults().clone();
        for x in 1..=50 {
            tx.send(x).unwrap();
        }
        drop(tx);
        pool.join().unwrap();
        assert_eq!(faults.count(), 5);
        assert_eq!(done.load(Ordering::SeqCst), 45);
    }

    #[test]
    fn test_zero_size_pool_gets_one_worker() {
        let (tx, pool) = ThreadPool::spawn("one", 0, Faults::default(), |_: ()| {}).unwrap();
        assert_eq!(pool.size(), 1);
        drop(tx);
        pool.join().unwrap();
    }
}
