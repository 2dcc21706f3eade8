//! One progressive render of one view onto one canvas.
//!
//! A session runs three kinds of threads: a dispatcher that pops tasks from
//! the priority queue, a pool of calculators that evaluate and split them,
//! and a single painter that owns all writes to the canvas. Rendering starts
//! with one block covering the whole image and keeps quartering blocks until
//! every pixel has been evaluated exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use error_chain::bail;
use log::{debug, error, info, trace, warn};

use crate::complex::C;
use crate::coord::{Plane, RenderParameters};
use crate::errors::*;
use crate::histogram::{Histogram, SharedHistogram};
use crate::painter::{spawn_painter, Canvas, PaintJob, PixelBuffer, Progress};
use crate::palette::Palette;
use crate::queue::{RenderTask, TaskQueue};
use crate::solver::evaluate;
use crate::threads::{spawn_named, Faults, ThreadPool, Worker};

const WAIT_POLL: Duration = Duration::from_millis(5);

#[derive(Copy, Clone, Debug)]
pub struct SessionConfig {
    pub workers: usize,
    pub palette: Palette,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get_physical(),
            palette: Palette::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Stopped,
}

/// Quadrants of `task` inside the image. The top-left one shares the
/// parent's origin and is marked as already computed.
pub fn subdivide(task: &RenderTask, priority: u32, width: u32, height: u32) -> Vec<RenderTask> {
    if task.scale <= 1 {
        return vec![];
    }
    let scale = task.scale / 2;
    let child = |x, y, top_left_done| RenderTask {
        x,
        y,
        scale,
        top_left_done,
        priority,
    };

    let mut children = Vec::with_capacity(4);
    children.push(child(task.x, task.y, true));
    let right = task.x + scale;
    let bottom = task.y + scale;
    if right < width {
        children.push(child(right, task.y, false));
        if bottom < height {
            children.push(child(right, bottom, false));
        }
    }
    if bottom < height {
        children.push(child(task.x, bottom, false));
    }
    children
}

struct Calculator {
    plane: Plane,
    bailout: u32,
    palette: Palette,
    queue: Arc<TaskQueue>,
    histogram: SharedHistogram,
    paint: Sender<PaintJob>,
    cancelled: Arc<AtomicBool>,
}

impl Calculator {
    fn run(&self, task: RenderTask) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        trace!("task {:?}", task);
        let priority = if task.top_left_done {
            task.priority
        } else {
            self.calculate_point(&task)
        };
        for child in subdivide(&task, priority, self.plane.width(), self.plane.height()) {
            if !self.queue.push(child) {
                break;
            }
        }
    }

    fn calculate_point(&self, task: &RenderTask) -> u32 {
        let c = self.plane.pixel_to_world(task.x, task.y);
        let result = evaluate(c.re, c.im, self.bailout);
        let color = self.palette.color(&result, self.bailout);
        let (width, height) = self.plane.clip(task.x, task.y, task.scale);
        let job = PaintJob {
            x: task.x,
            y: task.y,
            width,
            height,
            color,
        };
        if self.paint.send(job).is_err() && !self.cancelled.load(Ordering::SeqCst) {
            warn!("painter is gone, dropped paint job at ({}, {})", task.x, task.y);
        }
        self.histogram.increment(result.iterations);
        result.iterations
    }
}

fn dispatch(queue: &TaskQueue, calculators: Sender<RenderTask>, cancelled: &AtomicBool) {
    while !cancelled.load(Ordering::SeqCst) {
        let task = match queue.pop() {
            Some(task) => task,
            None => break,
        };
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        if calculators.send(task).is_err() {
            warn!("calculators are gone, dispatcher stopping");
            break;
        }
    }
}

#[derive(Default)]
struct Threads {
    dispatcher: Option<Worker>,
    calculators: Option<ThreadPool>,
    painter: Option<Worker>,
}

impl Threads {
    fn join(&mut self) -> Result<()> {
        let mut result = Ok(());
        if let Some(dispatcher) = self.dispatcher.take() {
            result = result.and(dispatcher.join());
        }
        if let Some(calculators) = self.calculators.take() {
            result = result.and(calculators.join());
        }
        if let Some(painter) = self.painter.take() {
            result = result.and(painter.join());
        }
        result
    }
}

pub struct RenderSession<B: PixelBuffer> {
    params: RenderParameters,
    plane: Plane,
    root_scale: u32,
    config: SessionConfig,
    canvas: Canvas<B>,
    queue: Arc<TaskQueue>,
    histogram: SharedHistogram,
    progress: Arc<Progress>,
    cancelled: Arc<AtomicBool>,
    faults: Faults,
    state: SessionState,
    threads: Threads,
}

impl<B> RenderSession<B>
where
    B: PixelBuffer + Send + Sync + 'static,
{
    pub fn new(
        params: RenderParameters,
        canvas: Canvas<B>,
        config: SessionConfig,
    ) -> Result<Self> {
        let (width, height) = (canvas.width(), canvas.height());
        if width == 0 || height == 0 {
            bail!(ErrorKind::InvalidParameters(format!(
                "canvas must not be empty, got {}x{}",
                width, height
            )));
        }
        let plane = Plane::new(&params, width, height);
        let root_scale = match plane.initial_scale() {
            Some(scale) => scale,
            None => bail!(ErrorKind::InvalidParameters(format!(
                "canvas {}x{} is too large to subdivide",
                width, height
            ))),
        };
        Ok(Self {
            plane,
            root_scale,
            params,
            config,
            canvas,
            queue: Arc::new(TaskQueue::new()),
            histogram: SharedHistogram::new(),
            progress: Arc::new(Progress::default()),
            cancelled: Arc::new(AtomicBool::new(false)),
            faults: Faults::default(),
            state: SessionState::Created,
            threads: Threads::default(),
        })
    }

    pub fn launch(
        params: RenderParameters,
        canvas: Canvas<B>,
        config: SessionConfig,
    ) -> Result<Self> {
        let mut session = Self::new(params, canvas, config)?;
        session.start()?;
        Ok(session)
    }

    /// Spawns every thread and seeds the root task without waiting.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Created {
            bail!(ErrorKind::InvalidState(format!(
                "cannot start a session that is {:?}",
                self.state
            )));
        }
        self.state = SessionState::Running;
        if let Err(e) = self.spawn_threads() {
            self.stop();
            if let Err(join_err) = self.threads.join() {
                error!("render thread failed while shutting down: {}", join_err);
            }
            return Err(e);
        }

        let root = RenderTask::root(self.root_scale);
        info!(
            "rendering {}x{} at {} width {} bailout {} with {} calculators",
            self.plane.width(),
            self.plane.height(),
            self.params.center,
            self.params.width,
            self.params.bailout,
            self.config.workers.max(1)
        );
        self.queue.push(root);
        Ok(())
    }

    fn spawn_threads(&mut self) -> Result<()> {
        let (paint_tx, paint_rx) = unbounded();
        self.threads.painter = Some(spawn_painter(
            "painter".to_string(),
            self.canvas.clone(),
            paint_rx,
            self.cancelled.clone(),
            self.progress.clone(),
            self.faults.clone(),
        )?);

        let calculator = Calculator {
            plane: self.plane,
            bailout: self.params.bailout,
            palette: self.config.palette,
            queue: self.queue.clone(),
            histogram: self.histogram.clone(),
            paint: paint_tx,
            cancelled: self.cancelled.clone(),
        };
        let (calc_tx, pool) = ThreadPool::spawn(
            "calculator",
            self.config.workers,
            self.faults.clone(),
            move |task| calculator.run(task),
        )?;
        self.threads.calculators = Some(pool);

        let queue = self.queue.clone();
        let cancelled = self.cancelled.clone();
        self.threads.dispatcher = Some(spawn_named("dispatcher".to_string(), move || {
            dispatch(&queue, calc_tx, &cancelled);
            debug!("dispatcher exiting");
        })?);
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.cancelled.store(true, Ordering::SeqCst);
        self.queue.close();
        if self.state == SessionState::Running {
            info!(
                "render stopped at {}/{} points",
                self.painted_points(),
                self.total_points()
            );
        }
        self.state = SessionState::Stopped;
    }

    /// Stops and waits for every thread. Nothing touches the canvas after.
    pub fn join(&mut self) -> Result<()> {
        self.stop();
        let result = self.threads.join();
        if let Err(ref e) = result {
            error!("render thread failed: {}", e);
        }
        result
    }

    /// Returns whether the render completed before the timeout or a fault.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let started = Instant::now();
        loop {
            if self.is_complete() {
                info!("render complete, {} pixel writes", self.progress());
                return true;
            }
            if self.state != SessionState::Running || self.faults.count() > 0 {
                return false;
            }
            if let Some(timeout) = timeout {
                if started.elapsed() >= timeout {
                    return false;
                }
            }
            thread::sleep(WAIT_POLL);
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> &RenderParameters {
        &self.params
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn canvas(&self) -> &Canvas<B> {
        &self.canvas
    }

    /// Pixel writes, overlaps included, so it can exceed `total_points()`.
    pub fn progress(&self) -> u64 {
        self.progress.pixels_written()
    }

    pub fn painted_points(&self) -> u64 {
        self.progress.points_painted()
    }

    pub fn total_points(&self) -> u64 {
        self.plane.pixel_count()
    }

    pub fn is_complete(&self) -> bool {
        self.painted_points() >= self.total_points()
    }

    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    pub fn histogram(&self) -> Histogram {
        self.histogram.snapshot()
    }

    pub fn faults(&self) -> usize {
        self.faults.count()
    }

    pub fn pixel_to_world(&self, px: u32, py: u32) -> C<f64> {
        self.plane.pixel_to_world(px, py)
    }
}

impl<B: PixelBuffer> Drop for RenderSession<B> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.queue.close();
    }
}
