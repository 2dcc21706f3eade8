use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use image::{Rgb, RgbImage};
use log::debug;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::*;
use crate::threads::{spawn_named, Faults, Worker};

/// Anything the painter can draw on.
pub trait PixelBuffer {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>);

    fn fill_block(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
        for py in y..y + height {
            for px in x..x + width {
                self.set_pixel(px, py, color);
            }
        }
    }
}

impl PixelBuffer for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        self.put_pixel(x, y, color);
    }
}

/// Only the painter thread writes; everyone else reads.
pub struct Canvas<B> {
    buffer: Arc<RwLock<B>>,
}

impl<B> Clone for Canvas<B> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
        }
    }
}

impl<B: PixelBuffer> Canvas<B> {
    pub fn new(buffer: B) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(buffer)),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.read().width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.read().height()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, B> {
        self.buffer.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, B> {
        self.buffer.write()
    }

    pub fn into_inner(self) -> std::result::Result<B, Self> {
        Arc::try_unwrap(self.buffer)
            .map(RwLock::into_inner)
            .map_err(|buffer| Self { buffer })
    }
}

impl Canvas<RgbImage> {
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height))
    }

    pub fn snapshot(&self) -> RgbImage {
        self.buffer.read().clone()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PaintJob {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: Rgb<u8>,
}

impl PaintJob {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Debug, Default)]
pub struct Progress {
    pixels: AtomicU64,
    points: AtomicU64,
}

impl Progress {
    fn record(&self, job: &PaintJob) {
        self.pixels.fetch_add(job.area(), Ordering::SeqCst);
        self.points.fetch_add(1, Ordering::SeqCst);
    }

    pub fn pixels_written(&self) -> u64 {
        self.pixels.load(Ordering::SeqCst)
    }

    pub fn points_painted(&self) -> u64 {
        self.points.load(Ordering::SeqCst)
    }
}

/// Applies jobs in arrival order until every sender is gone or `cancelled`
/// is raised.
pub fn spawn_painter<B>(
    name: String,
    canvas: Canvas<B>,
    jobs: Receiver<PaintJob>,
    cancelled: Arc<AtomicBool>,
    progress: Arc<Progress>,
    faults: Faults,
) -> Result<Worker>
where
    B: PixelBuffer + Send + Sync + 'static,
{
    let label = name.clone();
    spawn_named(name, move || {
        for job in jobs.iter() {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            let painted = faults.guard(&label, || {
                canvas
                    .write()
                    .fill_block(job.x, job.y, job.width, job.height, job.color);
            });
            if painted {
                progress.record(&job);
            }
        }
        debug!("{} exiting", label);
    })
}
