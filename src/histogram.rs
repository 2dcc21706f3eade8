use std::collections::HashMap;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use parking_lot::RwLock;

/// Frequency table of iteration counts, with running extrema so the display
/// side does not need to scan the buckets.
#[derive(Clone, Debug, Default)]
pub struct Histogram {
    buckets: HashMap<u32, u64>,
    min: Option<u32>,
    max: Option<u32>,
    peak: Option<(u32, u64)>,
    bumps: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: u32) -> u64 {
        self.increment_by(key, 1)
    }

    pub fn increment_by(&mut self, key: u32, amount: u64) -> u64 {
        let value = self.buckets.entry(key).or_insert(0);
        *value += amount;
        let value = *value;

        self.min = Some(self.min.map_or(key, |m| m.min(key)));
        self.max = Some(self.max.map_or(key, |m| m.max(key)));
        match self.peak {
            Some((_, height)) if height >= value => (),
            _ => self.peak = Some((key, value)),
        }
        self.bumps += amount;
        value
    }

    /// Re-keys every bucket through `bucketing`, summing buckets that land on
    /// the same key.
    pub fn bucketed<F>(&self, bucketing: F) -> Histogram
    where
        F: Fn(u32) -> u32,
    {
        let mut b = Histogram::new();
        for (&key, &value) in &self.buckets {
            b.increment_by(bucketing(key), value);
        }
        b
    }

    pub fn min(&self) -> Option<u32> {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Value of the largest bucket, 0 when empty.
    pub fn height(&self) -> u64 {
        self.peak.map_or(0, |(_, height)| height)
    }

    pub fn peak_position(&self) -> Option<u32> {
        self.peak.map(|(key, _)| key)
    }

    pub fn bumps(&self) -> u64 {
        self.bumps
    }

    pub fn value_at(&self, key: u32) -> u64 {
        self.buckets.get(&key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.buckets.iter().map(|(&k, &v)| (k, v))
    }
}

/// Histogram shared between calculator threads. Each increment takes the
/// write lock for the duration of one map update.
#[derive(Clone, Debug, Default)]
pub struct SharedHistogram {
    inner: Arc<RwLock<Histogram>>,
}

impl SharedHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, key: u32) -> u64 {
        self.inner.write().increment(key)
    }

    pub fn snapshot(&self) -> Histogram {
        self.inner.read().clone()
    }
}

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Bar chart of a histogram with logarithmic bucket widths: low iteration
/// counts get most of the horizontal space. Bars are black on white,
/// scaled to the tallest bucket.
pub fn chart(histogram: &Histogram, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, WHITE);
    let max = match histogram.max() {
        Some(max) => max,
        None => return img,
    };
    let log_max = (max.max(2) as f64).ln();
    let bucketed =
        histogram.bucketed(|k| ((k as f64 + 1.0).ln() * width as f64 / log_max) as u32);
    let tallest = bucketed.height();
    for x in 0..width {
        let bar = bucketed.value_at(x) * height as u64 / tallest;
        for y in 0..height {
            if y as u64 <= bar {
                img.put_pixel(x, height - 1 - y, BLACK);
            }
        }
    }
    img
}
