use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Fire-and-forget sink for per-iteration training metrics. Implementations
/// must never push back on the training loop; failures are swallowed.
pub trait MetricSink {
    fn record(&mut self, iteration: usize, episodes: usize, score_avg: f32);
}

impl<T: MetricSink + ?Sized> MetricSink for Box<T> {
    fn record(&mut self, iteration: usize, episodes: usize, score_avg: f32) {
        (**self).record(iteration, episodes, score_avg)
    }
}

/// Discards all metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricSink for NoopSink {
    fn record(&mut self, _iteration: usize, _episodes: usize, _score_avg: f32) {}
}

/// Emits metrics through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl MetricSink for ConsoleSink {
    fn record(&mut self, iteration: usize, episodes: usize, score_avg: f32) {
        info!(iteration, episodes, score_avg = score_avg as f64, "training progress");
    }
}

/// Writes one JSON object per record. The payload is small enough to encode
/// by hand, which keeps serialization out of the dependency tree.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl MetricSink for JsonlSink {
    fn record(&mut self, iteration: usize, episodes: usize, score_avg: f32) {
        let _ = writeln!(
            self.writer,
            "{{\"iteration\":{iteration},\"episodes\":{episodes},\"score_avg\":{score_avg}}}"
        );
        let _ = self.writer.flush();
    }
}

/// Keeps records in memory; used by tests and evaluation tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<(usize, usize, f32)>,
}

impl MetricSink for RecordingSink {
    fn record(&mut self, iteration: usize, episodes: usize, score_avg: f32) {
        self.records.push((iteration, episodes, score_avg));
    }
}
