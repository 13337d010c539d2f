//! Recorder writing TFRecord files for TensorBoard.
use anyhow::{anyhow, Result};
use campus_core::record::{Record, RecordValue, Recorder};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
    ignore_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`. The step of each record is read
    /// from the `episode` key.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: "episode".to_string(),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardRecorder`] failing on string values.
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            ignore_unsupported_value: false,
            ..Self::new(logdir)
        }
    }

    /// Sets the key of the step of records.
    pub fn step_key(mut self, key: impl Into<String>) -> Self {
        self.step_key = key.into();
        self
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [`Record`] into a TFRecord.
    ///
    /// Scalars are written as they are and arrays as their mean, under
    /// `<key>/mean`. Strings are ignored, or rejected if the recorder was
    /// built with [`TensorboardRecorder::new_with_check_unsupported_value`].
    fn write(&mut self, record: Record) -> Result<()> {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            Some(_) => return Err(anyhow!("Step key {} is not a scalar", self.step_key)),
            None => return Err(anyhow!("Missing step key {}", self.step_key)),
        };

        for (k, v) in record.iter() {
            if *k == self.step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::Array1(data) if !data.is_empty() => {
                    let mean = data.iter().sum::<f32>() / data.len() as f32;
                    self.writer.add_scalar(&format!("{}/mean", k), mean, step)
                }
                RecordValue::Array1(_) => {}
                RecordValue::String(_) => {
                    if !self.ignore_unsupported_value {
                        return Err(anyhow!("Unsupported value: {:?}", (k, v)));
                    }
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush();
        Ok(())
    }
}
