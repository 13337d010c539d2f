//! Types and traits for recording training metrics.
//!
//! * [`Record`] - A container of key-value pairs of various data types
//! * [`RecordValue`] - The values that can be stored in a [`Record`]
//! * [`Recorder`] - A destination of records, e.g., TensorBoard
//! * [`BufferedRecorder`] - Keeps records in memory
//! * [`NullRecorder`] - Discards all records
//!
//! The [`Trainer`](crate::Trainer) writes one record per episode. A recorder
//! that fails to write does not stop training: the error is logged and the
//! record is dropped.
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
