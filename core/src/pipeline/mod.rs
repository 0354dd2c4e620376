// crm_core/src/pipeline/mod.rs

//! Named-step record pipelines.
//!
//! A [`RecordPipeline<T>`] runs an ordered list of steps against one record
//! draft `T` inside a caller-supplied unit of work. Steps may carry a
//! `skip_if` condition; the first failing step ends the record.

pub mod definition;
pub mod execution;
pub mod step;

pub use definition::RecordPipeline;
pub use step::{RecordStep, SkipCondition, StepDef};
