pub mod aggregate;
pub mod dates;
pub mod derive;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod mapping;
pub mod newcases;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod util;

pub use error::{Error, Result};
pub use pipeline::{load_mappings, run_pipeline, Granularity, PipelineOptions, PipelineOutput};
pub use types::*;
