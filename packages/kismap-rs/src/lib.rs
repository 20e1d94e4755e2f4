pub mod aggregate;
pub mod band;
pub mod error;
pub mod export;
pub mod filter;
pub mod map;
pub mod pipeline;
pub mod reader;
pub mod types;

pub use aggregate::{Aggregation, Aggregator};
pub use band::Band;
pub use error::{FilterError, InputError, KismapError, Result};
pub use filter::{DeviceClassifier, FilterConfig, FnClassifier, KismetApClassifier};
pub use map::{LeafletRenderer, MapDocument, MapOptions, MapRenderer};
pub use pipeline::analyze;
pub use reader::CaptureReader;
pub use types::*;
