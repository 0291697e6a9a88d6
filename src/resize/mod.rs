pub mod dimensions;
pub mod format;
pub mod io;
pub mod key;
pub mod transform;

pub use self::{
    format::OutputFormat,
    key::{DerivedKey, Dimension, ResizeRequest},
    transform::{ImageTransformer, TransformJob, TransformSummary},
};
