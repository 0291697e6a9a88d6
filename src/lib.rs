//! On-demand image resizing between S3 objects.
//!
//! A request key `<width>x<height>/<original key>` is parsed, the original is
//! streamed from the bucket, resized, streamed back under the same key
//! and the caller is redirected to the public URL of the new object.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod resize;
pub mod s3;
pub mod store;

pub use self::{
    config::Settings,
    error::ResizeError,
    handler::{ResizeRequestHandler, ResizeResponse, Resized},
};
