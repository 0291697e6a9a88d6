//! Stage boundaries of a resize request, reported to an injected observer.

use crate::{
    error::ResizeError,
    resize::{Dimension, TransformSummary},
    store::UploadResult,
};
use std::{fmt, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Transform,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Transform => "transform",
            Self::Store => "store",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    pub original_key: String,
    pub derived_key: String,
    pub width: Dimension,
    pub height: Dimension,
}

#[derive(Debug)]
pub enum StageOutcome<'a> {
    Fetched,
    Transformed(&'a TransformSummary),
    Stored(&'a UploadResult),
    Failed(&'a ResizeError),
}

/// Span like hooks, both methods default to doing nothing.
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage, _context: &StageContext) {}

    fn stage_finished(
        &self,
        _stage: Stage,
        _context: &StageContext,
        _outcome: &StageOutcome<'_>,
        _elapsed: Duration,
    ) {
    }
}

/// Writes every stage boundary to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn stage_started(&self, stage: Stage, context: &StageContext) {
        log::debug!(
            "{stage} started: {} -> {}",
            context.original_key,
            context.derived_key
        );
    }

    fn stage_finished(
        &self,
        stage: Stage,
        context: &StageContext,
        outcome: &StageOutcome<'_>,
        elapsed: Duration,
    ) {
        match outcome {
            StageOutcome::Fetched => {
                log::debug!("{stage} opened {} in {elapsed:?}", context.original_key);
            }
            StageOutcome::Transformed(summary) => log::info!(
                "{stage} {}: {}x{} -> {}x{} {}, {} bytes in {elapsed:?}",
                context.original_key,
                summary.source.0,
                summary.source.1,
                summary.output.0,
                summary.output.1,
                summary.format,
                summary.bytes_out
            ),
            StageOutcome::Stored(upload) => log::info!(
                "{stage} {}/{}: {} bytes, {} part(s), etag: {} in {elapsed:?}",
                upload.bucket,
                upload.key,
                upload.size,
                upload.parts,
                upload.etag.as_deref().unwrap_or("-")
            ),
            StageOutcome::Failed(e) => log::warn!(
                "{stage} failed for {} ({}x{}): {e}",
                context.original_key,
                context.width,
                context.height
            ),
        }
    }
}
