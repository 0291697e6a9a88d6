//! One resize request: parse, fetch, transform and store, then redirect.

use crate::{
    config::Settings,
    error::{ResizeError, Result},
    hooks::{LogObserver, Stage, StageContext, StageObserver, StageOutcome},
    resize::{DerivedKey, ImageTransformer, ResizeRequest, TransformSummary, dimensions},
    store::{ObjectStore, UploadResult},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

/// Response in the shape the invocation platform expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ResizeResponse {
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("location".to_string(), location.to_string());
        Self {
            status_code: 301,
            headers,
            body: String::new(),
        }
    }

    #[must_use]
    pub fn error(error: &ResizeError) -> Self {
        Self {
            status_code: error.status_code(),
            headers: BTreeMap::new(),
            body: error.to_string(),
        }
    }

    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self.status_code, 300..=399)
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(String::as_str)
    }
}

/// A completed request.
#[derive(Debug, Clone)]
pub struct Resized {
    pub request: ResizeRequest,
    pub derived_key: DerivedKey,
    pub location: String,
    pub summary: TransformSummary,
    pub upload: UploadResult,
}

pub struct ResizeRequestHandler {
    settings: Settings,
    store: Arc<dyn ObjectStore>,
    transformer: ImageTransformer,
    observers: Vec<Arc<dyn StageObserver>>,
}

impl ResizeRequestHandler {
    /// Handler logging its stages through [`LogObserver`]
    #[must_use]
    pub fn new(settings: Settings, store: Arc<dyn ObjectStore>) -> Self {
        let transformer = ImageTransformer::new(&settings);
        Self {
            settings,
            store,
            transformer,
            observers: vec![Arc::new(LogObserver)],
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the request and turn the outcome into a response, never fails
    pub async fn handle(&self, key: &str) -> ResizeResponse {
        match self.resize(key).await {
            Ok(resized) => ResizeResponse::redirect(&resized.location),
            Err(e) => ResizeResponse::error(&e),
        }
    }

    /// Run the request
    ///
    /// # Errors
    ///
    /// Will return the error of the first stage that failed
    pub async fn resize(&self, key: &str) -> Result<Resized> {
        let request = ResizeRequest::parse(key).inspect_err(|e| {
            log::warn!("rejected key {key:?}: {e}");
        })?;

        let derived_key = request.derived_key();
        let context = StageContext {
            original_key: request.original_key.clone(),
            derived_key: derived_key.to_string(),
            width: request.width,
            height: request.height,
        };

        dimensions::check_requested(request.width, request.height, self.settings.max_dimension)
            .inspect_err(|e| log_failure(None, &context, e))?;

        // fetch
        self.started(Stage::Fetch, &context);
        let (source, elapsed) = timed(
            self.store
                .get_object_stream(&self.settings.bucket, &request.original_key),
        )
        .await;
        let source = match source {
            Ok(source) => {
                self.finished(Stage::Fetch, &context, &StageOutcome::Fetched, elapsed);
                source
            }
            Err(e) => {
                self.finished(Stage::Fetch, &context, &StageOutcome::Failed(&e), elapsed);
                log_failure(Some(Stage::Fetch), &context, &e);
                return Err(e);
            }
        };

        // transform and store, joined once
        self.started(Stage::Transform, &context);
        self.started(Stage::Store, &context);

        let job = self.transformer.spawn(source, request.width, request.height);
        let ((stored, store_elapsed), (transformed, transform_elapsed)) = tokio::join!(
            timed(self.store.put_object_stream(
                &self.settings.bucket,
                derived_key.as_str(),
                self.transformer.format().content_type(),
                job.output,
            )),
            timed(job.handle),
        );

        let transformed = transformed
            .unwrap_or_else(|e| Err(ResizeError::Internal(format!("transform worker: {e}"))));

        match &transformed {
            Ok(summary) => self.finished(
                Stage::Transform,
                &context,
                &StageOutcome::Transformed(summary),
                transform_elapsed,
            ),
            Err(e) => self.finished(
                Stage::Transform,
                &context,
                &StageOutcome::Failed(e),
                transform_elapsed,
            ),
        }

        match &stored {
            Ok(upload) => self.finished(
                Stage::Store,
                &context,
                &StageOutcome::Stored(upload),
                store_elapsed,
            ),
            Err(e) => self.finished(Stage::Store, &context, &StageOutcome::Failed(e), store_elapsed),
        }

        match (transformed, stored) {
            (Ok(summary), Ok(upload)) => {
                let location = self.settings.location(derived_key.as_str());
                log::info!("{key} -> {location}");
                Ok(Resized {
                    request,
                    derived_key,
                    location,
                    summary,
                    upload,
                })
            }
            // the writer gave up first, its error is the cause
            (Err(ResizeError::OutputClosed), Err(e)) | (Ok(_), Err(e)) => {
                log_failure(Some(Stage::Store), &context, &e);
                Err(e)
            }
            (Err(e), _) => {
                log_failure(Some(Stage::Transform), &context, &e);
                Err(e)
            }
        }
    }

    fn started(&self, stage: Stage, context: &StageContext) {
        for observer in &self.observers {
            observer.stage_started(stage, context);
        }
    }

    fn finished(
        &self,
        stage: Stage,
        context: &StageContext,
        outcome: &StageOutcome<'_>,
        elapsed: Duration,
    ) {
        for observer in &self.observers {
            observer.stage_finished(stage, context, outcome, elapsed);
        }
    }
}

fn log_failure(stage: Option<Stage>, context: &StageContext, e: &ResizeError) {
    let stage = stage.map_or_else(|| "validate".to_string(), |s| s.to_string());
    if e.is_client_error() {
        log::warn!(
            "{} ({}x{}) failed at {stage}: {e}",
            context.original_key,
            context.width,
            context.height
        );
    } else {
        log::error!(
            "{} ({}x{}) failed at {stage}: {e}",
            context.original_key,
            context.width,
            context.height
        );
    }
}

async fn timed<F: Future>(future: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let output = future.await;
    (output, start.elapsed())
}
