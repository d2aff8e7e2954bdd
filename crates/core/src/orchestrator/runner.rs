//! Orchestrator implementation.

use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info};

use crate::config::Config;
use crate::detect::{DetectError, DetectedAsset, Detector};
use crate::exec::ToolRunner;
use crate::guard::{self, GuardError, JobGuard};
use crate::pipeline::{ConversionPipeline, RunProgress};
use crate::progress::{ErrorReport, ErrorSink, ProgressPublisher};

use super::types::{OrchestratorError, StartOutcome};

/// Owns the process-wide transcoding state: the run gate, the catalog cache,
/// and the sinks the transport layer fans out from.
pub struct TranscodeOrchestrator {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    guard: JobGuard,
    publisher: Arc<ProgressPublisher>,
    errors: Arc<ErrorSink>,
    catalog: RwLock<Option<Arc<Vec<DetectedAsset>>>>,
    scan_lock: Mutex<()>,
}

impl TranscodeOrchestrator {
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            config,
            runner,
            guard: JobGuard::new(),
            publisher: Arc::new(ProgressPublisher::new()),
            errors: Arc::new(ErrorSink::new()),
            catalog: RwLock::new(None),
            scan_lock: Mutex::new(()),
        }
    }

    /// The catalog of detected assets. Unforced calls reuse the cached
    /// catalog when one exists; `force` re-scans, except during an active
    /// run, when file state is in flux and the request is refused as busy.
    pub async fn detect(&self, force: bool) -> Result<Arc<Vec<DetectedAsset>>, DetectError> {
        if force && self.guard.is_active() {
            return Err(DetectError::Busy);
        }
        if !force {
            if let Some(catalog) = self.catalog.read().await.clone() {
                return Ok(catalog);
            }
        }

        // One scan at a time; a request that waited here reuses the fresh
        // catalog instead of starting a second concurrent scan.
        let _scan = self.scan_lock.lock().await;
        if !force {
            if let Some(catalog) = self.catalog.read().await.clone() {
                return Ok(catalog);
            }
        }

        let detector = Detector::new(Arc::clone(&self.runner), self.config.clone());
        let assets = detector
            .scan_with_progress(|p| {
                debug!(scanned = p.scanned, total = p.total, "detection progress");
            })
            .await?;
        let assets = Arc::new(assets);
        *self.catalog.write().await = Some(Arc::clone(&assets));
        Ok(assets)
    }

    /// Starts a conversion run in the background.
    ///
    /// Guard checks happen synchronously: a second run is refused as busy,
    /// and a non-empty destination (without clear-first configuration) is
    /// refused before any external tool is invoked. The run itself executes
    /// in a spawned task; the gate is released when it ends, on every path.
    pub async fn start_transcode(&self) -> Result<StartOutcome, OrchestratorError> {
        let Some(permit) = self.guard.try_acquire() else {
            info!("transcode requested while a run is active");
            return Ok(StartOutcome::Busy);
        };

        let ready = guard::ensure_destination_ready(
            &self.config.paths.dest_root,
            self.config.pipeline.clear_destination,
        )
        .await;
        match ready {
            Ok(()) => {}
            Err(GuardError::DestinationNotEmpty { path }) => {
                info!(path = %path.display(), "destination not empty, refusing to start");
                return Ok(StartOutcome::DestinationNotEmpty);
            }
            Err(e) => return Err(e.into()),
        }

        let assets = self.detect(false).await?;
        self.errors.reset();

        let pipeline = ConversionPipeline::new(
            self.config.clone(),
            Arc::clone(&self.runner),
            Arc::clone(&self.publisher),
            Arc::clone(&self.errors),
        );
        let errors = Arc::clone(&self.errors);
        tokio::spawn(async move {
            // The permit lives for the whole run; dropping it on any exit
            // path reopens the gate.
            let _permit = permit;
            if let Err(e) = pipeline.run(&assets).await {
                errors.critical(ErrorReport::new(
                    "Critical Error!",
                    "The conversion run ended early",
                    e.to_string(),
                ));
            }
        });

        Ok(StartOutcome::Accepted)
    }

    /// Whether a run currently holds the gate.
    pub fn is_converting(&self) -> bool {
        self.guard.is_active()
    }

    /// Progress subscription; the first read yields the latest snapshot.
    pub fn subscribe_progress(&self) -> watch::Receiver<Option<RunProgress>> {
        self.publisher.subscribe()
    }

    /// The latest progress snapshot, for replay to late joiners.
    pub fn latest_progress(&self) -> Option<RunProgress> {
        self.publisher.latest()
    }

    /// The error sink, for subscriptions and late-joiner replay.
    pub fn errors(&self) -> Arc<ErrorSink> {
        Arc::clone(&self.errors)
    }
}
