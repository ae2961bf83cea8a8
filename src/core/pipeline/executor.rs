//! Pipeline execution implementation.

use crate::core::aggregator::{aggregate, AnalysisResult, WeightedScore};
use crate::core::config::AnalyzerConfig;
use crate::core::features::{
    default_scorers, FeatureKind, FeatureScorer, SynthIdStub, WatermarkDetector, WeightedScorer,
};
use crate::core::loader::{AnalyzeRequest, DecodedDocument, DocumentLoader};
use crate::error::{AnalysisError, ScannerError};
use crate::events::{
    null_sender, AnalysisEvent, AnalysisStage, AnalysisSummary, Event, EventSender,
};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Cooperative cancellation flag shared between a caller and a running analysis
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`AnalysisError::Cancelled`] once cancelled
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// A guard that cancels this token when it goes out of scope.
    ///
    /// Held by async callers whose future may be dropped while the analysis
    /// still runs on another thread.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: self.clone(),
        }
    }
}

/// Cancels its token on drop
#[derive(Debug)]
pub struct CancelOnDrop {
    token: CancellationToken,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Builder for an [`Analyzer`]
pub struct AnalyzerBuilder {
    config: AnalyzerConfig,
    scorers: Vec<WeightedScorer>,
    watermark: Option<Box<dyn WatermarkDetector>>,
}

impl AnalyzerBuilder {
    /// Create a new analyzer builder
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            scorers: Vec::new(),
            watermark: None,
        }
    }

    /// Use `config` for loading, tuning and thresholds
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a scorer. Once any scorer is registered the standard
    /// four are no longer added.
    pub fn scorer(mut self, scorer: Box<dyn FeatureScorer>, weight: f64) -> Self {
        self.scorers.push(WeightedScorer::new(scorer, weight));
        self
    }

    /// Set the watermark detector
    pub fn watermark_detector(mut self, detector: Box<dyn WatermarkDetector>) -> Self {
        self.watermark = Some(detector);
        self
    }

    /// Validate the configuration and build the analyzer
    pub fn build(self) -> Result<Analyzer, ScannerError> {
        self.config.validate()?;

        let scorers = if self.scorers.is_empty() {
            default_scorers(&self.config)
        } else {
            self.scorers
        };
        validate_scorers(&scorers)?;

        Ok(Analyzer {
            loader: DocumentLoader::new(self.config.pdf),
            scorers,
            watermark: self.watermark.unwrap_or_else(|| Box::new(SynthIdStub)),
            config: self.config,
        })
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_scorers(scorers: &[WeightedScorer]) -> Result<(), ScannerError> {
    if scorers.is_empty() {
        return Err(ScannerError::Config("at least one scorer is required".to_string()));
    }

    let mut seen = BTreeSet::new();
    for entry in scorers {
        let kind = entry.scorer.kind();
        if !seen.insert(kind) {
            return Err(ScannerError::Config(format!("scorer {kind} registered twice")));
        }
        if !(entry.weight.is_finite() && entry.weight >= 0.0) {
            return Err(ScannerError::Config(format!(
                "weight for {kind} must be a non-negative number"
            )));
        }
    }

    let total: f64 = scorers.iter().map(|s| s.weight).sum();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ScannerError::Config(format!(
            "scorer weights must sum to 1.0 (got {total:.4})"
        )));
    }
    Ok(())
}

/// Runs uploads through loading, feature scoring and aggregation
///
/// Holds no per-request state, so one instance can serve concurrent
/// requests.
pub struct Analyzer {
    config: AnalyzerConfig,
    loader: DocumentLoader,
    scorers: Vec<WeightedScorer>,
    watermark: Box<dyn WatermarkDetector>,
}

impl Analyzer {
    /// Create a new analyzer builder
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Kinds of the registered scorers, in blend order
    pub fn feature_kinds(&self) -> Vec<FeatureKind> {
        self.scorers.iter().map(|s| s.scorer.kind()).collect()
    }

    /// Whether the watermark detector actually runs
    pub fn watermark_available(&self) -> bool {
        self.watermark.is_available()
    }

    /// Analyze one upload without events
    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ScannerError> {
        self.analyze_with_events(request, &null_sender(), &CancellationToken::new())
    }

    /// Analyze one upload with event reporting and cancellation
    pub fn analyze_with_events(
        &self,
        request: &AnalyzeRequest,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, ScannerError> {
        let start_time = Instant::now();

        events.send(Event::Analysis(AnalysisEvent::Started {
            filename: request.filename.clone(),
            bytes: request.bytes.len(),
        }));

        let outcome = self.run(request, events, cancel);

        match &outcome {
            Ok(result) => {
                let duration_ms = start_time.elapsed().as_millis() as u64;
                tracing::info!(
                    filename = %request.filename,
                    score = result.score,
                    label = %result.label,
                    confidence = result.confidence,
                    duration_ms,
                    "analysis complete"
                );
                events.send(Event::Analysis(AnalysisEvent::Completed {
                    summary: AnalysisSummary {
                        filename: request.filename.clone(),
                        score: result.score,
                        label: result.label,
                        confidence: result.confidence,
                        duration_ms,
                    },
                }));
            }
            Err(ScannerError::Analysis(AnalysisError::Cancelled)) => {
                tracing::info!(filename = %request.filename, "analysis cancelled");
                events.send(Event::Analysis(AnalysisEvent::Cancelled {
                    filename: request.filename.clone(),
                }));
            }
            Err(e) => {
                if e.is_client_error() {
                    tracing::warn!(filename = %request.filename, error = %e, "rejected upload");
                } else {
                    tracing::error!(filename = %request.filename, error = %e, "analysis failed");
                }
                events.send(Event::Analysis(AnalysisEvent::Failed {
                    filename: request.filename.clone(),
                    message: e.to_string(),
                }));
            }
        }

        outcome
    }

    fn run(
        &self,
        request: &AnalyzeRequest,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, ScannerError> {
        request.ensure_within(self.config.max_upload_bytes)?;
        cancel.check()?;

        // Stage 1: Decoding
        events.send(Event::Analysis(AnalysisEvent::StageChanged {
            stage: AnalysisStage::Decoding,
        }));
        let document = self.loader.load(request)?;

        self.score_document(&document, events, cancel)
    }

    /// Score an already-decoded document
    pub fn analyze_document(
        &self,
        document: &DecodedDocument,
    ) -> Result<AnalysisResult, ScannerError> {
        self.score_document(document, &null_sender(), &CancellationToken::new())
    }

    fn score_document(
        &self,
        document: &DecodedDocument,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, ScannerError> {
        cancel.check()?;

        // Stage 2: Feature extraction
        events.send(Event::Analysis(AnalysisEvent::StageChanged {
            stage: AnalysisStage::Extracting,
        }));

        // Collect in registration order so the blend is summed the same way
        // on every run regardless of which scorer finishes first
        let scores: Vec<WeightedScore> = self
            .scorers
            .par_iter()
            .map(|entry| {
                cancel.check()?;
                let kind = entry.scorer.kind();
                let score = entry.scorer.score(document)?;
                tracing::debug!(feature = %kind, score = score.value(), "feature scored");
                events.send(Event::Analysis(AnalysisEvent::FeatureScored {
                    kind,
                    score: score.value(),
                }));
                Ok(WeightedScore {
                    kind,
                    weight: entry.weight,
                    score,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        cancel.check()?;

        // Stage 3: Aggregation
        events.send(Event::Analysis(AnalysisEvent::StageChanged {
            stage: AnalysisStage::Aggregating,
        }));

        let verdict = aggregate(&scores, &self.config.thresholds);
        let synthid = self.watermark.detect(document);

        Ok(AnalysisResult::new(&verdict, &scores, document, synthid))
    }
}
