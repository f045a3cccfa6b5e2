//! Run Ensemble use case
//!
//! Orchestrates one ensemble run and narrates it as [`EnsembleEvent`]s:
//!
//! 1. **Fan-out**: every configuration runs as its own task, streaming
//!    fragments as `chunk` events, or short-circuits to a pre-supplied text
//! 2. **Agreement**: once every branch has settled, usable texts are scored
//!    pairwise
//! 3. **Consensus**: the summarizer streams a synthesis of all usable texts
//!
//! Branch, agreement and summarizer failures are reported as events and
//! never stop the run; only a closed event stream (client gone) or
//! cancellation ends it without a `complete` event.

use crate::config::EnsembleParams;
use crate::ports::event_sink::{EventSink, SinkClosed};
use crate::ports::provider::{ProviderAdapter, ProviderError, StreamHandle};
use crate::ports::provider_factory::ProviderFactory;
use crate::ports::result_store::{NoResultStore, ResultStore};
use crate::use_cases::score_agreement::AgreementScorer;
use ensemble_domain::{
    AgreementScore, BranchState, BranchTexts, ConsensusPrompt, DomainError, EnsembleEvent,
    EnsembleRequest, EnsembleRun, ModelConfiguration, NO_VALID_RESPONSES, RunResult, StreamEvent,
    is_usable_text,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that end an ensemble run without a `complete` event
#[derive(Error, Debug)]
pub enum RunEnsembleError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    #[error("Run cancelled")]
    Cancelled,
}

impl From<SinkClosed> for RunEnsembleError {
    fn from(_: SinkClosed) -> Self {
        RunEnsembleError::Cancelled
    }
}

/// Why draining a generation stream stopped before exhaustion.
enum StreamFailure {
    Provider(ProviderError),
    Closed(SinkClosed),
}

/// What fan-out settled on.
struct FanIn {
    /// Final text per id, failed branches holding their error placeholder
    texts: BranchTexts,
    /// `(id, text)` pairs fit for agreement and consensus, in `texts` order
    usable: Vec<(String, String)>,
}

/// A configuration prepared for fan-out.
struct Branch {
    config: ModelConfiguration,
    adapter: Result<Arc<dyn ProviderAdapter>, ProviderError>,
    manual: Option<String>,
}

/// Everything one branch task owns.
struct BranchTask {
    config: ModelConfiguration,
    adapter: Result<Arc<dyn ProviderAdapter>, ProviderError>,
    manual: Option<String>,
    prompt: String,
    timeout: Option<Duration>,
}

/// Use case for running an ensemble
pub struct RunEnsembleUseCase {
    factory: Arc<dyn ProviderFactory>,
    params: EnsembleParams,
    store: Arc<dyn ResultStore>,
}

impl RunEnsembleUseCase {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            params: EnsembleParams::default(),
            store: Arc::new(NoResultStore),
        }
    }

    pub fn with_params(mut self, params: EnsembleParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_result_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = store;
        self
    }

    pub fn params(&self) -> &EnsembleParams {
        &self.params
    }

    /// Validate a raw request against the configured limits.
    ///
    /// Must succeed before any event stream is opened.
    pub fn prepare(&self, request: EnsembleRequest) -> Result<EnsembleRun, RunEnsembleError> {
        Ok(request.validate(self.params.limits)?)
    }

    /// Execute a validated run, writing every event to `sink`.
    ///
    /// Cancelling `cancel` (or dropping the sink's receiver) abandons all
    /// in-flight work and returns [`RunEnsembleError::Cancelled`].
    pub async fn execute(
        &self,
        run: EnsembleRun,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<RunResult, RunEnsembleError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Ensemble run cancelled");
                Err(RunEnsembleError::Cancelled)
            }
            result = self.run_phases(&run, &sink) => result,
        }
    }

    async fn run_phases(
        &self,
        run: &EnsembleRun,
        sink: &EventSink,
    ) -> Result<RunResult, RunEnsembleError> {
        info!(
            branches = run.configurations.len(),
            manual = run.existing_responses.len(),
            summarizer = %run.summarizer.config_id,
            "Starting ensemble run"
        );

        let branches = self.build_branches(run);

        // Phase 1: Fan-out
        let fan_in = self.phase_fanout(run, &branches, sink).await?;

        // Phase 2: Agreement
        let candidates: Vec<Arc<dyn ProviderAdapter>> = branches
            .iter()
            .filter_map(|b| b.adapter.as_ref().ok().cloned())
            .collect();
        let scores = self.phase_agreement(&fan_in.usable, &candidates, sink).await?;

        // Phase 3: Consensus
        let consensus = self.phase_consensus(run, &fan_in.usable, sink).await?;

        let result = RunResult {
            consensus_response: consensus,
            agreement_scores: scores,
            individual_responses: fan_in.texts,
            configurations: run.configurations.clone(),
        };

        sink.emit(EnsembleEvent::Complete(result.clone())).await?;
        self.store.store(&result);

        info!("Ensemble run complete");
        Ok(result)
    }

    fn build_branches(&self, run: &EnsembleRun) -> Vec<Branch> {
        run.configurations
            .iter()
            .map(|config| {
                let api_key = run.credentials.get(&config.id).unwrap_or_default();
                let adapter = self.factory.create(config.provider, api_key);
                if let Err(e) = &adapter {
                    warn!(config_id = %config.id, provider = %config.provider, "Could not create adapter: {}", e);
                }
                Branch {
                    config: config.clone(),
                    adapter,
                    manual: run.manual_response(&config.id).map(str::to_string),
                }
            })
            .collect()
    }

    /// Phase 1: run every branch concurrently and join on all of them
    async fn phase_fanout(
        &self,
        run: &EnsembleRun,
        branches: &[Branch],
        sink: &EventSink,
    ) -> Result<FanIn, RunEnsembleError> {
        info!("Phase 1: Fan-out");
        sink.emit(EnsembleEvent::status(format!(
            "Querying {} models",
            branches.len()
        )))
        .await?;

        let mut join_set = JoinSet::new();

        for (index, branch) in branches.iter().enumerate() {
            let task = BranchTask {
                config: branch.config.clone(),
                adapter: branch.adapter.clone(),
                manual: branch.manual.clone(),
                prompt: run.prompt.content().to_string(),
                timeout: self.params.branch_timeout,
            };
            let sink = sink.clone();

            join_set.spawn(async move { (index, task.run(&sink).await) });
        }

        let mut states: Vec<Option<BranchState>> = vec![None; branches.len()];

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, Ok(state))) => states[index] = Some(state),
                Ok((_, Err(SinkClosed))) => return Err(RunEnsembleError::Cancelled),
                Err(e) => warn!("Branch task join error: {}", e),
            }
        }

        let mut texts = BranchTexts::new();
        let mut usable = Vec::new();

        for (branch, state) in branches.iter().zip(states) {
            let state = match state {
                Some(state) => state,
                None => {
                    let message = "Branch task terminated unexpectedly";
                    let mut state = BranchState::new();
                    state.fail(message);
                    sink.emit(EnsembleEvent::ConfigError {
                        config_id: branch.config.id.clone(),
                        name: branch.config.display_name.clone(),
                        error: message.to_string(),
                    })
                    .await?;
                    state
                }
            };
            if state.is_usable() {
                usable.push((branch.config.id.clone(), state.text().to_string()));
            }
            texts.insert(branch.config.id.clone(), state.into_text());
        }

        for (id, text) in run.manual_only_entries() {
            debug!(id, "Including manual-only response");
            if is_usable_text(text) {
                usable.push((id.to_string(), text.to_string()));
            }
            texts.insert(id, text);
        }

        Ok(FanIn { texts, usable })
    }

    /// Phase 2: score agreement between every pair of usable texts
    async fn phase_agreement(
        &self,
        usable: &[(String, String)],
        candidates: &[Arc<dyn ProviderAdapter>],
        sink: &EventSink,
    ) -> Result<Vec<AgreementScore>, RunEnsembleError> {
        info!("Phase 2: Agreement");
        sink.emit(EnsembleEvent::status("Calculating agreement"))
            .await?;
        sink.emit(EnsembleEvent::AgreementStart).await?;

        let embedder = AgreementScorer::select_embedder(candidates);
        let outcome = AgreementScorer::score(usable, embedder.as_deref()).await;

        if let Some(error) = outcome.error_message() {
            warn!("Agreement unavailable: {}", error);
            sink.emit(EnsembleEvent::AgreementError { error }).await?;
        }

        let scores = outcome.scores().to_vec();
        sink.emit(EnsembleEvent::Agreement {
            scores: scores.clone(),
        })
        .await?;

        Ok(scores)
    }

    /// Phase 3: stream the summarizer's synthesis of every usable text
    async fn phase_consensus(
        &self,
        run: &EnsembleRun,
        usable: &[(String, String)],
        sink: &EventSink,
    ) -> Result<String, RunEnsembleError> {
        info!("Phase 3: Consensus");
        sink.emit(EnsembleEvent::status("Generating consensus"))
            .await?;
        sink.emit(EnsembleEvent::ConsensusStart).await?;

        let responses: Vec<&str> = usable.iter().map(|(_, text)| text.as_str()).collect();

        let Some(prompt) = ConsensusPrompt::build(run.prompt.content(), &responses) else {
            warn!("No usable responses, skipping summarizer");
            sink.emit(EnsembleEvent::ConsensusChunk {
                content: NO_VALID_RESPONSES.to_string(),
            })
            .await?;
            return Ok(NO_VALID_RESPONSES.to_string());
        };

        let summarizer = &run.summarizer;
        let api_key = run
            .credentials
            .get(&summarizer.config_id)
            .unwrap_or_default();

        debug!(
            provider = %summarizer.provider,
            model = %summarizer.model,
            responses = responses.len(),
            "Calling summarizer"
        );

        let mut consensus = String::new();
        let outcome = match self.factory.create(summarizer.provider, api_key) {
            Ok(adapter) => {
                let generation = generate_consensus(
                    adapter.as_ref(),
                    &summarizer.model,
                    &prompt,
                    &mut consensus,
                    sink,
                );
                with_timeout(self.params.summarizer_timeout, generation).await
            }
            Err(e) => Err(StreamFailure::Provider(e)),
        };

        match outcome {
            Ok(()) if !consensus.trim().is_empty() => Ok(consensus),
            Ok(()) => Ok(consensus_failed(sink, "Summarizer returned an empty response").await?),
            Err(StreamFailure::Provider(e)) => Ok(consensus_failed(sink, &e.to_string()).await?),
            Err(StreamFailure::Closed(closed)) => Err(closed.into()),
        }
    }
}

impl BranchTask {
    /// Drive one branch to a terminal phase, emitting its events in order.
    async fn run(self, sink: &EventSink) -> Result<BranchState, SinkClosed> {
        let BranchTask {
            config,
            adapter,
            manual,
            prompt,
            timeout,
        } = self;

        let mut state = BranchState::new();

        sink.emit(EnsembleEvent::ConfigStart {
            config_id: config.id.clone(),
            name: config.display_name.clone(),
        })
        .await?;

        if let Some(text) = manual {
            debug!(config_id = %config.id, "Using pre-supplied response");
            state.manual(text.clone());
            sink.emit(EnsembleEvent::ConfigComplete {
                config_id: config.id,
                name: config.display_name,
                response: text,
            })
            .await?;
            return Ok(state);
        }

        state.start_generating();
        info!(
            config_id = %config.id,
            provider = %config.provider,
            model = %config.model_name,
            "Branch generating"
        );

        let outcome = match &adapter {
            Ok(adapter) => {
                let generation =
                    generate_branch(adapter.as_ref(), &config, &prompt, &mut state, sink);
                with_timeout(timeout, generation).await
            }
            Err(e) => Err(StreamFailure::Provider(e.clone())),
        };

        match outcome {
            Ok(()) => {
                state.complete();
                info!(config_id = %config.id, bytes = state.text().len(), "Branch complete");
                sink.emit(EnsembleEvent::ConfigComplete {
                    config_id: config.id,
                    name: config.display_name,
                    response: state.text().to_string(),
                })
                .await?;
            }
            Err(StreamFailure::Provider(e)) => {
                warn!(config_id = %config.id, provider = %config.provider, "Branch failed: {}", e);
                let message = e.to_string();
                state.fail(message.clone());
                sink.emit(EnsembleEvent::ConfigError {
                    config_id: config.id,
                    name: config.display_name,
                    error: message,
                })
                .await?;
            }
            Err(StreamFailure::Closed(closed)) => return Err(closed),
        }

        Ok(state)
    }
}

async fn generate_branch(
    adapter: &dyn ProviderAdapter,
    config: &ModelConfiguration,
    prompt: &str,
    state: &mut BranchState,
    sink: &EventSink,
) -> Result<(), StreamFailure> {
    let mut handle = adapter
        .generate_stream(prompt, &config.model_name)
        .await
        .map_err(StreamFailure::Provider)?;

    drain(&mut handle, sink, |fragment| {
        state.append(fragment);
        EnsembleEvent::Chunk {
            config_id: config.id.clone(),
            content: fragment.to_string(),
            name: config.display_name.clone(),
        }
    })
    .await
}

async fn generate_consensus(
    adapter: &dyn ProviderAdapter,
    model: &str,
    prompt: &str,
    consensus: &mut String,
    sink: &EventSink,
) -> Result<(), StreamFailure> {
    let mut handle = adapter
        .generate_stream(prompt, model)
        .await
        .map_err(StreamFailure::Provider)?;

    drain(&mut handle, sink, |fragment| {
        consensus.push_str(fragment);
        EnsembleEvent::ConsensusChunk {
            content: fragment.to_string(),
        }
    })
    .await
}

/// Forward every fragment of `handle` to `sink` until the stream ends.
///
/// A stream that only reports `Completed` (no deltas) is forwarded as one
/// fragment. Dropping out early drops the handle, which releases the
/// adapter's connection.
async fn drain<F>(
    handle: &mut StreamHandle,
    sink: &EventSink,
    mut on_fragment: F,
) -> Result<(), StreamFailure>
where
    F: FnMut(&str) -> EnsembleEvent,
{
    let mut received = false;

    while let Some(event) = handle.next().await {
        match event {
            StreamEvent::Delta(fragment) => {
                if fragment.is_empty() {
                    continue;
                }
                received = true;
                sink.emit(on_fragment(&fragment))
                    .await
                    .map_err(StreamFailure::Closed)?;
            }
            StreamEvent::Completed(full) => {
                if !received && !full.is_empty() {
                    sink.emit(on_fragment(&full))
                        .await
                        .map_err(StreamFailure::Closed)?;
                }
                return Ok(());
            }
            StreamEvent::Error(message) => {
                return Err(StreamFailure::Provider(ProviderError::Stream(message)));
            }
        }
    }

    Ok(())
}

async fn with_timeout<T, F>(limit: Option<Duration>, work: F) -> Result<T, StreamFailure>
where
    F: Future<Output = Result<T, StreamFailure>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(StreamFailure::Provider(ProviderError::Timeout(
                limit.as_secs(),
            ))),
        },
        None => work.await,
    }
}

async fn consensus_failed(sink: &EventSink, error: &str) -> Result<String, SinkClosed> {
    warn!("Consensus generation failed: {}", error);
    sink.emit(EnsembleEvent::ConsensusError {
        error: error.to_string(),
    })
    .await?;
    Ok(format!("Failed to generate consensus: {error}"))
}
