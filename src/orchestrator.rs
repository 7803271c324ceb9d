//! Upload/translate job lifecycle.
//!
//! `Idle -> Uploading -> Translating -> Completed | Failed`, one job at a time.
//! Each job runs as a single spawned task that owns the in-flight submission
//! and monitor futures. Every callback from that task carries the generation
//! it was started with; once the orchestrator has moved on (cancel, reset, a
//! newer job) the callback no longer matches and is dropped.

use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::ArtifactRef;
use crate::config::Config;
use crate::error::{Result, VidtransError};
use crate::i18n::{LanguageCatalog, LanguageOption};
use crate::job::{
    upload_percent, InputRef, JobFailure, JobSnapshot, Phase, ProgressEvent, TranslationJob,
};
use crate::monitor::{MonitorContext, MonitorFactory, PercentSink, TranslationMonitor};
use crate::submit::{ByteProgress, SubmissionRequest, Submitter, SubmitterFactory};

/// Cancellation signal shared between the orchestrator and one job task.
#[derive(Clone)]
struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    fn cancel(&self) {
        self.tx.send_replace(true);
    }

    async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender gone without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}

struct State {
    job: Option<TranslationJob>,
    /// Bumped for every new job and on cancel
    generation: u64,
    cancel: Option<CancelToken>,
    subscribers: Vec<mpsc::UnboundedSender<ProgressEvent>>,
}

impl State {
    fn phase(&self) -> Phase {
        self.job.as_ref().map(|j| j.phase).unwrap_or(Phase::Idle)
    }

    /// The job, but only if `generation` is still the live one.
    fn live_job(&mut self, generation: u64) -> Option<&mut TranslationJob> {
        if self.generation != generation {
            return None;
        }
        self.job.as_mut()
    }

    fn broadcast(&mut self, event: ProgressEvent) {
        debug!("Job {} {} {}%", event.job_id, event.phase, event.percent);
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// After the terminal event: close every stream and drop the token.
    fn settle(&mut self) {
        self.subscribers.clear();
        self.cancel = None;
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Callbacks of one job task, bound to the generation it was started with.
#[derive(Clone)]
struct JobHandle {
    state: Arc<Mutex<State>>,
    generation: u64,
}

impl JobHandle {
    fn upload_progress(&self, bytes_sent: u64, total_bytes: u64) {
        let percent = upload_percent(bytes_sent, total_bytes);
        let mut state = lock(&self.state);
        let event = match state.live_job(self.generation) {
            Some(job) if job.phase == Phase::Uploading => {
                if percent <= job.progress_percent {
                    return;
                }
                job.progress_percent = percent;
                job.event()
            }
            _ => {
                debug!("Discarding upload progress from a stale job");
                return;
            }
        };
        state.broadcast(event);
    }

    /// Upload acknowledged. Tops the upload up to 100 if the transport never
    /// reported the final chunk, then announces `(Translating, 0)`.
    fn enter_translating(&self) -> Result<()> {
        let mut state = lock(&self.state);
        let phase = state.phase();
        let mut events = Vec::with_capacity(2);
        match state.live_job(self.generation) {
            Some(job) if job.phase == Phase::Uploading => {
                if job.progress_percent < 100 {
                    job.progress_percent = 100;
                    events.push(job.event());
                }
                job.phase = Phase::Translating;
                job.progress_percent = 0;
                events.push(job.event());
                info!("Job {} uploaded, translating", job.id);
            }
            _ => {
                return Err(VidtransError::InvalidState {
                    operation: "start translating",
                    phase,
                });
            }
        }
        for event in events {
            state.broadcast(event);
        }
        Ok(())
    }

    fn translation_progress(&self, percent: u8) {
        let percent = percent.min(100);
        let mut state = lock(&self.state);
        let event = match state.live_job(self.generation) {
            Some(job) if job.phase == Phase::Translating => {
                if percent <= job.progress_percent {
                    return;
                }
                job.progress_percent = percent;
                job.event()
            }
            _ => {
                debug!("Discarding translation progress from a stale job");
                return;
            }
        };
        state.broadcast(event);
    }

    fn complete(&self, artifact: ArtifactRef) {
        let mut state = lock(&self.state);
        let event = match state.live_job(self.generation) {
            Some(job) if job.phase == Phase::Translating => {
                job.phase = Phase::Completed;
                job.progress_percent = 100;
                info!("Job {} completed: {}", job.id, artifact.video_path);
                job.result_ref = Some(artifact);
                job.event()
            }
            _ => {
                debug!("Discarding completion from a stale job");
                return;
            }
        };
        state.broadcast(event);
        state.settle();
    }

    fn fail(&self, error: &VidtransError) {
        let mut state = lock(&self.state);
        let Some(job) = state.live_job(self.generation) else {
            debug!("Discarding failure from a stale job: {}", error);
            return;
        };
        if !job.phase.is_active() {
            return;
        }
        warn!("Job {} failed while {}: {}", job.id, job.phase, error);
        let event = mark_failed(job, JobFailure::from(error));
        state.broadcast(event);
        state.settle();
    }
}

fn mark_failed(job: &mut TranslationJob, failure: JobFailure) -> ProgressEvent {
    job.phase = Phase::Failed;
    job.progress_percent = 0;
    job.failure = Some(failure);
    job.event()
}

/// Owns the current `TranslationJob` and drives it through its phases.
///
/// Presentation code only ever sees snapshots and progress events.
pub struct Orchestrator {
    catalog: Arc<LanguageCatalog>,
    submitter: Arc<dyn Submitter>,
    monitor: Arc<dyn TranslationMonitor>,
    state: Arc<Mutex<State>>,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<LanguageCatalog>,
        submitter: Arc<dyn Submitter>,
        monitor: Arc<dyn TranslationMonitor>,
    ) -> Self {
        Self {
            catalog,
            submitter,
            monitor,
            state: Arc::new(Mutex::new(State {
                job: None,
                generation: 0,
                cancel: None,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Build with the configured HTTP submitter and monitor.
    pub fn from_config(config: &Config, catalog: Arc<LanguageCatalog>) -> Result<Self> {
        let submitter = SubmitterFactory::create_submitter(config.submission.clone())?;
        let monitor = MonitorFactory::create_monitor(config.monitor.clone())?;
        Ok(Self::new(catalog, Arc::from(submitter), Arc::from(monitor)))
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    /// Validate the inputs and start a job in the background.
    ///
    /// Returns as soon as the job is `Uploading`; everything after that is
    /// delivered through `observe_progress`. Must be called from within a
    /// tokio runtime.
    pub fn submit(&self, input: InputRef, source: &str, target: &str) -> Result<Uuid> {
        let phase = self.phase();
        if phase != Phase::Idle {
            return Err(VidtransError::InvalidState {
                operation: "submit",
                phase,
            });
        }

        input.validate()?;
        let source = self.language("source", source)?;
        let target = self.language("target", target)?;

        let job = TranslationJob::new(input.clone(), &source.code, &target.code);
        let job_id = job.id;
        let token = CancelToken::new();

        let generation = {
            let mut state = lock(&self.state);
            let phase = state.phase();
            if phase != Phase::Idle {
                return Err(VidtransError::InvalidState {
                    operation: "submit",
                    phase,
                });
            }
            state.generation += 1;
            let event = job.event();
            state.job = Some(job);
            state.cancel = Some(token.clone());
            state.broadcast(event);
            state.generation
        };

        info!(
            "Job {} started: {} ({} -> {})",
            job_id,
            input.describe(),
            source.code,
            target.code
        );

        let request = SubmissionRequest {
            job_id,
            input,
            source,
            target,
        };
        let handle = JobHandle {
            state: self.state.clone(),
            generation,
        };
        tokio::spawn(run_job(
            handle,
            self.submitter.clone(),
            self.monitor.clone(),
            request,
            token,
        ));

        Ok(job_id)
    }

    fn language(&self, role: &str, code: &str) -> Result<LanguageOption> {
        match self.catalog.require(code) {
            Ok(language) => Ok(language.clone()),
            Err(VidtransError::Validation(_)) => Err(VidtransError::Validation(format!(
                "No {} language selected",
                role
            ))),
            Err(_) => Err(VidtransError::Validation(format!(
                "Unsupported {} language '{}'",
                role, code
            ))),
        }
    }

    /// Stream of `(phase, percent)` changes.
    ///
    /// Joining mid-job yields the current state first. The stream ends after
    /// the terminal event; joining after the job settled yields just that
    /// event. Joining while idle waits for the next job.
    pub fn observe_progress(&self) -> BoxStream<'static, ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = lock(&self.state);
            match state.job.as_ref() {
                Some(job) if job.phase.is_terminal() => {
                    let _ = tx.send(job.event());
                }
                Some(job) => {
                    let _ = tx.send(job.event());
                    state.subscribers.push(tx);
                }
                None => state.subscribers.push(tx),
            }
        }

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed()
    }

    /// Abort the running job. The in-flight request or status check is
    /// dropped and the job ends in `Failed` with a cancellation reason.
    pub fn cancel(&self) -> Result<()> {
        let mut state = lock(&self.state);
        let phase = state.phase();
        if !phase.is_active() {
            return Err(VidtransError::InvalidState {
                operation: "cancel",
                phase,
            });
        }

        state.generation += 1;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        let Some(job) = state.job.as_mut() else {
            return Ok(());
        };
        info!("Job {} cancelled while {}", job.id, phase);
        let event = mark_failed(job, JobFailure::Cancelled);
        state.broadcast(event);
        state.settle();
        Ok(())
    }

    /// Return to `Idle` from a terminal phase. Idle is a no-op; a running job
    /// must be cancelled first.
    pub fn reset(&self) -> Result<()> {
        let mut state = lock(&self.state);
        let phase = state.phase();
        match phase {
            Phase::Idle => Ok(()),
            Phase::Uploading | Phase::Translating => Err(VidtransError::InvalidState {
                operation: "reset",
                phase,
            }),
            Phase::Completed | Phase::Failed => {
                if let Some(job) = state.job.take() {
                    info!("Job {} dismissed", job.id);
                }
                state.cancel = None;
                Ok(())
            }
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        lock(&self.state)
            .job
            .as_ref()
            .map(JobSnapshot::from)
            .unwrap_or_else(JobSnapshot::idle)
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        state.subscribers.clear();
    }
}

async fn run_job(
    handle: JobHandle,
    submitter: Arc<dyn Submitter>,
    monitor: Arc<dyn TranslationMonitor>,
    request: SubmissionRequest,
    token: CancelToken,
) {
    let job_id = request.job_id;
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("Job {} task stopped, in-flight work released", job_id);
        }
        outcome = drive(&handle, submitter.as_ref(), monitor.as_ref(), &request) => {
            match outcome {
                Ok(artifact) => handle.complete(artifact),
                Err(e) => handle.fail(&e),
            }
        }
    }
}

async fn drive(
    handle: &JobHandle,
    submitter: &dyn Submitter,
    monitor: &dyn TranslationMonitor,
    request: &SubmissionRequest,
) -> Result<ArtifactRef> {
    let uploads = handle.clone();
    let progress: ByteProgress =
        Arc::new(move |sent, total| uploads.upload_progress(sent, total));
    let submission = submitter.submit(request, progress).await?;

    handle.enter_translating()?;

    let context = MonitorContext {
        job_id: request.job_id,
        source: request.source.clone(),
        target: request.target.clone(),
        submission,
    };
    let reports = handle.clone();
    let report: PercentSink = Arc::new(move |percent| reports.translation_progress(percent));
    monitor.monitor(&context, report).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submit::MockSubmitter;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    /// Completes immediately with a fixed artifact.
    struct InstantMonitor;

    #[async_trait]
    impl TranslationMonitor for InstantMonitor {
        async fn monitor(&self, _job: &MonitorContext, report: PercentSink) -> Result<ArtifactRef> {
            report(50);
            Ok(ArtifactRef::new("/done.mp4"))
        }
    }

    /// Never finishes.
    struct StalledMonitor;

    #[async_trait]
    impl TranslationMonitor for StalledMonitor {
        async fn monitor(&self, _job: &MonitorContext, _report: PercentSink) -> Result<ArtifactRef> {
            std::future::pending::<()>().await;
            Err(VidtransError::Processing("unreachable".to_string()))
        }
    }

    fn orchestrator(submitter: MockSubmitter, monitor: impl TranslationMonitor + 'static) -> Orchestrator {
        Orchestrator::new(
            Arc::new(LanguageCatalog::default()),
            Arc::new(submitter),
            Arc::new(monitor),
        )
    }

    fn video() -> (NamedTempFile, InputRef) {
        let file = NamedTempFile::new().unwrap();
        let input = InputRef::File(file.path().to_path_buf());
        (file, input)
    }

    async fn collect(orchestrator: &Orchestrator) -> Vec<(Phase, u8)> {
        let events = orchestrator.observe_progress();
        tokio::time::timeout(Duration::from_secs(5), events.collect::<Vec<_>>())
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.phase, e.percent))
            .collect()
    }

    #[tokio::test]
    async fn test_invalid_inputs_never_reach_the_submitter() {
        let mut submitter = MockSubmitter::new();
        submitter.expect_submit().never();
        let orchestrator = orchestrator(submitter, InstantMonitor);
        let (_file, input) = video();

        for (input, source, target) in [
            (input.clone(), "", "mn"),
            (input.clone(), "en", ""),
            (input.clone(), "xx", "mn"),
            (InputRef::File(Default::default()), "en", "mn"),
            (InputRef::Url(String::new()), "en", "mn"),
        ] {
            let err = orchestrator.submit(input, source, target).unwrap_err();
            assert!(matches!(err, VidtransError::Validation(_)), "{err}");
            assert_eq!(orchestrator.phase(), Phase::Idle);
        }
    }

    #[tokio::test]
    async fn test_successful_job_event_order() {
        let mut submitter = MockSubmitter::new();
        submitter.expect_submit().times(1).returning(|_, progress| {
            progress(5, 10);
            progress(10, 10);
            Ok(json!({"status": "ok"}))
        });
        let orchestrator = orchestrator(submitter, InstantMonitor);
        let (_file, input) = video();

        let events = orchestrator.observe_progress();
        orchestrator.submit(input, "en", "mn").unwrap();
        let events: Vec<_> = tokio::time::timeout(Duration::from_secs(5), events.collect::<Vec<_>>())
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.phase, e.percent))
            .collect();

        assert_eq!(
            events,
            vec![
                (Phase::Uploading, 0),
                (Phase::Uploading, 50),
                (Phase::Uploading, 100),
                (Phase::Translating, 0),
                (Phase::Translating, 50),
                (Phase::Completed, 100),
            ]
        );
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.result_ref.unwrap().video_path, "/done.mp4");
    }

    #[tokio::test]
    async fn test_upload_topped_up_when_transport_stops_short() {
        let mut submitter = MockSubmitter::new();
        submitter.expect_submit().returning(|_, progress| {
            progress(0, 0);
            Ok(json!({}))
        });
        let orchestrator = orchestrator(submitter, InstantMonitor);
        let (_file, input) = video();

        let events = orchestrator.observe_progress();
        orchestrator.submit(input, "en", "ja").unwrap();
        let events: Vec<_> = events.map(|e| (e.phase, e.percent)).collect().await;
        assert_eq!(events[..3], [
            (Phase::Uploading, 0),
            (Phase::Uploading, 100),
            (Phase::Translating, 0),
        ]);
    }

    #[tokio::test]
    async fn test_submit_while_busy_is_rejected() {
        let mut submitter = MockSubmitter::new();
        submitter
            .expect_submit()
            .times(1)
            .returning(|_, _| Ok(json!({})));
        let orchestrator = orchestrator(submitter, StalledMonitor);
        let (_file, input) = video();

        orchestrator.submit(input.clone(), "en", "mn").unwrap();
        let err = orchestrator.submit(input, "en", "mn").unwrap_err();
        assert!(matches!(err, VidtransError::InvalidState { operation: "submit", .. }));
        assert!(matches!(
            orchestrator.reset(),
            Err(VidtransError::InvalidState { operation: "reset", .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_settles_failed_and_reset_returns_idle() {
        let mut submitter = MockSubmitter::new();
        submitter
            .expect_submit()
            .returning(|_, _| Ok(json!({})));
        let orchestrator = orchestrator(submitter, StalledMonitor);
        let (_file, input) = video();

        assert_err!(orchestrator.cancel());
        orchestrator.submit(input, "en", "mn").unwrap();
        assert_ok!(orchestrator.cancel());

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, Phase::Failed);
        assert_eq!(snapshot.failure, Some(JobFailure::Cancelled));
        assert_eq!(collect(&orchestrator).await, vec![(Phase::Failed, 0)]);
        assert!(orchestrator.cancel().is_err());

        assert_ok!(orchestrator.reset());
        assert_eq!(orchestrator.snapshot(), JobSnapshot::idle());
        assert_ok!(orchestrator.reset());
    }

    #[tokio::test]
    async fn test_server_error_is_preserved() {
        let mut submitter = MockSubmitter::new();
        submitter.expect_submit().returning(|_, _| {
            Err(VidtransError::Server {
                status: 422,
                detail: Some("unsupported language".to_string()),
            })
        });
        let orchestrator = orchestrator(submitter, InstantMonitor);
        let (_file, input) = video();

        let events = orchestrator.observe_progress();
        orchestrator.submit(input, "en", "mn").unwrap();
        let events: Vec<_> = events.map(|e| (e.phase, e.percent)).collect().await;
        assert_eq!(events, vec![(Phase::Uploading, 0), (Phase::Failed, 0)]);

        let failure = orchestrator.snapshot().failure.unwrap();
        assert_eq!(failure.message(), "unsupported language");
    }
}
