//! Sequencing of backend requests.
//!
//! Requests run on worker threads and report back over a channel. Results
//! are applied only from [`FetchOrchestrator::poll`], on the thread that owns
//! the orchestrator, so selection state keeps a single writer. Workout
//! requests carry a [`RequestToken`]; a response whose token is no longer the
//! latest one is dropped.

use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::client::{ClientError, WorkoutApi};
use crate::model::{ExportStatusContext, WorkoutContext, WorkoutDetailsContext, WorkoutStats};

/// Callback used to wake the UI when a response arrives.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// Identifies the selection a workouts request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    generation: u64,
    date: NaiveDate,
}

impl RequestToken {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Debug)]
enum FetchMessage {
    ExportStatus(Result<ExportStatusContext, ClientError>),
    WorkoutDetails(Result<WorkoutDetailsContext, ClientError>),
    Workouts {
        token: RequestToken,
        result: Result<WorkoutContext, ClientError>,
    },
}

/// Outcome of applying one response.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    ExportStatus(bool),
    ReferenceDates(WorkoutDetailsContext),
    WorkoutsLoaded {
        date: NaiveDate,
        workouts: Vec<WorkoutStats>,
    },
    WorkoutsFailed {
        date: NaiveDate,
        message: String,
    },
    /// A response arrived for a selection that has since been replaced.
    Discarded(NaiveDate),
    StartupFailed(String),
}

pub struct FetchOrchestrator {
    api: Arc<dyn WorkoutApi>,
    tx: Sender<FetchMessage>,
    rx: Receiver<FetchMessage>,
    waker: Option<Waker>,
    status: FetchStatus,
    generation: u64,
    latest: Option<RequestToken>,
    export_present: Option<bool>,
    details_requested: bool,
    in_flight: usize,
}

impl FetchOrchestrator {
    pub fn new(api: Arc<dyn WorkoutApi>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            tx,
            rx,
            waker: None,
            status: FetchStatus::Idle,
            generation: 0,
            latest: None,
            export_present: None,
            details_requested: false,
            in_flight: 0,
        }
    }

    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn export_present(&self) -> Option<bool> {
        self.export_present
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn WorkoutApi) -> FetchMessage + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let msg = job(api.as_ref());
            if tx.send(msg).is_ok() {
                if let Some(wake) = waker {
                    wake();
                }
            }
        });
    }

    /// Ask whether an export is loaded. The reference dates follow once the
    /// backend confirms one is present.
    pub fn start(&mut self) {
        self.spawn(|api| FetchMessage::ExportStatus(api.export_status()));
    }

    /// Forget that the reference dates were loaded and check again, e.g.
    /// after a new export was uploaded. Workouts requests still in flight
    /// become stale.
    pub fn restart(&mut self) {
        self.details_requested = false;
        self.export_present = None;
        self.generation += 1;
        self.latest = None;
        if self.status == FetchStatus::Loading {
            self.status = FetchStatus::Idle;
        }
        self.start();
    }

    /// Request the workouts of `date`. Any earlier request becomes stale.
    pub fn request_workouts(&mut self, date: NaiveDate) -> RequestToken {
        self.generation += 1;
        let token = RequestToken {
            generation: self.generation,
            date,
        };
        self.latest = Some(token);
        self.status = FetchStatus::Loading;
        self.spawn(move |api| FetchMessage::Workouts {
            token,
            result: api.workouts_by_date(date),
        });
        token
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest == Some(token)
    }

    /// Leave the error state without issuing a request.
    pub fn dismiss_error(&mut self) {
        if matches!(self.status, FetchStatus::Error(_)) {
            self.status = FetchStatus::Idle;
        }
    }

    /// Apply every response that has arrived so far.
    pub fn poll(&mut self) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            events.extend(self.apply(msg));
        }
        events
    }

    /// Block until at least one response is applied or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<FetchEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while events.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => events.extend(self.apply(msg)),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        events.extend(self.poll());
        events
    }

    fn apply(&mut self, msg: FetchMessage) -> Option<FetchEvent> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match msg {
            FetchMessage::ExportStatus(Ok(ctx)) => {
                log::info!("Export present: {}", ctx.export_present);
                self.export_present = Some(ctx.export_present);
                if ctx.export_present && !self.details_requested {
                    self.details_requested = true;
                    self.spawn(|api| FetchMessage::WorkoutDetails(api.workout_details()));
                }
                Some(FetchEvent::ExportStatus(ctx.export_present))
            }
            FetchMessage::ExportStatus(Err(e)) => {
                log::error!("Failed to fetch export status: {e}");
                Some(FetchEvent::StartupFailed(e.to_string()))
            }
            FetchMessage::WorkoutDetails(Ok(ctx)) => Some(FetchEvent::ReferenceDates(ctx)),
            FetchMessage::WorkoutDetails(Err(e)) => {
                log::error!("Failed to fetch workout dates: {e}");
                self.details_requested = false;
                Some(FetchEvent::StartupFailed(e.to_string()))
            }
            FetchMessage::Workouts { token, result } => {
                if !self.is_current(token) {
                    log::debug!("Discarding stale workouts for {}", token.date);
                    return Some(FetchEvent::Discarded(token.date));
                }
                match result {
                    Ok(ctx) => {
                        log::info!("Loaded {} workouts for {}", ctx.workouts.len(), token.date);
                        self.status = FetchStatus::Ready;
                        Some(FetchEvent::WorkoutsLoaded {
                            date: token.date,
                            workouts: ctx.workouts,
                        })
                    }
                    Err(e) => {
                        log::error!("Failed to fetch workouts for {}: {e}", token.date);
                        let message = e.to_string();
                        self.status = FetchStatus::Error(message.clone());
                        Some(FetchEvent::WorkoutsFailed {
                            date: token.date,
                            message,
                        })
                    }
                }
            }
        }
    }
}
