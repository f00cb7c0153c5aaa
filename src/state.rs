//! Application state shared by the pipeline components.
//!
//! `AppState` is the only writer of the selected date, the workout list and
//! the current index. Readers either borrow it or subscribe to
//! [`StateEvent`]s.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::client::WorkoutApi;
use crate::dates::{DateController, DateError, DateSelection};
use crate::model::WorkoutStats;
use crate::navigator::WorkoutNavigator;
use crate::orchestrator::{FetchEvent, FetchOrchestrator, FetchStatus, Waker};
use crate::upload::{UploadOutcome, UploadTask};

#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    ExportStatus(bool),
    DatesLoaded(usize),
    DateSelected(NaiveDate),
    WorkoutsReplaced { date: NaiveDate, count: usize },
    WorkoutChanged(Option<usize>),
    FetchFailed(String),
    UploadStarted(PathBuf),
    UploadFinished(UploadOutcome),
}

pub struct AppState {
    api: Arc<dyn WorkoutApi>,
    waker: Option<Waker>,
    dates: DateController,
    navigator: WorkoutNavigator,
    fetcher: FetchOrchestrator,
    upload: Option<UploadTask>,
    last_error: Option<String>,
    startup_error: Option<String>,
    subscribers: Vec<Sender<StateEvent>>,
}

impl AppState {
    pub fn new(api: Arc<dyn WorkoutApi>) -> Self {
        Self {
            fetcher: FetchOrchestrator::new(Arc::clone(&api)),
            api,
            waker: None,
            dates: DateController::new(),
            navigator: WorkoutNavigator::new(),
            upload: None,
            last_error: None,
            startup_error: None,
            subscribers: Vec::new(),
        }
    }

    pub fn set_waker(&mut self, waker: Waker) {
        self.fetcher.set_waker(Arc::clone(&waker));
        self.waker = Some(waker);
    }

    pub fn subscribe(&mut self) -> Receiver<StateEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: StateEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Kick off the export-status check and the reference date load.
    pub fn start(&mut self) {
        self.fetcher.start();
    }

    /// Select a date from the picker. Rejected dates leave everything as is;
    /// a new date starts a fetch. Re-picking the current date only retries
    /// when its previous fetch failed.
    pub fn select_date(&mut self, day: NaiveDate) -> Result<DateSelection, DateError> {
        let selection = self.dates.select(day)?;
        match selection {
            DateSelection::Changed(date) => {
                self.publish(StateEvent::DateSelected(date));
                self.fetcher.request_workouts(date);
            }
            DateSelection::Unchanged => {
                if matches!(self.fetcher.status(), FetchStatus::Error(_)) {
                    log::info!("Retrying workouts for {day}");
                    self.fetcher.request_workouts(day);
                }
            }
        }
        Ok(selection)
    }

    pub fn select_next(&mut self) {
        self.navigator.select_next();
        self.publish(StateEvent::WorkoutChanged(self.navigator.current_index()));
    }

    pub fn select_previous(&mut self) {
        self.navigator.select_previous();
        self.publish(StateEvent::WorkoutChanged(self.navigator.current_index()));
    }

    /// Start uploading an export unless one is already running.
    pub fn start_upload(&mut self, file: PathBuf) -> bool {
        if self.upload.is_some() {
            log::warn!("Upload already in progress, ignoring {}", file.display());
            return false;
        }
        self.publish(StateEvent::UploadStarted(file.clone()));
        self.upload = Some(UploadTask::spawn(
            Arc::clone(&self.api),
            file,
            self.waker.clone(),
        ));
        true
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_some()
    }

    /// Check the export and reload the reference dates again after the
    /// startup requests failed.
    pub fn retry_startup(&mut self) {
        self.last_error = None;
        self.startup_error = None;
        self.fetcher.dismiss_error();
        self.fetcher.restart();
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
        self.fetcher.dismiss_error();
    }

    /// Apply finished requests and uploads. Returns the events that were
    /// also published to subscribers.
    pub fn poll(&mut self) -> Vec<StateEvent> {
        let mut events = Vec::new();
        for fetched in self.fetcher.poll() {
            events.extend(self.apply_fetch(fetched));
        }
        if let Some(outcome) = self.upload.as_ref().and_then(UploadTask::try_outcome) {
            self.upload = None;
            if outcome.is_success() {
                self.dates.clear();
                self.navigator.clear();
                self.fetcher.restart();
            }
            events.push(StateEvent::UploadFinished(outcome));
        }
        for event in &events {
            self.publish(event.clone());
        }
        events
    }

    /// Block until a fetch response arrives (or `timeout` passes) and apply
    /// it.
    pub fn wait(&mut self, timeout: std::time::Duration) -> Vec<StateEvent> {
        let mut events = Vec::new();
        for fetched in self.fetcher.wait(timeout) {
            events.extend(self.apply_fetch(fetched));
        }
        for event in &events {
            self.publish(event.clone());
        }
        events
    }

    fn apply_fetch(&mut self, fetched: FetchEvent) -> Option<StateEvent> {
        match fetched {
            FetchEvent::ExportStatus(present) => Some(StateEvent::ExportStatus(present)),
            FetchEvent::ReferenceDates(ctx) => {
                self.dates.set_reference_dates(&ctx);
                self.startup_error = None;
                Some(StateEvent::DatesLoaded(self.dates.dates().len()))
            }
            FetchEvent::WorkoutsLoaded { date, workouts } => {
                if self.dates.selected() != Some(date) {
                    return None;
                }
                let count = workouts.len();
                self.navigator.replace(workouts);
                self.last_error = None;
                Some(StateEvent::WorkoutsReplaced { date, count })
            }
            FetchEvent::WorkoutsFailed { message, .. } => {
                self.last_error = Some(message.clone());
                Some(StateEvent::FetchFailed(message))
            }
            FetchEvent::StartupFailed(message) => {
                self.last_error = Some(message.clone());
                self.startup_error = Some(message.clone());
                Some(StateEvent::FetchFailed(message))
            }
            FetchEvent::Discarded(_) => None,
        }
    }

    pub fn dates(&self) -> &DateController {
        &self.dates
    }

    pub fn navigator(&self) -> &WorkoutNavigator {
        &self.navigator
    }

    pub fn current_workout(&self) -> Option<&WorkoutStats> {
        self.navigator.current()
    }

    pub fn fetch_status(&self) -> &FetchStatus {
        self.fetcher.status()
    }

    pub fn export_present(&self) -> Option<bool> {
        self.fetcher.export_present()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Set while the export check or the reference date load has failed and
    /// not been retried.
    pub fn startup_error(&self) -> Option<&str> {
        self.startup_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, date, workout};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn wait_until(state: &mut AppState, pred: impl Fn(&StateEvent) -> bool) {
        loop {
            let events = state.wait(WAIT);
            assert!(!events.is_empty(), "timed out waiting for state event");
            if events.iter().any(&pred) {
                return;
            }
        }
    }

    #[test]
    fn picking_dates_end_to_end() {
        let api = Arc::new(FakeApi::with_dates(&["2024-01-01", "2024-01-03"]));
        api.respond(date("2024-01-03"), vec![workout("Running"), workout("Cycling")]);
        let mut state = AppState::new(api);
        let events = state.subscribe();

        state.start();
        wait_until(&mut state, |e| matches!(e, StateEvent::DatesLoaded(2)));

        assert_eq!(
            state.select_date(date("2024-01-02")),
            Err(DateError::NotSelectable(date("2024-01-02")))
        );
        assert_eq!(state.fetch_status(), &FetchStatus::Idle);

        state.select_date(date("2024-01-03")).unwrap();
        assert_eq!(state.fetch_status(), &FetchStatus::Loading);
        wait_until(&mut state, |e| matches!(e, StateEvent::WorkoutsReplaced { .. }));
        assert_eq!(state.fetch_status(), &FetchStatus::Ready);
        assert_eq!(state.navigator().current_index(), Some(0));
        assert_eq!(state.current_workout().unwrap().workout_name, "Running");

        let seen: Vec<StateEvent> = events.try_iter().collect();
        assert!(seen.contains(&StateEvent::DateSelected(date("2024-01-03"))));
        assert!(seen.contains(&StateEvent::WorkoutsReplaced {
            date: date("2024-01-03"),
            count: 2
        }));
    }

    #[test]
    fn stale_response_never_replaces_list() {
        let api = Arc::new(FakeApi::with_dates(&["2024-01-01", "2024-01-03"]));
        api.respond(date("2024-01-01"), vec![workout("Swimming")]);
        api.respond(date("2024-01-03"), vec![workout("Running")]);
        let mut state = AppState::new(api.clone());
        state.start();
        wait_until(&mut state, |e| matches!(e, StateEvent::DatesLoaded(_)));

        let release_a = api.hold(date("2024-01-01"));
        let release_b = api.hold(date("2024-01-03"));
        state.select_date(date("2024-01-01")).unwrap();
        state.select_date(date("2024-01-03")).unwrap();

        release_b.send(()).unwrap();
        wait_until(&mut state, |e| matches!(e, StateEvent::WorkoutsReplaced { .. }));
        release_a.send(()).unwrap();
        // The stale response produces no state event; wait on the fetcher directly.
        let events = state.wait(WAIT);
        assert!(events.is_empty());

        let names: Vec<_> = state
            .navigator()
            .workouts()
            .iter()
            .map(|w| w.workout_name.as_str())
            .collect();
        assert_eq!(names, ["Running"]);
        assert_eq!(state.dates().selected(), Some(date("2024-01-03")));
    }

    #[test]
    fn failed_fetch_keeps_previous_workouts() {
        let api = Arc::new(FakeApi::with_dates(&["2024-01-01", "2024-01-03"]));
        api.respond(date("2024-01-03"), vec![workout("Running"), workout("Walking")]);
        let mut state = AppState::new(api.clone());
        state.start();
        wait_until(&mut state, |e| matches!(e, StateEvent::DatesLoaded(_)));

        state.select_date(date("2024-01-03")).unwrap();
        wait_until(&mut state, |e| matches!(e, StateEvent::WorkoutsReplaced { .. }));
        state.select_next();
        assert_eq!(state.navigator().current_index(), Some(1));

        state.select_date(date("2024-01-01")).unwrap();
        wait_until(&mut state, |e| matches!(e, StateEvent::FetchFailed(_)));
        assert!(matches!(state.fetch_status(), FetchStatus::Error(_)));
        assert!(state.last_error().is_some());
        assert_eq!(state.navigator().len(), 2);
        assert_eq!(state.current_workout().unwrap().workout_name, "Walking");

        // Re-picking the failed date retries.
        api.respond(date("2024-01-01"), vec![workout("Swimming")]);
        assert_eq!(state.select_date(date("2024-01-01")), Ok(DateSelection::Unchanged));
        assert_eq!(state.fetch_status(), &FetchStatus::Loading);
        wait_until(&mut state, |e| matches!(e, StateEvent::WorkoutsReplaced { .. }));
        assert_eq!(state.current_workout().unwrap().workout_name, "Swimming");
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn reselecting_loaded_date_does_not_refetch() {
        let api = Arc::new(FakeApi::with_dates(&["2024-01-03"]));
        api.respond(date("2024-01-03"), vec![workout("Running")]);
        let mut state = AppState::new(api);
        state.start();
        wait_until(&mut state, |e| matches!(e, StateEvent::DatesLoaded(_)));
        state.select_date(date("2024-01-03")).unwrap();
        wait_until(&mut state, |e| matches!(e, StateEvent::WorkoutsReplaced { .. }));

        assert_eq!(state.select_date(date("2024-01-03")), Ok(DateSelection::Unchanged));
        assert_eq!(state.fetch_status(), &FetchStatus::Ready);
    }

    #[test]
    fn failed_date_load_is_reported_and_retried() {
        let api = Arc::new(FakeApi::with_dates(&["2024-01-01", "2024-01-03"]));
        api.fail_details(true);
        let mut state = AppState::new(api.clone());
        state.start();
        wait_until(&mut state, |e| matches!(e, StateEvent::FetchFailed(_)));
        assert_eq!(state.export_present(), Some(true));

        let err = state.startup_error().unwrap();
        assert!(err.contains("500"), "{err}");
        assert_eq!(state.last_error(), Some(err));
        assert!(state.dates().dates().is_empty());
        assert_eq!(state.fetch_status(), &FetchStatus::Idle);

        api.fail_details(false);
        state.retry_startup();
        assert_eq!(state.startup_error(), None);
        wait_until(&mut state, |e| matches!(e, StateEvent::DatesLoaded(2)));
        assert_eq!(state.startup_error(), None);
        assert_eq!(state.last_error(), None);
        assert_eq!(api.details_calls(), 2);
    }

    #[test]
    fn successful_upload_reloads_reference_dates() {
        let api = Arc::new(FakeApi::with_dates(&["2024-01-03"]));
        let mut state = AppState::new(api.clone());
        assert!(state.start_upload(PathBuf::from("export.zip")));
        assert!(state.is_uploading());
        assert!(!state.start_upload(PathBuf::from("other.zip")));

        let mut finished = None;
        for _ in 0..500 {
            if let Some(StateEvent::UploadFinished(outcome)) = state
                .poll()
                .into_iter()
                .find(|e| matches!(e, StateEvent::UploadFinished(_)))
            {
                finished = Some(outcome);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(finished.unwrap().is_success());
        assert!(!state.is_uploading());

        wait_until(&mut state, |e| matches!(e, StateEvent::DatesLoaded(1)));
        assert_eq!(api.details_calls(), 1);
    }
}
