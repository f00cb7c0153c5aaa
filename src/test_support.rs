//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::client::{ClientError, WorkoutApi};
use crate::model::{
    ExportStatusContext, UploadContext, WorkoutContext, WorkoutDetailsContext, WorkoutStats,
};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn workout(name: &str) -> WorkoutStats {
    WorkoutStats {
        workout_name: name.into(),
        ..Default::default()
    }
}

/// In-memory backend. Dates without a registered response fail with a 500.
pub struct FakeApi {
    pub export_present: bool,
    dates: Vec<String>,
    responses: Mutex<HashMap<NaiveDate, Vec<WorkoutStats>>>,
    gates: Mutex<HashMap<NaiveDate, Receiver<()>>>,
    upload: Mutex<Option<Result<UploadContext, ClientError>>>,
    details_calls: AtomicUsize,
    details_fail: AtomicBool,
}

impl FakeApi {
    pub fn with_dates(dates: &[&str]) -> Self {
        Self {
            export_present: true,
            dates: dates.iter().map(|d| d.to_string()).collect(),
            responses: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            upload: Mutex::new(None),
            details_calls: AtomicUsize::new(0),
            details_fail: AtomicBool::new(false),
        }
    }

    pub fn respond(&self, date: NaiveDate, workouts: Vec<WorkoutStats>) {
        self.responses.lock().unwrap().insert(date, workouts);
    }

    /// Hold the next request for `date` until the returned sender fires.
    pub fn hold(&self, date: NaiveDate) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(date, rx);
        tx
    }

    pub fn upload_with(&self, result: Result<UploadContext, ClientError>) {
        *self.upload.lock().unwrap() = Some(result);
    }

    /// Make the reference date endpoint answer with a 500.
    pub fn fail_details(&self, fail: bool) {
        self.details_fail.store(fail, Ordering::SeqCst);
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }
}

impl WorkoutApi for FakeApi {
    fn export_status(&self) -> Result<ExportStatusContext, ClientError> {
        Ok(ExportStatusContext {
            status_code: 200,
            export_present: self.export_present,
            errors: Vec::new(),
        })
    }

    fn workout_details(&self) -> Result<WorkoutDetailsContext, ClientError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if self.details_fail.load(Ordering::SeqCst) {
            return Err(ClientError::Status(500, "workout details unavailable".into()));
        }
        Ok(WorkoutDetailsContext {
            status_code: 200,
            total_workouts: self.dates.len(),
            workout_dates: self.dates.clone(),
            errors: Vec::new(),
        })
    }

    fn workouts_by_date(&self, date: NaiveDate) -> Result<WorkoutContext, ClientError> {
        let gate = self.gates.lock().unwrap().remove(&date);
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let workouts = self.responses.lock().unwrap().get(&date).cloned();
        match workouts {
            Some(workouts) => Ok(WorkoutContext {
                status_code: 200,
                requested_date: date.to_string(),
                workouts,
                errors: Vec::new(),
            }),
            None => Err(ClientError::Status(500, format!("no workouts for {date}"))),
        }
    }

    fn upload_export(&self, _path: &Path) -> Result<UploadContext, ClientError> {
        self.upload.lock().unwrap().take().unwrap_or(Ok(UploadContext {
            status_code: 200,
            ..Default::default()
        }))
    }
}
