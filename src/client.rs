use chrono::NaiveDate;
use reqwest::blocking::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::model::{
    ExportStatusContext, ExportStatusResponse, UploadContext, UploadResponse,
    WorkoutContext, WorkoutDetailsContext, WorkoutDetailsResponse, WorkoutResponse,
    WorkoutsByDateRequest,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Archive extensions the backend knows how to unpack.
pub const SUPPORTED_ARCHIVES: [&str; 3] = ["zip", "7z", "gz"];

const UPLOAD_PATH: &str = "/api/upload";
const DATA_STATUS_PATH: &str = "/api/data-status";
const EXPORT_STATUS_PATH: &str = "/api/export-status";
const WORKOUT_DETAILS_PATH: &str = "/api/workout-details";
const WORKOUT_PATH: &str = "/api/workout";

#[derive(Debug)]
pub enum ClientError {
    /// The backend rejected the upload as not being a health export.
    InvalidExport(Vec<String>),
    /// The file was not sent because its extension is not an archive type.
    UnsupportedArchive(String),
    Status(u16, String),
    Transport(Box<dyn std::error::Error + Send + Sync>),
    Decode(std::io::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidExport(msgs) if msgs.is_empty() => {
                write!(f, "This is not an Apple Health Export!")
            }
            ClientError::InvalidExport(msgs) => write!(f, "Invalid export: {}", msgs.join("; ")),
            ClientError::UnsupportedArchive(name) => {
                write!(f, "Unsupported archive {name}: expected .zip, .7z or .gz")
            }
            ClientError::Status(code, body) => write!(f, "HTTP {code}: {body}"),
            ClientError::Transport(e) => write!(f, "{e}"),
            ClientError::Decode(e) => write!(f, "Malformed response: {e}"),
            ClientError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(&**e),
            ClientError::Decode(e) | ClientError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Calls the pipeline makes against the export backend.
pub trait WorkoutApi: Send + Sync {
    fn export_status(&self) -> Result<ExportStatusContext, ClientError>;
    fn workout_details(&self) -> Result<WorkoutDetailsContext, ClientError>;
    fn workouts_by_date(&self, date: NaiveDate) -> Result<WorkoutContext, ClientError>;
    fn upload_export(&self, path: &Path) -> Result<UploadContext, ClientError>;
}

pub fn is_supported_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_ARCHIVES.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

fn read_json<T: DeserializeOwned>(response: Result<ureq::Response, ureq::Error>) -> Result<T, ClientError> {
    match response {
        Ok(r) => r.into_json::<T>().map_err(ClientError::Decode),
        Err(ureq::Error::Status(code, r)) => {
            let body = r.into_string().unwrap_or_default();
            Err(ClientError::Status(code, body))
        }
        Err(e) => Err(ClientError::Transport(Box::new(e))),
    }
}

/// Blocking HTTP client for the export backend.
pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        read_json(
            self.agent
                .get(&self.url(path))
                .set("Accept", "application/json")
                .call(),
        )
    }
}

impl WorkoutApi for ApiClient {
    fn export_status(&self) -> Result<ExportStatusContext, ClientError> {
        log::info!("Checking export status at {}", self.base_url);
        let resp: ExportStatusResponse = match self.get_json(DATA_STATUS_PATH) {
            Err(ClientError::Status(404, _)) => self.get_json(EXPORT_STATUS_PATH)?,
            other => other?,
        };
        Ok(resp.export_status_context)
    }

    fn workout_details(&self) -> Result<WorkoutDetailsContext, ClientError> {
        let resp: WorkoutDetailsResponse = self.get_json(WORKOUT_DETAILS_PATH)?;
        Ok(resp.workout_details_context)
    }

    fn workouts_by_date(&self, date: NaiveDate) -> Result<WorkoutContext, ClientError> {
        log::info!("Fetching workouts for {date}");
        let body = WorkoutsByDateRequest {
            workout_start_date: date.format("%Y-%m-%d").to_string(),
        };
        let resp: WorkoutResponse = read_json(
            self.agent
                .post(&self.url(WORKOUT_PATH))
                .set("Accept", "application/json")
                .send_json(&body),
        )?;
        Ok(resp.workout_context)
    }

    fn upload_export(&self, path: &Path) -> Result<UploadContext, ClientError> {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if !is_supported_archive(path) {
            return Err(ClientError::UnsupportedArchive(file_name));
        }
        let file = File::open(path).map_err(ClientError::Io)?;
        let len = file.metadata().map_err(ClientError::Io)?.len();
        log::info!("Uploading {file_name} ({len} bytes)");

        // The archive is streamed from disk; exports can be several GB.
        let part = Part::reader_with_length(file, len)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(transport)?;
        let form = Form::new().part("file", part);

        // Processing happens inside the request, so no read timeout here.
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(transport)?;
        let response = client
            .post(self.url(UPLOAD_PATH))
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let messages = response
                .json::<UploadResponse>()
                .map(|u| {
                    u.upload_context
                        .errors
                        .into_iter()
                        .map(|e| e.error_message)
                        .collect()
                })
                .unwrap_or_default();
            return Err(ClientError::InvalidExport(messages));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Status(status.as_u16(), body));
        }
        let resp: UploadResponse = response
            .json()
            .map_err(|e| ClientError::Decode(std::io::Error::other(e)))?;
        Ok(resp.upload_context)
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(Box::new(e))
}
