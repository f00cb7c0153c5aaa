//! Wire types for the health export backend.
//!
//! Every struct tolerates missing fields: a value that was not recorded for a
//! workout decodes to its default rather than failing the whole response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Statistic keys as they appear in `workoutStatistics`.
pub mod metric {
    pub const HEART_RATE: &str = "heartRate";
    pub const ACTIVE_ENERGY_BURNED: &str = "activeEnergyBurned";
    pub const BASAL_ENERGY_BURNED: &str = "basalEnergyBurned";
    pub const STEP_COUNT: &str = "stepCount";
    pub const DISTANCE_WALKING_RUNNING: &str = "distanceWalkingRunning";
    pub const DISTANCE_SWIMMING: &str = "distanceSwimming";
    pub const DISTANCE_CYCLING: &str = "distanceCycling";
    pub const SWIMMING_STROKE_COUNT: &str = "swimmingStrokeCount";
    pub const RUNNING_SPEED: &str = "runningSpeed";
    pub const RUNNING_POWER: &str = "runningPower";
    pub const RUNNING_STRIDE_LENGTH: &str = "runningStrideLength";
    pub const RUNNING_GROUND_CONTACT_TIME: &str = "runningGroundContactTime";
    pub const RUNNING_VERTICAL_OSCILLATION: &str = "runningVerticalOscillation";
}

/// A value the backend sends either as a number or as a string.
///
/// The export encodes "not recorded" as an empty string; `null` and missing
/// keys are treated the same way. Non-empty strings such as `"72.5 degF"` are
/// kept verbatim so the formatter can decide what to do with them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MetricValue {
    Known(f64),
    Text(String),
    #[default]
    Unknown,
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Known(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, MetricValue::Unknown)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Known(v)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            MetricValue::Unknown
        } else {
            MetricValue::Text(s.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64().map_or(MetricValue::Unknown, MetricValue::Known),
            Some(Value::String(s)) => MetricValue::from(s.as_str()),
            Some(Value::Bool(b)) => MetricValue::Text(b.to_string()),
            _ => MetricValue::Unknown,
        })
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Known(v) => serializer.serialize_f64(*v),
            MetricValue::Text(s) => serializer.serialize_str(s),
            MetricValue::Unknown => serializer.serialize_str(""),
        }
    }
}

/// Decode `null` as the type's default. The backend sends `null` for empty
/// lists in a few places.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartData {
    #[serde(deserialize_with = "null_as_default")]
    pub time: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub value: Vec<f64>,
}

/// Summary of one statistic. Which of the aggregates are present depends on
/// the metric: cumulative quantities carry `sum`, discrete ones carry
/// `average`/`minimum`/`maximum`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSummary {
    pub average: MetricValue,
    pub minimum: MetricValue,
    pub maximum: MetricValue,
    pub sum: MetricValue,
    pub unit: String,
    pub chart: Option<ChartData>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutStatistics(pub BTreeMap<String, MetricSummary>);

impl WorkoutStatistics {
    pub fn get(&self, name: &str) -> Option<&MetricSummary> {
        self.0.get(name)
    }

    /// The `sum` of a metric together with its unit.
    pub fn sum(&self, name: &str) -> (MetricValue, String) {
        self.get(name)
            .map(|m| (m.sum.clone(), m.unit.clone()))
            .unwrap_or_default()
    }

    /// The `average` of a metric together with its unit.
    pub fn average(&self, name: &str) -> (MetricValue, String) {
        self.get(name)
            .map(|m| (m.average.clone(), m.unit.clone()))
            .unwrap_or_default()
    }

    /// Chart time labels for a metric, if the backend recorded any.
    pub fn chart_time(&self, name: &str) -> &[String] {
        self.get(name)
            .and_then(|m| m.chart.as_ref())
            .map(|c| c.time.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutMetadata {
    pub workout_location_type: String,
    #[serde(rename = "averageMETs")]
    pub average_mets: MetricValue,
    pub weather_temperature: MetricValue,
    pub weather_humidity: MetricValue,
    pub time_zone: String,
    pub maximum_speed: MetricValue,
    pub average_speed: MetricValue,
    pub physical_effort_estimation_type: MetricValue,
    pub elevation_ascended: MetricValue,
    pub elevation_descended: MetricValue,
    pub swimming_location_type: MetricValue,
    pub swimming_stroke_style: MetricValue,
    pub lap_length: MetricValue,
    pub swolf_score: MetricValue,
    pub water_salinity: MetricValue,
}

/// GPS samples for a workout. All series share the `time` axis; empty
/// vectors mean no route was recorded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutRoute {
    #[serde(deserialize_with = "null_as_default")]
    pub latitude: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub longitude: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub elevation: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub speed: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub course: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub h_acc: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub v_acc: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub time: Vec<String>,
}

impl WorkoutRoute {
    pub fn is_recorded(&self) -> bool {
        !self.latitude.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSeries {
    pub chart: Option<ChartData>,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutVitals {
    pub heart_rate: VitalSeries,
}

/// One recorded workout as returned by `/api/workout`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutStats {
    pub workout_name: String,
    pub workout_duration: MetricValue,
    pub workout_duration_unit: String,
    pub workout_total_distance: MetricValue,
    pub workout_total_distance_unit: String,
    pub workout_total_energy_burned: MetricValue,
    pub workout_total_energy_burned_unit: String,
    pub workout_creation_date: String,
    pub workout_device_name: String,
    pub workout_start_date: String,
    pub workout_end_date: String,
    pub workout_statistics: WorkoutStatistics,
    pub workout_metadata: WorkoutMetadata,
    pub workout_route: WorkoutRoute,
    pub workout_vitals: WorkoutVitals,
}

/// Broad workout families. Each stores its distance under a different
/// statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkoutKind {
    Running,
    Walking,
    Cycling,
    Swimming,
    Other(String),
}

impl WorkoutKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Running" => WorkoutKind::Running,
            "Walking" => WorkoutKind::Walking,
            "Cycling" => WorkoutKind::Cycling,
            "Swimming" => WorkoutKind::Swimming,
            other => WorkoutKind::Other(other.to_string()),
        }
    }
}

impl WorkoutStats {
    pub fn kind(&self) -> WorkoutKind {
        WorkoutKind::from_name(&self.workout_name)
    }

    /// Distance value and unit appropriate for this workout's type.
    pub fn distance(&self) -> (MetricValue, String) {
        match self.kind() {
            WorkoutKind::Swimming => self.workout_statistics.sum(metric::DISTANCE_SWIMMING),
            WorkoutKind::Cycling => self.workout_statistics.sum(metric::DISTANCE_CYCLING),
            _ => (
                self.workout_total_distance.clone(),
                self.workout_total_distance_unit.clone(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestError {
    pub error_code: i64,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadContext {
    pub status_code: u16,
    pub processing_time: f64,
    pub upload_start_time: f64,
    pub upload_end_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<RequestError>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadResponse {
    pub upload_context: UploadContext,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportStatusContext {
    pub status_code: u16,
    pub export_present: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<RequestError>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportStatusResponse {
    pub export_status_context: ExportStatusContext,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutDetailsContext {
    pub status_code: u16,
    pub total_workouts: usize,
    #[serde(deserialize_with = "null_as_default")]
    pub workout_dates: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<RequestError>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutDetailsResponse {
    pub workout_details_context: WorkoutDetailsContext,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutContext {
    pub status_code: u16,
    pub requested_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub workouts: Vec<WorkoutStats>,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<RequestError>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutResponse {
    pub workout_context: WorkoutContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutsByDateRequest {
    pub workout_start_date: String,
}
