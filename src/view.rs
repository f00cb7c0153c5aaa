// View model for the currently displayed workout
use serde::Serialize;

use crate::charts::{ChartMetric, chart_availability, default_chart};
use crate::formatting::{
    MISSING, format_date, format_date_range, format_distance, format_duration, format_energy,
    format_heart_rate, format_humidity, format_temperature, format_value, with_unit,
};
use crate::model::{MetricValue, WorkoutStats, metric};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    pub unit: String,
}

impl MetricCard {
    fn new(label: &str, value: String, unit: &str) -> Self {
        // Units only accompany real values.
        let unit = if value == MISSING { "" } else { unit };
        Self {
            label: label.to_string(),
            value,
            unit: unit.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailItem {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailSection {
    pub title: String,
    pub items: Vec<DetailItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub title: String,
    pub time_range: String,
    pub energy_burned: String,
}

/// Everything the renderer needs for one workout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutView {
    pub header: Header,
    pub summary: Vec<MetricCard>,
    pub overview: Vec<DetailSection>,
    /// Only categories with at least one recorded value.
    pub performance: Vec<DetailSection>,
    pub vitals: DetailSection,
    #[serde(skip)]
    pub charts: Vec<(ChartMetric, bool)>,
    #[serde(skip)]
    pub default_chart: Option<ChartMetric>,
}

impl WorkoutView {
    /// Chart tabs to draw, in display order. Unavailable charts get no tab.
    pub fn chart_tabs(&self) -> Vec<ChartMetric> {
        self.charts
            .iter()
            .filter_map(|(metric, available)| available.then_some(*metric))
            .collect()
    }
}

fn item(label: &str, value: String) -> DetailItem {
    DetailItem {
        label: label.to_string(),
        value,
    }
}

fn section(title: &str, items: Vec<DetailItem>) -> DetailSection {
    DetailSection {
        title: title.to_string(),
        items,
    }
}

fn duration(workout: &WorkoutStats) -> String {
    workout
        .workout_duration
        .as_f64()
        .map(format_duration)
        .unwrap_or_else(|| MISSING.to_string())
}

fn header(workout: &WorkoutStats) -> Header {
    let meta = &workout.workout_metadata;
    let title = format!("{} {}", meta.workout_location_type, workout.workout_name)
        .trim()
        .to_string();
    Header {
        title,
        time_range: format_date_range(
            &workout.workout_start_date,
            &workout.workout_end_date,
            &meta.time_zone,
        ),
        energy_burned: format_energy(&workout.workout_total_energy_burned),
    }
}

fn summary(workout: &WorkoutStats) -> Vec<MetricCard> {
    let (distance, distance_unit) = workout.distance();
    let (avg_hr, _) = workout.workout_statistics.average(metric::HEART_RATE);
    vec![
        MetricCard::new("Workout Duration", duration(workout), ""),
        MetricCard::new("Distance", format_distance(&distance), &distance_unit),
        MetricCard::new(
            "Avg METs",
            format_value(&workout.workout_metadata.average_mets),
            "",
        ),
        MetricCard::new("Average Heart Rate", format_heart_rate(&avg_hr, "BPM"), ""),
    ]
}

fn overview(workout: &WorkoutStats) -> Vec<DetailSection> {
    let meta = &workout.workout_metadata;
    let tz = meta.time_zone.as_str();
    let creation = if workout.workout_creation_date.is_empty() {
        &workout.workout_end_date
    } else {
        &workout.workout_creation_date
    };
    vec![
        section(
            "General Workout Information",
            vec![
                item("Workout Name", workout.workout_name.clone()),
                item("Location", meta.workout_location_type.clone()),
                item("Start Date", format_date(&workout.workout_start_date, tz)),
                item("End Date", format_date(&workout.workout_end_date, tz)),
                item("Duration", duration(workout)),
                item(
                    "Distance",
                    with_unit(
                        format_distance(&workout.workout_total_distance),
                        &workout.workout_total_distance_unit,
                    ),
                ),
                item("Creation Date", format_date(creation, tz)),
                item("Time Zone", meta.time_zone.clone()),
            ],
        ),
        section(
            "Environmental Conditions",
            vec![
                item("Temperature", format_temperature(&meta.weather_temperature)),
                item("Humidity", format_humidity(&meta.weather_humidity)),
                item("Water Salinity", format_value(&meta.water_salinity)),
            ],
        ),
        section(
            "Device Information",
            vec![
                item("Device", workout.workout_device_name.clone()),
                item(
                    "Route Recorded",
                    if workout.workout_route.is_recorded() { "Yes" } else { "No" }.to_string(),
                ),
            ],
        ),
    ]
}

/// Build a performance category, dropping values that were not recorded.
fn category(title: &str, entries: Vec<(&str, MetricValue, String)>) -> Option<DetailSection> {
    let items: Vec<DetailItem> = entries
        .into_iter()
        .filter(|(_, value, _)| !value.is_unknown())
        .map(|(label, value, unit)| item(label, with_unit(format_value(&value), &unit)))
        .collect();
    (!items.is_empty()).then(|| section(title, items))
}

fn performance(workout: &WorkoutStats) -> Vec<DetailSection> {
    let stats = &workout.workout_statistics;
    let meta = &workout.workout_metadata;
    let sum = |name: &str| stats.sum(name);
    let avg = |name: &str| stats.average(name);
    let with = |(v, u): (MetricValue, String), label: &'static str| (label, v, u);
    let plain = |v: &MetricValue, label: &'static str, unit: &str| (label, v.clone(), unit.to_string());

    let calories = vec![
        with(sum(metric::ACTIVE_ENERGY_BURNED), "Active Energy Burned"),
        with(sum(metric::BASAL_ENERGY_BURNED), "Basal Energy Burned"),
    ];
    let mobility = vec![
        plain(&meta.maximum_speed, "Maximum Speed", "m/s"),
        plain(&meta.average_speed, "Average Speed", "m/s"),
        plain(&meta.elevation_ascended, "Elevation Ascended", ""),
        plain(&meta.elevation_descended, "Elevation Descended", ""),
        with(sum(metric::DISTANCE_WALKING_RUNNING), "Distance Walking Running"),
        with(sum(metric::STEP_COUNT), "Step Count"),
    ];
    let swimming = vec![
        plain(&meta.swimming_location_type, "Swimming Location Type", ""),
        plain(&meta.swimming_stroke_style, "Swimming Stroke Style", ""),
        plain(&meta.lap_length, "Swimming Lap Length", ""),
        plain(&meta.swolf_score, "Swimming SWOLF Score", ""),
        plain(&meta.water_salinity, "Water Salinity", ""),
        with(sum(metric::SWIMMING_STROKE_COUNT), "Swimming Stroke Count"),
        with(sum(metric::DISTANCE_SWIMMING), "Distance Swimming"),
    ];
    let running = vec![
        with(avg(metric::RUNNING_GROUND_CONTACT_TIME), "Average Running Ground Contact Time"),
        with(avg(metric::RUNNING_POWER), "Average Running Power"),
        with(avg(metric::RUNNING_VERTICAL_OSCILLATION), "Average Running Vertical Oscillation"),
        with(avg(metric::RUNNING_SPEED), "Average Running Speed"),
        with(avg(metric::RUNNING_STRIDE_LENGTH), "Average Running Stride Length"),
    ];

    [
        category("Calories", calories),
        category("Mobility", mobility),
        category("Swimming", swimming),
        category("Running", running),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn vitals(workout: &WorkoutStats) -> DetailSection {
    let hr = workout
        .workout_statistics
        .get(metric::HEART_RATE)
        .cloned()
        .unwrap_or_default();
    section(
        "Vitals",
        vec![
            item("Avg Heart Rate", format_heart_rate(&hr.average, "BPM")),
            item("Min Heart Rate", format_heart_rate(&hr.minimum, "BPM")),
            item("Max Heart Rate", format_heart_rate(&hr.maximum, "BPM")),
            item(
                "Average METs",
                format_value(&workout.workout_metadata.average_mets),
            ),
        ],
    )
}

pub fn build_view(workout: &WorkoutStats) -> WorkoutView {
    WorkoutView {
        header: header(workout),
        summary: summary(workout),
        overview: overview(workout),
        performance: performance(workout),
        vitals: vitals(workout),
        charts: chart_availability(Some(workout)),
        default_chart: default_chart(Some(workout)),
    }
}
