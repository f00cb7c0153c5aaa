use egui_plot::{Line, PlotPoints};
use serde::{Deserialize, Serialize};

use crate::formatting::parse_timestamp;
use crate::model::{WorkoutStats, metric};

/// Time-series charts a workout may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartMetric {
    HeartRate,
    Elevation,
    Speed,
    RunningSpeed,
    RunningPower,
    StrideLength,
    GroundContactTime,
    VerticalOscillation,
}

/// Display order of the chart tabs. The first available entry is the
/// default tab.
pub const ALL_CHART_METRICS: [ChartMetric; 8] = [
    ChartMetric::HeartRate,
    ChartMetric::Elevation,
    ChartMetric::Speed,
    ChartMetric::RunningSpeed,
    ChartMetric::RunningPower,
    ChartMetric::StrideLength,
    ChartMetric::GroundContactTime,
    ChartMetric::VerticalOscillation,
];

impl ChartMetric {
    pub fn key(self) -> &'static str {
        match self {
            ChartMetric::HeartRate => "heartRate",
            ChartMetric::Elevation => "elevation",
            ChartMetric::Speed => "speed",
            ChartMetric::RunningSpeed => "runningSpeed",
            ChartMetric::RunningPower => "runningPower",
            ChartMetric::StrideLength => "strideLength",
            ChartMetric::GroundContactTime => "groundContactTime",
            ChartMetric::VerticalOscillation => "verticalOscillation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartMetric::HeartRate => "Heart Rate",
            ChartMetric::Elevation => "Elevation",
            ChartMetric::Speed => "Speed",
            ChartMetric::RunningSpeed => "Running Speed",
            ChartMetric::RunningPower => "Running Power",
            ChartMetric::StrideLength => "Stride Length",
            ChartMetric::GroundContactTime => "Ground Contact Time",
            ChartMetric::VerticalOscillation => "Vertical Oscillation",
        }
    }

    /// Statistic backing a running chart.
    fn statistic(self) -> Option<&'static str> {
        match self {
            ChartMetric::RunningSpeed => Some(metric::RUNNING_SPEED),
            ChartMetric::RunningPower => Some(metric::RUNNING_POWER),
            ChartMetric::StrideLength => Some(metric::RUNNING_STRIDE_LENGTH),
            ChartMetric::GroundContactTime => Some(metric::RUNNING_GROUND_CONTACT_TIME),
            ChartMetric::VerticalOscillation => Some(metric::RUNNING_VERTICAL_OSCILLATION),
            ChartMetric::HeartRate | ChartMetric::Elevation | ChartMetric::Speed => None,
        }
    }
}

/// A route series only charts when it lines up with the route's time axis.
fn route_series_recorded(series: &[f64], time: &[String]) -> bool {
    !series.is_empty() && series.len() == time.len()
}

fn is_available(workout: &WorkoutStats, chart: ChartMetric) -> bool {
    let route = &workout.workout_route;
    match chart {
        ChartMetric::HeartRate => workout.workout_vitals.heart_rate.chart.is_some(),
        ChartMetric::Elevation => route_series_recorded(&route.elevation, &route.time),
        ChartMetric::Speed => route_series_recorded(&route.speed, &route.time),
        running => running
            .statistic()
            .is_some_and(|name| !workout.workout_statistics.chart_time(name).is_empty()),
    }
}

/// Availability of every chart in display order. Nothing is available when
/// no workout is selected.
pub fn chart_availability(workout: Option<&WorkoutStats>) -> Vec<(ChartMetric, bool)> {
    ALL_CHART_METRICS
        .into_iter()
        .map(|m| (m, workout.is_some_and(|w| is_available(w, m))))
        .collect()
}

pub fn available_charts(workout: Option<&WorkoutStats>) -> Vec<ChartMetric> {
    chart_availability(workout)
        .into_iter()
        .filter_map(|(m, ok)| ok.then_some(m))
        .collect()
}

pub fn default_chart(workout: Option<&WorkoutStats>) -> Option<ChartMetric> {
    available_charts(workout).into_iter().next()
}

/// Values of one chart ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub metric: ChartMetric,
    pub label: String,
    pub unit: String,
    pub time: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    /// Points keyed by seconds since the first sample. Falls back to the
    /// sample index when the time labels cannot be parsed.
    pub fn points(&self) -> Vec<[f64; 2]> {
        let instants: Option<Vec<_>> = self
            .time
            .iter()
            .map(|t| parse_timestamp(t, None))
            .collect();
        match instants {
            Some(instants) if !instants.is_empty() && instants.len() == self.values.len() => {
                let start = instants[0];
                instants
                    .iter()
                    .zip(&self.values)
                    .map(|(t, v)| ((*t - start).num_milliseconds() as f64 / 1000.0, *v))
                    .map(|(x, y)| [x, y])
                    .collect()
            }
            _ => self
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| [i as f64, *v])
                .collect(),
        }
    }

    pub fn axis_label(&self) -> String {
        if self.unit.is_empty() {
            self.label.clone()
        } else {
            format!("{} ({})", self.label, self.unit)
        }
    }
}

/// Extract the series for `chart`. Returns `None` for unavailable charts so
/// an empty chart is never drawn.
pub fn chart_series(workout: &WorkoutStats, chart: ChartMetric) -> Option<ChartSeries> {
    if !is_available(workout, chart) {
        return None;
    }
    let route = &workout.workout_route;
    let (label, unit, time, values) = match chart {
        ChartMetric::HeartRate => {
            let hr = &workout.workout_vitals.heart_rate;
            let data = hr.chart.as_ref()?;
            ("Heart Rate", hr.unit.clone(), data.time.clone(), data.value.clone())
        }
        ChartMetric::Elevation => ("Elevation", "m".to_string(), route.time.clone(), route.elevation.clone()),
        ChartMetric::Speed => ("Speed", "m/s".to_string(), route.time.clone(), route.speed.clone()),
        running => {
            let summary = workout.workout_statistics.get(running.statistic()?)?;
            let data = summary.chart.as_ref()?;
            let label = match running {
                ChartMetric::RunningPower => "Power",
                ChartMetric::StrideLength => "Running Stride Length",
                other => other.label(),
            };
            (label, summary.unit.clone(), data.time.clone(), data.value.clone())
        }
    };
    Some(ChartSeries {
        metric: chart,
        label: label.to_string(),
        unit,
        time,
        values,
    })
}

/// Build a plot line for a chart series.
pub fn chart_line(series: &ChartSeries) -> Line {
    Line::new(PlotPoints::from(series.points())).name(series.axis_label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartData, MetricSummary};

    fn running_workout(time: Vec<&str>) -> WorkoutStats {
        let mut w = WorkoutStats {
            workout_name: "Running".into(),
            ..Default::default()
        };
        let values = (0..time.len()).map(|i| 3.0 + i as f64).collect();
        w.workout_statistics.0.insert(
            metric::RUNNING_SPEED.into(),
            MetricSummary {
                unit: "m/s".into(),
                chart: Some(ChartData {
                    time: time.into_iter().map(String::from).collect(),
                    value: values,
                }),
                ..Default::default()
            },
        );
        w
    }

    #[test]
    fn order_is_fixed() {
        let keys: Vec<_> = chart_availability(None).iter().map(|(m, _)| m.key()).collect();
        assert_eq!(
            keys,
            [
                "heartRate",
                "elevation",
                "speed",
                "runningSpeed",
                "runningPower",
                "strideLength",
                "groundContactTime",
                "verticalOscillation"
            ]
        );
        assert!(chart_availability(None).iter().all(|(_, ok)| !ok));
        assert_eq!(default_chart(None), None);
    }

    #[test]
    fn empty_running_chart_is_unavailable() {
        let w = running_workout(vec![]);
        let avail = chart_availability(Some(&w));
        assert!(avail.contains(&(ChartMetric::RunningSpeed, false)));
        assert_eq!(default_chart(Some(&w)), None);
        assert!(chart_series(&w, ChartMetric::RunningSpeed).is_none());
    }

    #[test]
    fn running_chart_becomes_default_tab() {
        let w = running_workout(vec!["t1", "t2"]);
        assert!(chart_availability(Some(&w)).contains(&(ChartMetric::RunningSpeed, true)));
        assert_eq!(default_chart(Some(&w)), Some(ChartMetric::RunningSpeed));
    }

    #[test]
    fn earlier_metric_wins_default() {
        let mut w = running_workout(vec!["t1", "t2"]);
        w.workout_route.elevation = vec![10.0, 12.0];
        w.workout_route.time = vec!["a".into(), "b".into()];
        assert_eq!(default_chart(Some(&w)), Some(ChartMetric::Elevation));
        assert_eq!(
            available_charts(Some(&w)),
            vec![ChartMetric::Elevation, ChartMetric::RunningSpeed]
        );
    }

    #[test]
    fn route_series_must_match_time_axis() {
        let mut w = WorkoutStats::default();
        w.workout_route.elevation = vec![1.0, 2.0, 3.0];
        assert!(chart_availability(Some(&w)).contains(&(ChartMetric::Elevation, false)));
        assert!(chart_series(&w, ChartMetric::Elevation).is_none());

        w.workout_route.time = vec![
            "2024-01-03 07:00:00 -0500".into(),
            "2024-01-03 07:00:01 -0500".into(),
            "2024-01-03 07:00:02 -0500".into(),
        ];
        w.workout_route.speed = vec![2.5];
        assert_eq!(available_charts(Some(&w)), vec![ChartMetric::Elevation]);
        let series = chart_series(&w, ChartMetric::Elevation).unwrap();
        assert_eq!(series.points(), vec![[0.0, 1.0], [1.0, 2.0], [2.0, 3.0]]);
    }

    #[test]
    fn heart_rate_requires_chart_block() {
        let mut w = WorkoutStats::default();
        assert_eq!(default_chart(Some(&w)), None);
        w.workout_vitals.heart_rate.chart = Some(ChartData {
            time: vec!["2024-01-03 07:00:00 -0500".into(), "2024-01-03 07:00:05 -0500".into()],
            value: vec![120.0, 124.0],
        });
        w.workout_vitals.heart_rate.unit = "count/min".into();
        assert_eq!(default_chart(Some(&w)), Some(ChartMetric::HeartRate));

        let series = chart_series(&w, ChartMetric::HeartRate).unwrap();
        assert_eq!(series.axis_label(), "Heart Rate (count/min)");
        assert_eq!(series.points(), vec![[0.0, 120.0], [5.0, 124.0]]);
    }

    #[test]
    fn unparseable_times_plot_by_index() {
        let w = running_workout(vec!["t1", "t2"]);
        let series = chart_series(&w, ChartMetric::RunningSpeed).unwrap();
        assert_eq!(series.points(), vec![[0.0, 3.0], [1.0, 4.0]]);
        assert_eq!(series.unit, "m/s");
    }
}
