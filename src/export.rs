use crate::{model::WorkoutStats, view::WorkoutView};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

/// Save the raw workouts of the selected date.
pub fn save_workouts_json<P: AsRef<Path>>(path: P, workouts: &[WorkoutStats]) -> std::io::Result<()> {
    write_json(workouts, path)
}

#[derive(Debug, Serialize, PartialEq)]
struct ViewRow<'a> {
    section: &'a str,
    label: &'a str,
    value: &'a str,
    unit: &'a str,
}

fn view_rows(view: &WorkoutView) -> Vec<ViewRow<'_>> {
    let mut rows = vec![
        ViewRow {
            section: "Header",
            label: "Workout",
            value: &view.header.title,
            unit: "",
        },
        ViewRow {
            section: "Header",
            label: "Time",
            value: &view.header.time_range,
            unit: "",
        },
        ViewRow {
            section: "Header",
            label: "Energy Burned",
            value: &view.header.energy_burned,
            unit: "",
        },
    ];
    for card in &view.summary {
        rows.push(ViewRow {
            section: "Summary",
            label: &card.label,
            value: &card.value,
            unit: &card.unit,
        });
    }
    let sections = view
        .overview
        .iter()
        .chain(&view.performance)
        .chain(std::iter::once(&view.vitals));
    for s in sections {
        for item in &s.items {
            rows.push(ViewRow {
                section: &s.title,
                label: &item.label,
                value: &item.value,
                unit: "",
            });
        }
    }
    rows
}

/// Save the presented values of one workout as `section,label,value,unit` rows.
pub fn save_view_csv<P: AsRef<Path>>(path: P, view: &WorkoutView) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, &view_rows(view))
}

pub fn save_view_json<P: AsRef<Path>>(path: P, view: &WorkoutView) -> std::io::Result<()> {
    write_json(view, path)
}
