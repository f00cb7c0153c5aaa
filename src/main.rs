//! Desktop viewer for workouts stored in an Apple Health export.

use chrono::{Local, NaiveDate};
use eframe::{App, Frame, NativeOptions};
use egui_extras::DatePickerButton;
use egui_plot::{Legend, Plot};
use log::info;
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

mod charts;
use charts::{ChartMetric, chart_line, chart_series};
mod client;
use client::{ApiClient, SUPPORTED_ARCHIVES, is_supported_archive};
mod dates;
mod export;
use export::{save_view_csv, save_view_json, save_workouts_json};
mod formatting;
mod model;
mod navigator;
mod orchestrator;
use orchestrator::FetchStatus;
mod settings;
use settings::Settings;
mod state;
use state::{AppState, StateEvent};
mod upload;
mod view;
use view::{DetailSection, MetricCard, WorkoutView, build_view};

#[cfg(test)]
mod test_support;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Landing,
    Workouts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailTab {
    Overview,
    Performance,
    Vitals,
}

struct HealthApp {
    settings: Settings,
    settings_dirty: bool,
    show_settings: bool,
    state: AppState,
    events: Receiver<StateEvent>,
    ctx: egui::Context,
    page: Page,
    picker_date: NaiveDate,
    date_message: Option<String>,
    upload_message: Option<(String, bool)>,
    view: Option<WorkoutView>,
    chart: Option<ChartMetric>,
    tab: DetailTab,
    toast: Option<(String, Instant)>,
}

fn connect(settings: &Settings, ctx: &egui::Context) -> (AppState, Receiver<StateEvent>) {
    let url = settings.effective_api_url();
    info!("Using backend at {url}");
    let api = Arc::new(ApiClient::new(&url, settings.request_timeout()));
    let mut state = AppState::new(api);
    let repaint = ctx.clone();
    state.set_waker(Arc::new(move || repaint.request_repaint()));
    let events = state.subscribe();
    if settings.connect_on_start {
        state.start();
    }
    (state, events)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl HealthApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = Settings::load();
        let ctx = cc.egui_ctx.clone();
        let (state, events) = connect(&settings, &ctx);
        Self {
            settings,
            settings_dirty: false,
            show_settings: false,
            state,
            events,
            ctx,
            page: Page::Landing,
            picker_date: Local::now().date_naive(),
            date_message: None,
            upload_message: None,
            view: None,
            chart: None,
            tab: DetailTab::Overview,
            toast: None,
        }
    }

    /// Drop the current connection and start over against the configured
    /// backend.
    fn reconnect(&mut self) {
        let (state, events) = connect(&self.settings, &self.ctx);
        self.state = state;
        self.events = events;
        if !self.settings.connect_on_start {
            self.state.start();
        }
        self.view = None;
        self.chart = None;
        self.date_message = None;
    }

    /// Rebuild the view for the current workout. The chart always opens on
    /// the workout's first available tab.
    fn refresh_view(&mut self) {
        self.view = self.state.current_workout().map(build_view);
        self.chart = self.view.as_ref().and_then(|view| view.default_chart);
    }

    fn handle_events(&mut self) {
        self.state.poll();
        let mut view_changed = false;
        for event in self.events.try_iter().collect::<Vec<_>>() {
            match event {
                StateEvent::ExportStatus(true) => self.page = Page::Workouts,
                StateEvent::ExportStatus(false) => self.page = Page::Landing,
                StateEvent::DatesLoaded(_) => {
                    if let Some(last) = self.state.dates().last_date() {
                        self.picker_date = last;
                    }
                }
                StateEvent::WorkoutsReplaced { .. } | StateEvent::WorkoutChanged(_) => {
                    view_changed = true;
                }
                StateEvent::UploadFinished(outcome) => {
                    let ok = outcome.is_success();
                    self.upload_message = Some((outcome.message(), ok));
                    if ok {
                        self.page = Page::Workouts;
                        self.view = None;
                        self.toast = Some((outcome.message(), Instant::now()));
                    }
                }
                StateEvent::FetchFailed(message) => {
                    log::warn!("Fetch failed: {message}");
                }
                StateEvent::DateSelected(_) | StateEvent::UploadStarted(_) => {}
            }
        }
        if view_changed {
            self.refresh_view();
        }
    }

    fn start_upload(&mut self, path: PathBuf) {
        if !is_supported_archive(&path) {
            self.upload_message = Some((
                format!(
                    "{} is not a supported archive ({})",
                    file_label(&path),
                    SUPPORTED_ARCHIVES.join(", ")
                ),
                false,
            ));
            return;
        }
        if let Some(dir) = path.parent() {
            self.settings.last_upload_dir = Some(dir.display().to_string());
            self.settings_dirty = true;
        }
        info!("Uploading {}", path.display());
        if self.state.start_upload(path) {
            self.upload_message = None;
        }
    }

    fn pick_upload(&mut self) {
        let mut dialog = FileDialog::new().add_filter("Apple Health Export", &SUPPORTED_ARCHIVES);
        if let Some(dir) = &self.settings.last_upload_dir {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.start_upload(path);
        }
    }

    fn export_workouts(&mut self) {
        let Some(path) = self.export_dialog().add_filter("JSON", &["json"]).save_file() else {
            return;
        };
        self.remember_export_dir(&path);
        match save_workouts_json(&path, self.state.navigator().workouts()) {
            Ok(()) => self.toast = Some((format!("Saved {}", file_label(&path)), Instant::now())),
            Err(e) => log::error!("Failed to export workouts: {e}"),
        }
    }

    fn export_view(&mut self) {
        let Some(view) = self.view.clone() else {
            return;
        };
        let Some(path) = self
            .export_dialog()
            .add_filter("CSV", &["csv"])
            .add_filter("JSON", &["json"])
            .save_file()
        else {
            return;
        };
        self.remember_export_dir(&path);
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let result = if is_json {
            save_view_json(&path, &view).map_err(|e| e.to_string())
        } else {
            save_view_csv(&path, &view).map_err(|e| e.to_string())
        };
        match result {
            Ok(()) => self.toast = Some((format!("Saved {}", file_label(&path)), Instant::now())),
            Err(e) => log::error!("Failed to export workout view: {e}"),
        }
    }

    fn export_dialog(&self) -> FileDialog {
        let dialog = FileDialog::new();
        match &self.settings.last_export_dir {
            Some(dir) => dialog.set_directory(dir),
            None => dialog,
        }
    }

    fn remember_export_dir(&mut self, path: &Path) {
        if let Some(dir) = path.parent() {
            self.settings.last_export_dir = Some(dir.display().to_string());
            self.settings_dirty = true;
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Upload Export...").clicked() {
                        self.page = Page::Landing;
                        ui.close_menu();
                    }
                    if ui.button("Workouts").clicked() {
                        self.page = Page::Workouts;
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_workouts = !self.state.navigator().is_empty();
                    if ui
                        .add_enabled(has_workouts, egui::Button::new("Export Workouts..."))
                        .clicked()
                    {
                        ui.close_menu();
                        self.export_workouts();
                    }
                    if ui
                        .add_enabled(self.view.is_some(), egui::Button::new("Export Current Workout..."))
                        .clicked()
                    {
                        ui.close_menu();
                        self.export_view();
                    }
                    ui.separator();
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });
    }

    fn landing_page(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Apple Health Workout Viewer");
            ui.add_space(10.0);
            ui.label("Upload your Apple Health export to browse your workouts.");
            ui.label(format!(
                "Supported archives: {}",
                SUPPORTED_ARCHIVES.join(", ")
            ));
            ui.add_space(10.0);
            if self.state.is_uploading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Processing export...");
                });
            } else {
                if ui.button("Choose Export...").clicked() {
                    self.pick_upload();
                }
                ui.label("or drop the archive onto this window");
            }
            if let Some((msg, ok)) = &self.upload_message {
                ui.add_space(10.0);
                let color = if *ok {
                    ui.visuals().text_color()
                } else {
                    ui.visuals().error_fg_color
                };
                ui.colored_label(color, msg);
            }
            if let Some(err) = self.state.startup_error().map(str::to_owned) {
                ui.add_space(10.0);
                let color = ui.visuals().error_fg_color;
                ui.colored_label(color, format!("Backend unavailable: {err}"));
                if ui.button("Retry").clicked() {
                    self.state.retry_startup();
                }
            }
            if self.state.export_present() == Some(true) {
                ui.add_space(10.0);
                if ui.button("View Workouts").clicked() {
                    self.page = Page::Workouts;
                }
            }
        });
    }

    fn date_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Date:");
            let resp = ui.add(DatePickerButton::new(&mut self.picker_date).id_source("workout_date"));
            if resp.changed() {
                match self.state.select_date(self.picker_date) {
                    Ok(_) => self.date_message = None,
                    Err(e) => {
                        let hint = self
                            .state
                            .dates()
                            .nearest_valid_date(self.picker_date)
                            .map(|d| format!(" Nearest workout day: {d}"))
                            .unwrap_or_default();
                        self.date_message = Some(format!("{e}.{hint}"));
                    }
                }
            }
            let dates = self.state.dates();
            if let (Some(first), Some(last)) = (dates.first_date(), dates.last_date()) {
                ui.weak(format!(
                    "{} workouts between {first} and {last}",
                    dates.total_workouts()
                ));
            }
        });
        if let Some(msg) = &self.date_message {
            let color = ui.visuals().warn_fg_color;
            ui.colored_label(color, msg);
        }
        if let Some(err) = self.state.startup_error().map(str::to_owned) {
            ui.horizontal(|ui| {
                let color = ui.visuals().error_fg_color;
                ui.colored_label(color, format!("Could not load workout days: {err}"));
                if ui.small_button("Retry").clicked() {
                    self.state.retry_startup();
                }
            });
        }

        match self.state.fetch_status().clone() {
            FetchStatus::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading workouts...");
                });
            }
            FetchStatus::Error(msg) => {
                ui.horizontal(|ui| {
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, msg);
                    if ui.small_button("Dismiss").clicked() {
                        self.state.dismiss_error();
                    }
                });
            }
            FetchStatus::Idle | FetchStatus::Ready => {}
        }
    }

    fn navigation(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let enabled = self.state.navigator().len() > 1;
            if ui.add_enabled(enabled, egui::Button::new("<")).clicked() {
                self.state.select_previous();
            }
            ui.label(self.state.navigator().position_label());
            if ui.add_enabled(enabled, egui::Button::new(">")).clicked() {
                self.state.select_next();
            }
        });
    }

    fn chart_panel(&mut self, ui: &mut egui::Ui) {
        let Some(view) = &self.view else {
            return;
        };
        let tabs = view.chart_tabs();
        ui.horizontal_wrapped(|ui| {
            for metric in tabs {
                ui.selectable_value(&mut self.chart, Some(metric), metric.label());
            }
        });

        let series = self
            .chart
            .zip(self.state.current_workout())
            .and_then(|(metric, workout)| Some((metric, chart_series(workout, metric)?)));
        match series {
            Some((metric, series)) => {
                // Each tab keeps its own zoom and pan.
                Plot::new(("workout_chart", metric.key()))
                    .height(260.0)
                    .x_axis_label("Seconds")
                    .y_axis_label(series.axis_label())
                    .legend(Legend::default())
                    .show(ui, |plot_ui| plot_ui.line(chart_line(&series)));
            }
            None => {
                ui.label("No chart data recorded for this workout.");
            }
        }
    }

    fn workouts_page(&mut self, ui: &mut egui::Ui) {
        self.date_bar(ui);
        ui.separator();
        if self.state.navigator().is_empty() {
            ui.label(match self.state.dates().selected() {
                Some(_) => "No workouts loaded for this date.",
                None => "Pick a workout day to load its workouts.",
            });
            return;
        }
        self.navigation(ui);
        let Some(view) = self.view.clone() else {
            return;
        };

        ui.heading(&view.header.title);
        ui.horizontal(|ui| {
            ui.label(&view.header.time_range);
            ui.separator();
            ui.label(format!("Energy burned: {}", view.header.energy_burned));
        });
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            for card in &view.summary {
                metric_card(ui, card);
            }
        });
        ui.add_space(6.0);

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, DetailTab::Overview, "Overview");
                ui.selectable_value(&mut self.tab, DetailTab::Performance, "Performance");
                ui.selectable_value(&mut self.tab, DetailTab::Vitals, "Vitals");
            });
            match self.tab {
                DetailTab::Overview => view.overview.iter().for_each(|s| detail_section(ui, s)),
                DetailTab::Performance if view.performance.is_empty() => {
                    ui.label("No performance metrics recorded.");
                }
                DetailTab::Performance => view.performance.iter().for_each(|s| detail_section(ui, s)),
                DetailTab::Vitals => detail_section(ui, &view.vitals),
            }
            ui.separator();
            self.chart_panel(ui);
        });
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut apply = false;
        egui::Window::new("Settings")
            .open(&mut open)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Backend URL:");
                    if ui.text_edit_singleline(&mut self.settings.api_url).changed() {
                        self.settings_dirty = true;
                    }
                    ui.end_row();
                    ui.label("Request timeout (s):");
                    if ui
                        .add(egui::DragValue::new(&mut self.settings.request_timeout_secs).clamp_range(1..=600))
                        .changed()
                    {
                        self.settings_dirty = true;
                    }
                    ui.end_row();
                    ui.label("Connect on start:");
                    if ui.checkbox(&mut self.settings.connect_on_start, "").changed() {
                        self.settings_dirty = true;
                    }
                    ui.end_row();
                });
                if self.settings.effective_api_url() != self.settings.api_url {
                    ui.weak("HEALTH_API_URL overrides the backend URL.");
                }
                if ui.button("Reconnect").clicked() {
                    apply = true;
                }
            });
        self.show_settings = open;
        if apply {
            self.reconnect();
        }
    }
}

fn metric_card(ui: &mut egui::Ui, card: &MetricCard) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.vertical(|ui| {
            ui.weak(&card.label);
            if card.unit.is_empty() {
                ui.strong(&card.value);
            } else {
                ui.strong(format!("{} {}", card.value, card.unit));
            }
        });
    });
}

fn detail_section(ui: &mut egui::Ui, section: &DetailSection) {
    egui::CollapsingHeader::new(&section.title)
        .default_open(true)
        .show(ui, |ui| {
            egui::Grid::new(&section.title).num_columns(2).striped(true).show(ui, |ui| {
                for item in &section.items {
                    ui.label(&item.label);
                    ui.label(&item.value);
                    ui.end_row();
                }
            });
        });
}

impl App for HealthApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.handle_events();

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if let Some(path) = dropped.into_iter().next() {
            self.page = Page::Landing;
            self.start_upload(path);
        }

        self.menu_bar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| match self.page {
            Page::Landing => self.landing_page(ui),
            Page::Workouts => self.workouts_page(ui),
        });
        if self.show_settings {
            self.settings_window(ctx);
        }

        if let Some((msg, start)) = &self.toast {
            if start.elapsed() < Duration::from_secs(3) {
                egui::Area::new(egui::Id::new("toast"))
                    .anchor(egui::Align2::RIGHT_TOP, [-10.0, 30.0])
                    .show(ctx, |ui| {
                        ui.label(msg);
                    });
                ctx.request_repaint_after(Duration::from_millis(250));
            } else {
                self.toast = None;
            }
        }

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions::default();
    eframe::run_native(
        "Apple Health Workout Viewer",
        options,
        Box::new(|cc| Box::new(HealthApp::new(cc))),
    )
}
