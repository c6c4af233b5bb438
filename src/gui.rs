// src/gui.rs
use std::error::Error;

use crate::api::{Request, Response, Session};
use crate::core::dom::Document;
use crate::store::{PLAYER_HEADERS, Settings, Store, StoredData};
use eframe::egui;
use egui_extras::{Column, TableBuilder};

pub fn run(options: eframe::NativeOptions) -> Result<(), Box<dyn Error>> {
    eframe::run_native(
        "Ottoneu Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(App::new()))),
    )?;
    Ok(())
}

pub struct App {
    // page snapshot the actions run against
    page_path: String,

    session: Session,

    // mirrors of what's on disk
    data: StoredData,
    settings: Settings,

    status: String,
}

impl App {
    pub fn new() -> Self {
        let store = Store::default();
        let data = store.load_data();
        let settings = store.load_settings();
        let status = if data.players.is_empty() {
            s!("No stored data yet. Load a page snapshot and refresh.")
        } else {
            format!("Loaded {} stored player(s).", data.players.len())
        };
        App {
            page_path: s!("page.html"),
            session: Session::new(Document::new(), store),
            data,
            settings,
            status,
        }
    }

    fn load_page(&mut self) -> bool {
        match std::fs::read_to_string(&self.page_path) {
            Ok(text) => {
                self.session.doc = Document::parse(&text);
                true
            }
            Err(e) => {
                self.status = format!("Error reading {}: {}", self.page_path, e);
                false
            }
        }
    }

    fn refresh(&mut self) {
        if !self.load_page() {
            return;
        }
        match self.session.handle(Request::RefreshData) {
            Response::Data(data) => {
                self.status = format!("Ready: {} player(s).", data.players.len());
                self.data = data;
            }
            Response::Failed(e) => self.status = format!("Error: {}", e),
            _ => {}
        }
    }

    fn reformat(&mut self) {
        if !self.load_page() {
            return;
        }
        self.session.handle(Request::RefreshFormatting);
        match std::fs::write(&self.page_path, self.session.doc.to_html()) {
            Ok(()) => self.status = format!("Reformatted {}.", self.page_path),
            Err(e) => self.status = format!("Error writing {}: {}", self.page_path, e),
        }
    }

    fn clear(&mut self) {
        match self.session.handle(Request::ClearData) {
            Response::Done => {
                self.data = StoredData::default();
                self.status = s!("Stored data cleared.");
            }
            Response::Failed(e) => self.status = format!("Error: {}", e),
            _ => {}
        }
    }

    fn save_settings(&mut self) {
        if let Response::Failed(e) = self.session.handle(Request::SaveSettings(self.settings.clone())) {
            self.status = format!("Error saving settings: {}", e);
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("actions").show(ctx, |ui| {
            ui.heading("Ottoneu Viewer");
            ui.horizontal(|ui| {
                ui.label("Page:");
                ui.text_edit_singleline(&mut self.page_path);
                if ui.button("Refresh").clicked() {
                    self.refresh();
                }
                if ui.button("Reformat").clicked() {
                    self.reformat();
                }
                if ui.button("Clear").clicked() {
                    self.clear();
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!(
                    "Team value: {}",
                    self.data.team_value.as_deref().unwrap_or("-")
                ));
                ui.separator();
                ui.label(format!(
                    "Salary cap: {}",
                    self.data.salary_cap.as_deref().unwrap_or("-")
                ));
            });

            ui.separator();

            // Settings (persist immediately)
            let mut changed = false;
            changed |= ui.checkbox(&mut self.settings.auto_refresh, "Auto-refresh").changed();
            changed |= ui.checkbox(&mut self.settings.notifications, "Notifications").changed();
            ui.horizontal(|ui| {
                ui.label("Refresh interval (ms):");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.settings.refresh_interval_ms).speed(250))
                    .changed();
            });
            if changed {
                self.settings.refresh_interval_ms =
                    self.settings.refresh_interval_ms.clamp(1_000, 600_000);
                self.save_settings();
            }

            ui.label(format!("Status: {}", self.status));
            ui.separator();

            // Stored roster (egui_extras 0.32 API)
            let mut table = TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().resizable(true).at_least(120.0));
            for _ in 1..PLAYER_HEADERS.len() {
                table = table.column(Column::auto());
            }

            table
                .header(20.0, |mut header| {
                    for h in PLAYER_HEADERS {
                        header.col(|ui| {
                            ui.label(h);
                        });
                    }
                })
                .body(|mut body| {
                    body.rows(18.0, self.data.players.len(), |mut row| {
                        let idx = row.index();
                        if let Some(p) = self.data.players.get(idx) {
                            let cells = [
                                p.name.as_str(),
                                p.salary.as_deref().unwrap_or(""),
                                p.position.as_deref().unwrap_or(""),
                                p.team.as_deref().unwrap_or(""),
                            ];
                            for cell in cells {
                                row.col(|ui| {
                                    ui.label(cell);
                                });
                            }
                        }
                    });
                });
        });
    }
}
