// src/api.rs
//
// The storage/messaging surface: the typed actions a front-end can send
// against a loaded page session. Mirrors the flat key-value store plus the
// refresh hooks; unknown failure modes come back as Failed, never a panic.

use crate::core::dom::Document;
use crate::page::{self, PageData};
use crate::runner::Runner;
use crate::store::{Settings, Store, StoredData};

#[derive(Debug)]
pub enum Request {
    GetData,
    SaveData(PageData),
    ClearData,
    GetSettings,
    SaveSettings(Settings),
    RefreshData,
    RefreshFormatting,
}

#[derive(Debug)]
pub enum Response {
    Data(StoredData),
    Settings(Settings),
    Done,
    Failed(String),
}

impl Response {
    pub fn success(&self) -> bool {
        !matches!(self, Response::Failed(_))
    }
}

/// One loaded page plus the machinery acting on it.
pub struct Session {
    pub doc: Document,
    pub runner: Runner,
    pub store: Store,
}

impl Session {
    pub fn new(doc: Document, store: Store) -> Self {
        Session { doc, runner: Runner::new(), store }
    }

    pub fn handle(&mut self, request: Request) -> Response {
        logd!("api: {}", request_name(&request));
        match request {
            Request::GetData => Response::Data(self.store.load_data()),

            Request::SaveData(data) => match self.store.save_data(&data) {
                Ok(()) => Response::Done,
                Err(e) => Response::Failed(e.to_string()),
            },

            Request::ClearData => match self.store.clear_data() {
                Ok(()) => Response::Done,
                Err(e) => Response::Failed(e.to_string()),
            },

            Request::GetSettings => Response::Settings(self.store.load_settings()),

            Request::SaveSettings(settings) => match self.store.save_settings(&settings) {
                Ok(()) => Response::Done,
                Err(e) => Response::Failed(e.to_string()),
            },

            Request::RefreshData => {
                let data = page::extract(&self.doc);
                if let Err(e) = self.store.save_data(&data) {
                    return Response::Failed(e.to_string());
                }
                self.runner.refresh(&mut self.doc);
                Response::Data(self.store.load_data())
            }

            Request::RefreshFormatting => {
                // an overlapping pass is dropped by design, not an error
                self.runner.refresh(&mut self.doc);
                Response::Done
            }
        }
    }
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::GetData => "getData",
        Request::SaveData(_) => "saveData",
        Request::ClearData => "clearData",
        Request::GetSettings => "getSettings",
        Request::SaveSettings(_) => "saveSettings",
        Request::RefreshData => "refreshData",
        Request::RefreshFormatting => "refreshFormatting",
    }
}
