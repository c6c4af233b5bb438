// src/store.rs
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use std::{fs, io};

use crate::csv::{parse_rows, rows_to_string, write_row};
use crate::page::{PageData, PlayerEntry};

pub const DEFAULT_STORE_DIR: &str = ".store";
const DATA_FILE: &str = "data.csv";
const PLAYERS_FILE: &str = "players.csv";
const SETTINGS_FILE: &str = "settings.csv";

pub const PLAYER_HEADERS: [&str; 4] = ["Name", "Salary", "Position", "Team"];

/// User settings, flat key-value on disk, last write wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub auto_refresh: bool,
    pub refresh_interval_ms: u64,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_refresh: true,
            refresh_interval_ms: 30_000,
            notifications: true,
        }
    }
}

/// Scraped data as it sits on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredData {
    pub team_value: Option<String>,
    pub salary_cap: Option<String>,
    pub players: Vec<PlayerEntry>,
    pub last_updated_ms: Option<u64>,
}

/// Flat on-disk store rooted at a data directory. Tests point it at a
/// scratch directory; the apps use `.store/`.
pub struct Store {
    dir: PathBuf,
}

impl Default for Store {
    fn default() -> Self {
        Store { dir: PathBuf::from(DEFAULT_STORE_DIR) }
    }
}

impl Store {
    pub fn at<P: AsRef<Path>>(dir: P) -> Self {
        Store { dir: dir.as_ref().to_path_buf() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /* ---------------- scraped data ---------------- */

    pub fn save_data(&self, data: &PageData) -> Result<(), Box<dyn Error>> {
        self.ensure_dir()?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut rows: Vec<Vec<String>> = Vec::new();
        if let Some(v) = &data.team_value {
            rows.push(vec![s!("team_value"), v.clone()]);
        }
        if let Some(v) = &data.salary_cap {
            rows.push(vec![s!("salary_cap"), v.clone()]);
        }
        rows.push(vec![s!("last_updated"), stamp.to_string()]);
        fs::write(self.path(DATA_FILE), rows_to_string(&rows, None))?;

        let file = fs::File::create(self.path(PLAYERS_FILE))?;
        let mut w = io::BufWriter::new(file);
        let headers: Vec<String> = PLAYER_HEADERS.iter().map(|h| s!(*h)).collect();
        write_row(&mut w, &headers)?;
        for p in &data.players {
            write_row(
                &mut w,
                &[
                    p.name.clone(),
                    p.salary.clone().unwrap_or_default(),
                    p.position.clone().unwrap_or_default(),
                    p.team.clone().unwrap_or_default(),
                ],
            )?;
        }

        logf!("store: saved {} player(s) to {}", data.players.len(), self.dir.display());
        Ok(())
    }

    pub fn load_data(&self) -> StoredData {
        let mut out = StoredData::default();

        if let Ok(text) = fs::read_to_string(self.path(DATA_FILE)) {
            for row in parse_rows(&text) {
                let (Some(key), Some(val)) = (row.first(), row.get(1)) else {
                    continue;
                };
                match key.as_str() {
                    "team_value" => out.team_value = Some(val.clone()),
                    "salary_cap" => out.salary_cap = Some(val.clone()),
                    "last_updated" => out.last_updated_ms = val.parse().ok(),
                    _ => {}
                }
            }
        }

        if let Ok(text) = fs::read_to_string(self.path(PLAYERS_FILE)) {
            let mut rows = parse_rows(&text).into_iter();
            // header row is written unconditionally; tolerate its absence
            let mut pending = rows.next();
            if pending.as_ref().is_some_and(|r| r.first().is_some_and(|c| c == "Name")) {
                pending = rows.next();
            }
            while let Some(row) = pending {
                if let Some(name) = row.first().filter(|n| !n.is_empty()) {
                    out.players.push(PlayerEntry {
                        name: name.clone(),
                        salary: row.get(1).filter(|v| !v.is_empty()).cloned(),
                        position: row.get(2).filter(|v| !v.is_empty()).cloned(),
                        team: row.get(3).filter(|v| !v.is_empty()).cloned(),
                    });
                }
                pending = rows.next();
            }
        }

        out
    }

    /// Drop scraped data. Settings survive a clear.
    pub fn clear_data(&self) -> Result<(), Box<dyn Error>> {
        for file in [DATA_FILE, PLAYERS_FILE] {
            let p = self.path(file);
            if p.exists() {
                fs::remove_file(p)?;
            }
        }
        logf!("store: cleared data");
        Ok(())
    }

    /* ---------------- settings ---------------- */

    pub fn save_settings(&self, settings: &Settings) -> Result<(), Box<dyn Error>> {
        self.ensure_dir()?;
        let rows = vec![
            vec![s!("auto_refresh"), settings.auto_refresh.to_string()],
            vec![s!("refresh_interval_ms"), settings.refresh_interval_ms.to_string()],
            vec![s!("notifications"), settings.notifications.to_string()],
        ];
        fs::write(self.path(SETTINGS_FILE), rows_to_string(&rows, None))?;
        Ok(())
    }

    /// Missing or garbled entries fall back to defaults per key.
    pub fn load_settings(&self) -> Settings {
        let mut out = Settings::default();
        let Ok(text) = fs::read_to_string(self.path(SETTINGS_FILE)) else {
            return out;
        };
        for row in parse_rows(&text) {
            let (Some(key), Some(val)) = (row.first(), row.get(1)) else {
                continue;
            };
            match key.as_str() {
                "auto_refresh" => {
                    if let Ok(v) = val.parse() {
                        out.auto_refresh = v;
                    }
                }
                "refresh_interval_ms" => {
                    if let Ok(v) = val.parse() {
                        out.refresh_interval_ms = v;
                    }
                }
                "notifications" => {
                    if let Ok(v) = val.parse() {
                        out.notifications = v;
                    }
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> Store {
        let mut p = std::env::temp_dir();
        p.push(format!("otto_fmt_store_{}", name));
        let _ = fs::remove_dir_all(&p);
        Store::at(p)
    }

    fn sample() -> PageData {
        PageData {
            team_value: Some(s!("1234")),
            salary_cap: Some(s!("400")),
            players: vec![
                PlayerEntry {
                    name: s!("Mike Trout"),
                    salary: Some(s!("45")),
                    position: Some(s!("OF")),
                    team: Some(s!("LAA")),
                },
                PlayerEntry { name: s!("No, Data"), ..Default::default() },
            ],
        }
    }

    #[test]
    fn data_round_trips() {
        let store = scratch("roundtrip");
        store.save_data(&sample()).unwrap();
        let loaded = store.load_data();
        assert_eq!(loaded.team_value.as_deref(), Some("1234"));
        assert_eq!(loaded.salary_cap.as_deref(), Some("400"));
        assert_eq!(loaded.players, sample().players);
        assert!(loaded.last_updated_ms.is_some());
    }

    #[test]
    fn missing_files_load_empty() {
        let store = scratch("empty");
        assert_eq!(store.load_data(), StoredData::default());
        assert_eq!(store.load_settings(), Settings::default());
    }

    #[test]
    fn clear_keeps_settings() {
        let store = scratch("clear");
        store.save_data(&sample()).unwrap();
        let mut s = Settings::default();
        s.auto_refresh = false;
        s.refresh_interval_ms = 5_000;
        store.save_settings(&s).unwrap();

        store.clear_data().unwrap();
        assert_eq!(store.load_data(), StoredData::default());
        assert_eq!(store.load_settings(), s);
    }

    #[test]
    fn settings_tolerate_garbage() {
        let store = scratch("garbage");
        store.ensure_dir().unwrap();
        fs::write(store.path(SETTINGS_FILE), "auto_refresh,maybe\nnotifications,false\n").unwrap();
        let s = store.load_settings();
        assert!(s.auto_refresh); // unparseable value keeps the default
        assert!(!s.notifications);
    }
}
