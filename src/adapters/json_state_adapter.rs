//! JSON file state store.
//!
//! Keeps `state.json` (the open position and per-day counters) and
//! `parameters.json` (learned per-pattern tallies) in one directory.

use crate::domain::error::StuntmanError;
use crate::domain::execution::TradingState;
use crate::domain::learning::LearnedParameters;
use crate::ports::state_port::StatePort;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct JsonStateAdapter {
    dir: PathBuf,
}

impl JsonStateAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    fn parameters_path(&self) -> PathBuf {
        self.dir.join("parameters.json")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StuntmanError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StuntmanError::Persistence {
                reason: format!("failed to read {}: {}", path.display(), e),
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StuntmanError::Persistence {
            reason: format!("corrupt {}: {}", path.display(), e),
        })
}

fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), StuntmanError> {
    fs::create_dir_all(dir).map_err(|e| StuntmanError::Persistence {
        reason: format!("failed to create {}: {}", dir.display(), e),
    })?;
    let json = serde_json::to_string_pretty(value)?;
    // replace atomically
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|e| StuntmanError::Persistence {
            reason: format!("failed to write {}: {}", path.display(), e),
        })
}

impl StatePort for JsonStateAdapter {
    fn load_state(&self) -> Result<Option<TradingState>, StuntmanError> {
        read_json(&self.state_path())
    }

    fn save_state(&self, state: &TradingState) -> Result<(), StuntmanError> {
        write_json(&self.dir, &self.state_path(), state)
    }

    fn load_parameters(&self) -> Result<LearnedParameters, StuntmanError> {
        Ok(read_json(&self.parameters_path())?.unwrap_or_default())
    }

    fn save_parameters(&self, params: &LearnedParameters) -> Result<(), StuntmanError> {
        write_json(&self.dir, &self.parameters_path(), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::test_support::trade_in_year;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn empty_store_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateAdapter::new(dir.path().join("store"));
        assert!(store.load_state().unwrap().is_none());
        assert_eq!(store.load_parameters().unwrap(), LearnedParameters::default());
    }

    #[test]
    fn state_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateAdapter::new(dir.path().join("store"));

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut state = TradingState::default();
        state.trades_closed.insert(date, 2);
        state.realized_pnl.insert(date, -312.5);
        store.save_state(&state).unwrap();

        let loaded = store.load_state().unwrap().unwrap();
        assert_eq!(loaded.trades_closed_on(date), 2);
        assert!((loaded.realized_on(date) + 312.5).abs() < f64::EPSILON);
        assert!(loaded.is_flat());
    }

    #[test]
    fn parameters_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateAdapter::new(dir.path().to_path_buf());
        let mut params = LearnedParameters::default();
        params.record(&[trade_in_year(120.0, 2024)]);
        store.save_parameters(&params).unwrap();
        assert_eq!(store.load_parameters().unwrap(), params);
    }

    #[test]
    fn corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), "{ not json").unwrap();
        let store = JsonStateAdapter::new(dir.path().to_path_buf());
        assert!(matches!(
            store.load_state().unwrap_err(),
            StuntmanError::Persistence { .. }
        ));
    }
}
