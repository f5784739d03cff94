use crate::error::CatalogError;
use crate::executor::Launcher;
use crate::matcher;
use crate::model::AppRecord;
use crate::sources::Source;
use crate::sources::fallback::Fallback;
use chrono::Utc;
use log::{debug, info};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The records of one discovery pass, indexed by id.
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<AppRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Later records replace earlier ones with the same id, keeping the earlier position.
    pub fn from_records(records: Vec<AppRecord>) -> Self {
        let mut catalog = Catalog::default();
        for record in records {
            match catalog.index.get(&record.id) {
                Some(&pos) => {
                    debug!("Catalog: {} redefined, keeping the later entry", record.id);
                    catalog.records[pos] = record;
                }
                None => {
                    catalog.index.insert(record.id.clone(), catalog.records.len());
                    catalog.records.push(record);
                }
            }
        }
        catalog
    }

    pub fn records(&self) -> &[AppRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&AppRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut AppRecord> {
        self.index.get(id).map(|&pos| &mut self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[derive(Default)]
struct State {
    initialized: bool,
    catalog: Catalog,
}

/// Facade over discovery, search and launch. Safe to share between threads.
pub struct Manager {
    source: Box<dyn Source>,
    fallback: Fallback,
    launcher: Box<dyn Launcher>,
    exclude: Vec<Regex>,
    state: Mutex<State>,
}

impl Manager {
    pub fn new(source: Box<dyn Source>, fallback: Fallback, launcher: Box<dyn Launcher>) -> Self {
        Self {
            source,
            fallback,
            launcher,
            exclude: Vec::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Drops discovered records whose name or id matches any of `patterns`.
    pub fn with_exclusions(mut self, patterns: Vec<Regex>) -> Self {
        self.exclude = patterns;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs discovery once. Later calls are no-ops until `refresh`.
    pub fn initialize(&self) -> Result<(), CatalogError> {
        let mut state = self.lock();
        self.ensure_initialized(&mut state)
    }

    fn ensure_initialized(&self, state: &mut State) -> Result<(), CatalogError> {
        if state.initialized {
            return Ok(());
        }
        state.catalog = self.build()?;
        state.initialized = true;
        Ok(())
    }

    fn build(&self) -> Result<Catalog, CatalogError> {
        info!("Discovering installed applications...");
        let mut records = self.source.scan()?;
        if !self.exclude.is_empty() {
            records.retain(|r| {
                !self.exclude.iter().any(|re| re.is_match(&r.name) || re.is_match(&r.id))
            });
        }

        let catalog = if records.is_empty() {
            Catalog::from_records(self.fallback.provision())
        } else {
            Catalog::from_records(records)
        };
        info!("Discovered {} applications", catalog.len());
        Ok(catalog)
    }

    pub fn all_apps(&self) -> Result<Vec<AppRecord>, CatalogError> {
        let mut state = self.lock();
        self.ensure_initialized(&mut state)?;
        Ok(matcher::sort_all(state.catalog.records()))
    }

    pub fn search(&self, query: &str) -> Result<Vec<AppRecord>, CatalogError> {
        let mut state = self.lock();
        self.ensure_initialized(&mut state)?;
        let results = matcher::search(state.catalog.records(), query);
        debug!("Manager: query='{}', matched {}", query, results.len());
        Ok(results)
    }

    pub fn launch(&self, id: &str) -> Result<(), CatalogError> {
        let record = {
            let mut state = self.lock();
            self.ensure_initialized(&mut state)?;
            if let Some(record) = state.catalog.get_mut(id) {
                record.last_used_at = Some(Utc::now());
            }
            state
                .catalog
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))?
        };
        self.launcher.launch(&record)
    }

    /// Re-runs discovery and swaps the result in. Searches keep using the old catalog meanwhile.
    pub fn refresh(&self) -> Result<(), CatalogError> {
        let catalog = self.build();
        let mut state = self.lock();
        match catalog {
            Ok(catalog) => {
                state.catalog = catalog;
                state.initialized = true;
                Ok(())
            }
            Err(e) => {
                state.catalog = Catalog::default();
                state.initialized = false;
                Err(e)
            }
        }
    }

    /// Number of records, or 0 before the first discovery.
    pub fn app_count(&self) -> usize {
        let state = self.lock();
        if state.initialized { state.catalog.len() } else { 0 }
    }
}
