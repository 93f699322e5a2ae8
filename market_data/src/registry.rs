use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::AppConfig;

/// Artifact locations for one company, resolved against the artifact directory.
#[derive(Debug, Clone)]
pub struct CompanyArtifacts {
    pub name: String,
    pub country: String,
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub dataset: PathBuf,
    pub plot: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CountryCompanies {
    pub country: String,
    pub companies: Vec<String>,
}

/// Immutable company -> artifact mapping built once at startup.
#[derive(Debug, Clone, Default)]
pub struct CompanyRegistry {
    entries: Vec<CompanyArtifacts>,
}

impl CompanyRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let entries = config
            .companies
            .iter()
            .map(|c| CompanyArtifacts {
                name: c.name.clone(),
                country: c.country.clone(),
                model: config.artifact_path(&c.model),
                scaler: config.artifact_path(&c.scaler),
                dataset: config.artifact_path(&c.dataset),
                plot: c.plot.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Exact name first, then a case-insensitive match.
    pub fn get(&self, name: &str) -> Option<&CompanyArtifacts> {
        self.entries
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.entries.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompanyArtifacts> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Companies grouped by country, both in configuration order within a country.
    pub fn by_country(&self) -> Vec<CountryCompanies> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for entry in &self.entries {
            if !groups.contains_key(entry.country.as_str()) {
                order.push(entry.country.as_str());
            }
            groups
                .entry(entry.country.as_str())
                .or_default()
                .push(entry.name.clone());
        }

        order
            .into_iter()
            .map(|country| CountryCompanies {
                country: country.to_string(),
                companies: groups.remove(country).unwrap_or_default(),
            })
            .collect()
    }
}
