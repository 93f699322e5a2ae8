//! Geopolitical risk tables.
//!
//! Both tables are small CSV files read once at startup and only scanned
//! afterwards, so lookups are plain linear searches.

use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dataset::open_artifact;
use crate::error::{ArtifactError, ArtifactKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRisk {
    pub company: String,
    pub country: String,
    /// Empty in the CSV when only the country-level score is known.
    pub grsi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRisk {
    pub country: String,
    pub grsi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyScore {
    pub company: String,
    #[serde(rename = "GRSI")]
    pub grsi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryScore {
    pub country: String,
    #[serde(rename = "GRSI")]
    pub grsi: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RiskTables {
    companies: Vec<CompanyRisk>,
    countries: Vec<CountryRisk>,
}

impl RiskTables {
    pub fn new(companies: Vec<CompanyRisk>, countries: Vec<CountryRisk>) -> Self {
        Self { companies, countries }
    }

    /// Loads whichever tables are configured; an unconfigured table is empty.
    pub fn load(company_path: Option<&Path>, country_path: Option<&Path>) -> Result<Self, ArtifactError> {
        let companies = match company_path {
            Some(path) => read_table(path)?,
            None => Vec::new(),
        };
        let countries = match country_path {
            Some(path) => read_table(path)?,
            None => Vec::new(),
        };
        info!(
            "Loaded risk tables: {} companies, {} countries",
            companies.len(),
            countries.len()
        );
        Ok(Self::new(companies, countries))
    }

    pub fn companies(&self) -> &[CompanyRisk] {
        &self.companies
    }

    pub fn countries(&self) -> &[CountryRisk] {
        &self.countries
    }

    /// Case-insensitive match: exact equality wins over substring containment
    /// (in either direction). The first matching row is returned. Rows with a
    /// blank company name never match.
    pub fn find_company(&self, query: &str) -> Option<&CompanyRisk> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let named = || {
            self.companies
                .iter()
                .map(|row| (row, row.company.trim().to_lowercase()))
                .filter(|(_, name)| !name.is_empty())
        };

        named()
            .find(|(_, name)| *name == needle)
            .or_else(|| {
                named().find(|(_, name)| name.contains(&needle) || needle.contains(name.as_str()))
            })
            .map(|(row, _)| row)
    }

    fn find_country(&self, country: &str) -> Option<&CountryRisk> {
        let needle = country.trim();
        if needle.is_empty() {
            return None;
        }
        self.countries
            .iter()
            .find(|row| row.country.trim().eq_ignore_ascii_case(needle))
    }

    pub fn country_grsi(&self, country: &str) -> Option<f64> {
        self.find_country(country).map(|row| row.grsi)
    }

    /// Company-level score, falling back to the score of the company's country.
    pub fn company_grsi(&self, query: &str) -> Option<CompanyScore> {
        let row = self.find_company(query)?;
        let grsi = row.grsi.or_else(|| self.country_grsi(&row.country))?;
        Some(CompanyScore {
            company: row.company.clone(),
            grsi,
        })
    }

    pub fn country_score(&self, country: &str) -> Option<CountryScore> {
        self.find_country(country).map(|row| CountryScore {
            country: row.country.clone(),
            grsi: row.grsi,
        })
    }
}

fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, ArtifactError> {
    let file = open_artifact(ArtifactKind::RiskTable, path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| ArtifactError::corrupt(ArtifactKind::RiskTable, path, e))
}
