//! Life table: expected remaining annuity payment months by age and sex
//!
//! Loaded from a CSV with columns `age,M,F`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::program::Sex;

/// Raw CSV row
#[derive(Debug, Deserialize)]
struct CsvRow {
    age: u32,
    #[serde(rename = "M")]
    male: f64,
    #[serde(rename = "F")]
    female: f64,
}

/// Annuity months per (male, female), keyed by age
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeTable {
    months: BTreeMap<u32, (f64, f64)>,
}

impl LifeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a life table from a CSV file
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_reader(File::open(path)?)
    }

    /// Load a life table from any reader (e.g., string buffer)
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut table = Self::new();

        for result in csv_reader.deserialize() {
            let row: CsvRow = result?;
            table.insert(row.age, row.male, row.female);
        }

        Ok(table)
    }

    pub fn insert(&mut self, age: u32, male_months: f64, female_months: f64) {
        self.months.insert(age, (male_months, female_months));
    }

    /// Expected remaining annuity months at `age`, if tabulated
    pub fn annuity_months(&self, age: u32, sex: Sex) -> Option<f64> {
        self.months.get(&age).map(|&(male, female)| match sex {
            Sex::Male => male,
            Sex::Female => female,
        })
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}
