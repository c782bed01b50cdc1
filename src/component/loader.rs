//! Case-file and variable-list loading
//!
//! A case file is JSON holding the global settings, the component set and
//! optional named analysis cases. Case variables may also come from a
//! separate CSV list with `name,value` rows, matching the stand-alone
//! driver-input format.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::error::EconError;
use crate::runner::AnalysisCase;
use crate::settings::GlobalSettings;

/// Parsed contents of a JSON case file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub settings: GlobalSettings,
    pub components: Vec<Component>,
    #[serde(default)]
    pub cases: Vec<AnalysisCase>,
}

/// Parse a case file from a JSON string
pub fn parse_case_file(json: &str) -> Result<CaseFile, EconError> {
    serde_json::from_str(json)
        .map_err(|e| EconError::config(format!("malformed case file: {e}")))
}

/// Load a case file from disk
pub fn load_case_file(path: &Path) -> Result<CaseFile, EconError> {
    let mut file = File::open(path)
        .map_err(|e| EconError::config(format!("cannot open {}: {e}", path.display())))?;
    let mut json = String::new();
    file.read_to_string(&mut json)
        .map_err(|e| EconError::config(format!("cannot read {}: {e}", path.display())))?;
    parse_case_file(&json)
}

/// Read a `name,value` variable list from any reader
pub fn read_variables_csv<R: Read>(reader: R) -> Result<HashMap<String, f64>, EconError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut variables = HashMap::new();

    for result in csv_reader.records() {
        let record =
            result.map_err(|e| EconError::config(format!("bad variable record: {e}")))?;
        if record.len() < 2 {
            return Err(EconError::config(format!(
                "variable record needs name and value, got {} fields",
                record.len()
            )));
        }
        let name = record[0].trim().to_string();
        let value: f64 = record[1].trim().parse().map_err(|e| {
            EconError::config(format!("variable \"{name}\" has a non-numeric value: {e}"))
        })?;
        variables.insert(name, value);
    }

    Ok(variables)
}

/// Load a `name,value` variable list from disk
pub fn load_variables_csv(path: &Path) -> Result<HashMap<String, f64>, EconError> {
    let file = File::open(path)
        .map_err(|e| EconError::config(format!("cannot open {}: {e}", path.display())))?;
    read_variables_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE_JSON: &str = r#"{
        "settings": {"discount_rate": 0.10, "tax": 0.25},
        "components": [
            {
                "name": "plant",
                "lifetime": 4,
                "cash_flows": [
                    {"name": "capex", "alpha": [-100.0, 0.0, 0.0, 0.0]},
                    {"name": "sales", "alpha": [0.0, 50.0, 50.0, 50.0],
                     "driver": "production", "taxable": true, "mult_target": true}
                ]
            }
        ],
        "cases": [
            {"name": "base", "variables": {"production": 1.0}}
        ]
    }"#;

    #[test]
    fn test_parses_case_file() {
        let case_file = parse_case_file(CASE_JSON).unwrap();
        assert_eq!(case_file.components.len(), 1);
        assert_eq!(case_file.components[0].cash_flows.len(), 2);
        assert_eq!(case_file.cases.len(), 1);
        assert_eq!(case_file.cases[0].variables["production"], 1.0);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = parse_case_file("{\"settings\": {}}").unwrap_err();
        assert!(matches!(err, EconError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_reads_variable_list() {
        let csv = "name,value\nproduction,2.5\nfuel_price, 13.0\n";
        let variables = read_variables_csv(csv.as_bytes()).unwrap();
        assert_eq!(variables["production"], 2.5);
        assert_eq!(variables["fuel_price"], 13.0);
    }

    #[test]
    fn test_rejects_non_numeric_variable() {
        let csv = "name,value\nproduction,lots\n";
        assert!(read_variables_csv(csv.as_bytes()).is_err());
    }
}
