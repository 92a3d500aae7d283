//! Client for the SSB Klass classification service.
//!
//! Fetches code→label mappings for a classification at a chosen hierarchy
//! level and language, and joins them onto cleaned records. A code the
//! service does not resolve simply leaves the label missing.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::http_client;
use crate::registry::CleanRecord;

/// Production base URL of the Klass API.
pub const KLASS_BASE_URL: &str = "https://data.ssb.no/api/klass/v1";

/// NACE industry classification (level 5 holds the full five-digit codes).
pub const NACE: (u32, u8) = (6, 5);
/// Institutional sector classification.
pub const SECTOR: (u32, u8) = (39, 3);
/// Organisation form classification.
pub const ORG_FORM: (u32, u8) = (35, 1);

/// Errors that can occur while talking to the classification service.
#[derive(Debug, Error)]
pub enum KlassError {
    /// The HTTP request failed or the payload could not be decoded.
    #[error("Klass request to {url} failed: {message}")]
    Http { url: String, message: String },
}

/// A classification lookup: which classification, which level, which
/// language, and the as-of date for the code version.
#[derive(Debug, Clone)]
pub struct ClassificationQuery {
    /// Klass classification identifier.
    pub classification_id: u32,
    /// Hierarchy level to select codes from.
    pub level: u8,
    /// Label language, e.g. `en`.
    pub language: String,
    /// As-of date in `YYYY-MM-DD` form.
    pub date: String,
}

impl ClassificationQuery {
    /// Lookup for a `(classification_id, level)` pair with English labels.
    pub fn english((classification_id, level): (u32, u8), date: &str) -> Self {
        Self {
            classification_id,
            level,
            language: "en".to_string(),
            date: date.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodesResponse {
    codes: Vec<CodeEntry>,
}

#[derive(Debug, Deserialize)]
struct CodeEntry {
    code: String,
    name: String,
}

/// Fetch the code→label mapping for a classification query.
pub fn fetch_code_labels(
    base_url: &str,
    query: &ClassificationQuery,
) -> Result<BTreeMap<String, String>, KlassError> {
    let url = format!(
        "{base_url}/classifications/{}/codesAt.json?date={}&language={}&selectLevel={}",
        query.classification_id, query.date, query.language, query.level
    );
    let response = http_client::agent()
        .get(&url)
        .set("User-Agent", http_client::USER_AGENT)
        .set("Accept", "application/json")
        .call()
        .map_err(|err| KlassError::Http {
            url: url.clone(),
            message: err.to_string(),
        })?;
    let decoded: CodesResponse = response.into_json().map_err(|err| KlassError::Http {
        url: url.clone(),
        message: err.to_string(),
    })?;
    tracing::debug!(
        "Fetched {} codes for classification {} level {}",
        decoded.codes.len(),
        query.classification_id,
        query.level
    );
    Ok(decoded
        .codes
        .into_iter()
        .map(|entry| (entry.code, entry.name))
        .collect())
}

/// English label maps for the three classifications joined onto records.
#[derive(Debug, Clone, Default)]
pub struct LabelMaps {
    /// NACE code → English description.
    pub nace: BTreeMap<String, String>,
    /// Sector code → English description.
    pub sector: BTreeMap<String, String>,
    /// Organisation form code → English description.
    pub org_form: BTreeMap<String, String>,
}

impl LabelMaps {
    /// Fetch all three label maps as of `date`.
    pub fn fetch(base_url: &str, date: &str) -> Result<Self, KlassError> {
        Ok(Self {
            nace: fetch_code_labels(base_url, &ClassificationQuery::english(NACE, date))?,
            sector: fetch_code_labels(base_url, &ClassificationQuery::english(SECTOR, date))?,
            org_form: fetch_code_labels(base_url, &ClassificationQuery::english(ORG_FORM, date))?,
        })
    }
}

/// Join English labels onto records in place.
///
/// Codes absent from a map leave the corresponding label `None`.
pub fn apply_labels(records: &mut [CleanRecord], labels: &LabelMaps) {
    for record in records {
        record.nace_21_description_en = labels.nace.get(&record.nace_21_code).cloned();
        record.sector_description_en = record
            .sector_code
            .as_ref()
            .and_then(|code| labels.sector.get(code))
            .cloned();
        record.orgform_description_en = record
            .orgform
            .as_ref()
            .and_then(|code| labels.org_form.get(code))
            .cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_support::serve_once;

    fn record(nace: &str, sector: Option<&str>, orgform: Option<&str>) -> CleanRecord {
        CleanRecord {
            orgnr: "1".to_string(),
            company_name: None,
            company_activity: None,
            company_purpose: None,
            number_of_employees: None,
            orgform: orgform.map(str::to_string),
            orgform_description_en: None,
            date_of_incorporation: None,
            website: None,
            sector_code: sector.map(str::to_string),
            sector_description_nb: None,
            sector_description_en: None,
            nace_21_code: nace.to_string(),
            nace_21_description_nb: None,
            nace_21_description_en: None,
        }
    }

    #[test]
    fn parses_codes_payload_shape() {
        let json = r#"
        {
          "codes": [
            { "code": "62.010", "name": "Computer programming activities", "level": "5" },
            { "code": "47.111", "name": "Retail sale in non-specialised stores" }
          ]
        }"#;
        let parsed: CodesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.codes.len(), 2);
        assert_eq!(parsed.codes[0].code, "62.010");
    }

    #[test]
    fn fetches_codes_into_a_map() {
        let body = r#"{"codes":[
            {"code":"62.010","name":"Computer programming activities"},
            {"code":"47.111","name":"Retail sale in non-specialised stores"}
        ]}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let base = serve_once(response);
        let query = ClassificationQuery::english(NACE, "2026-01-01");
        let labels = fetch_code_labels(&base, &query).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(
            labels.get("62.010").map(String::as_str),
            Some("Computer programming activities")
        );
    }

    #[test]
    fn http_failure_is_reported() {
        let base = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string());
        let query = ClassificationQuery::english(SECTOR, "2026-01-01");
        let err = fetch_code_labels(&base, &query).unwrap_err();
        assert!(matches!(err, KlassError::Http { .. }));
    }

    #[test]
    fn join_leaves_unresolved_codes_unlabeled() {
        let mut labels = LabelMaps::default();
        labels.nace.insert("62.010".to_string(), "Programming".to_string());
        labels.org_form.insert("AS".to_string(), "Limited company".to_string());

        let mut records = vec![
            record("62.010", Some("2100"), Some("AS")),
            record("99.999", None, Some("ENK")),
        ];
        apply_labels(&mut records, &labels);

        assert_eq!(records[0].nace_21_description_en.as_deref(), Some("Programming"));
        assert_eq!(records[0].orgform_description_en.as_deref(), Some("Limited company"));
        assert_eq!(records[0].sector_description_en, None);
        assert_eq!(records[1].nace_21_description_en, None);
        assert_eq!(records[1].orgform_description_en, None);
    }
}
