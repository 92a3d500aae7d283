//! Typed registry records: the raw CSV row and the cleaned dataset record.

use serde::Deserialize;

/// One row of the registry bulk CSV, with the original Norwegian column names.
///
/// Every field is optional text; validation and coercion happen when the row
/// is promoted to a [`CleanRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntity {
    /// Organisation number, the unique entity identifier.
    #[serde(rename = "organisasjonsnummer")]
    pub organisation_number: Option<String>,
    /// Registered entity name.
    #[serde(rename = "navn")]
    pub name: Option<String>,
    /// Organisation form code.
    #[serde(rename = "organisasjonsform.kode")]
    pub org_form_code: Option<String>,
    /// Primary NACE industry code.
    #[serde(rename = "naeringskode1.kode")]
    pub nace_code: Option<String>,
    /// Norwegian description of the primary NACE code.
    #[serde(rename = "naeringskode1.beskrivelse")]
    pub nace_description: Option<String>,
    /// Company web site.
    #[serde(rename = "hjemmeside")]
    pub website: Option<String>,
    /// Date of incorporation.
    #[serde(rename = "stiftelsesdato")]
    pub date_of_incorporation: Option<String>,
    /// Employee head count as unparsed text.
    #[serde(rename = "antallAnsatte")]
    pub number_of_employees: Option<String>,
    /// Institutional sector code.
    #[serde(rename = "institusjonellSektorkode.kode")]
    pub sector_code: Option<String>,
    /// Norwegian description of the institutional sector.
    #[serde(rename = "institusjonellSektorkode.beskrivelse")]
    pub sector_description: Option<String>,
    /// Free-text description of company activity.
    #[serde(rename = "aktivitet")]
    pub activity: Option<String>,
    /// Statutory company purpose.
    #[serde(rename = "vedtektsfestetFormaal")]
    pub statutory_purpose: Option<String>,
    /// `"true"` when the entity is bankrupt.
    #[serde(rename = "konkurs")]
    pub bankrupt: Option<String>,
    /// `"true"` when the entity is in the register of business enterprises.
    #[serde(rename = "registrertIForetaksregisteret")]
    pub in_enterprise_register: Option<String>,
}

/// A cleaned, renamed dataset record.
///
/// `orgnr` and `nace_21_code` are validated at ingestion; the English
/// description fields are filled by the Klass label join and stay `None` for
/// codes the classification service does not resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    /// Organisation number; unique within a snapshot.
    pub orgnr: String,
    /// Registered company name.
    pub company_name: Option<String>,
    /// Free-text description of company activity.
    pub company_activity: Option<String>,
    /// Statutory company purpose.
    pub company_purpose: Option<String>,
    /// Employee head count.
    pub number_of_employees: Option<i64>,
    /// Organisation form code.
    pub orgform: Option<String>,
    /// English organisation form label from Klass.
    pub orgform_description_en: Option<String>,
    /// Date of incorporation.
    pub date_of_incorporation: Option<String>,
    /// Company web site.
    pub website: Option<String>,
    /// Institutional sector code.
    pub sector_code: Option<String>,
    /// Norwegian institutional sector description.
    pub sector_description_nb: Option<String>,
    /// English institutional sector label from Klass.
    pub sector_description_en: Option<String>,
    /// Primary NACE code; the stratification column.
    pub nace_21_code: String,
    /// Norwegian NACE description.
    pub nace_21_description_nb: Option<String>,
    /// English NACE label from Klass.
    pub nace_21_description_en: Option<String>,
}

/// Why a raw row was removed during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The entity is bankrupt, or its bankruptcy flag is missing.
    Bankrupt,
    /// The entity is not in the register of business enterprises.
    NotRegistered,
    /// The organisation number or NACE code is missing.
    MissingFields,
}

impl RawEntity {
    /// Promote a raw row to a clean record, or report why it was dropped.
    pub(crate) fn into_clean(self) -> Result<CleanRecord, DropReason> {
        if self.bankrupt.as_deref() != Some("false") {
            return Err(DropReason::Bankrupt);
        }
        if self.in_enterprise_register.as_deref() != Some("true") {
            return Err(DropReason::NotRegistered);
        }
        let orgnr = non_empty(self.organisation_number).ok_or(DropReason::MissingFields)?;
        let nace_21_code = non_empty(self.nace_code).ok_or(DropReason::MissingFields)?;
        Ok(CleanRecord {
            orgnr,
            company_name: non_empty(self.name),
            company_activity: non_empty(self.activity),
            company_purpose: non_empty(self.statutory_purpose),
            number_of_employees: self
                .number_of_employees
                .as_deref()
                .and_then(|text| text.trim().parse::<i64>().ok()),
            orgform: non_empty(self.org_form_code),
            orgform_description_en: None,
            date_of_incorporation: non_empty(self.date_of_incorporation),
            website: non_empty(self.website),
            sector_code: non_empty(self.sector_code),
            sector_description_nb: non_empty(self.sector_description),
            sector_description_en: None,
            nace_21_code,
            nace_21_description_nb: non_empty(self.nace_description),
            nace_21_description_en: None,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
