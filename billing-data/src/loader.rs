use std::collections::HashSet;
use std::io::Read;

use billing_core::{BillingRepository, NewShift, RepositoryError, ShiftStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when importing a shift roster.
#[derive(Debug, Error)]
pub enum RosterLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid shift status: {0}")]
    InvalidStatus(String),

    #[error("Contact {0} not found in database (have you created the contacts?)")]
    ContactNotFound(i64),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for RosterLoaderError {
    fn from(err: csv::Error) -> Self {
        RosterLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from a shift roster CSV export.
///
/// Expected columns:
/// - `contact_id`: the contact the shift was worked for
/// - `start_time` / `end_time`: RFC 3339 instants (UTC)
/// - `status`: `scheduled`, `completed` or `cancelled` (any casing)
/// - `total_incl_gst`: the completed total (empty for unpriced shifts)
/// - `description`: free text (may be empty)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RosterRecord {
    pub contact_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub total_incl_gst: Option<Decimal>,
    #[serde(default)]
    pub description: String,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn parse_status(raw: &str) -> Result<ShiftStatus, RosterLoaderError> {
    ShiftStatus::parse(raw.trim().to_lowercase().as_str())
        .ok_or_else(|| RosterLoaderError::InvalidStatus(raw.to_string()))
}

/// Loader for shift rosters exported as CSV.
///
/// Records are inserted through the `BillingRepository` trait, so the
/// loader works with any database backend.
pub struct RosterLoader;

impl RosterLoader {
    /// Parse roster records from a CSV reader.
    ///
    /// The reader can be any type that implements `Read`, such as a
    /// file or a string slice.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<RosterRecord>, RosterLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: RosterRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Load roster records into the database. Returns the number of
    /// shifts inserted.
    ///
    /// Every referenced contact is verified once before any of its
    /// shifts are written, so a roster for an unknown contact fails
    /// with a message naming the contact rather than a foreign-key
    /// error.
    pub async fn load<R: BillingRepository>(
        repo: &R,
        records: &[RosterRecord],
    ) -> Result<usize, RosterLoaderError> {
        let mut verified_contacts: HashSet<i64> = HashSet::new();
        let mut inserted = 0;

        for record in records {
            if !verified_contacts.contains(&record.contact_id) {
                repo.get_contact(record.contact_id)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => {
                            RosterLoaderError::ContactNotFound(record.contact_id)
                        }
                        other => RosterLoaderError::Repository(other),
                    })?;
                verified_contacts.insert(record.contact_id);
            }

            let status = parse_status(&record.status)?;
            let shift = repo
                .insert_shift(NewShift {
                    contact_id: record.contact_id,
                    start_time: record.start_time,
                    end_time: record.end_time,
                    status,
                    description: record.description.clone(),
                    total_incl_gst: record.total_incl_gst,
                })
                .await?;
            debug!(
                shift_id = shift.id,
                contact_id = shift.contact_id,
                "roster shift imported"
            );
            inserted += 1;
        }

        Ok(inserted)
    }
}
