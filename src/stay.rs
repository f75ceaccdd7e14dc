// Stay dates: parsing of user-entered check-in/check-out and night counting

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    CheckIn,
    CheckOut,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::CheckIn => f.write_str("checkIn"),
            Field::CheckOut => f.write_str("checkOut"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

// Validation failure keyed by field, one entry per offending field
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid stay dates: {}", describe(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

/// Number of nights billed for a stay.
///
/// Dates carry no time of day, so the ceiling of the day difference is the
/// day difference itself. Zero or negative spans are floored to one night.
// Half-open [check_in, check_out) intersection. Back-to-back stays do not touch.
pub fn intervals_overlap(
    a_in: NaiveDate,
    a_out: NaiveDate,
    b_in: NaiveDate,
    b_out: NaiveDate,
) -> bool {
    a_in < b_out && b_in < a_out
}

pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
    let days = (check_out - check_in).num_days();
    days.max(1) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDates {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayDates {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self { check_in, check_out }
    }

    // Parse YYYY-MM-DD inputs, collecting an error for every field that fails
    pub fn parse(check_in: &str, check_out: &str) -> Result<Self, ValidationError> {
        let mut errors = Vec::new();
        let check_in = parse_field(Field::CheckIn, check_in, &mut errors);
        let check_out = parse_field(Field::CheckOut, check_out, &mut errors);

        match (check_in, check_out) {
            (Some(check_in), Some(check_out)) => Ok(Self { check_in, check_out }),
            _ => Err(ValidationError { errors }),
        }
    }

    // Parse and additionally require check-out strictly after check-in
    pub fn parse_ordered(check_in: &str, check_out: &str) -> Result<Self, ValidationError> {
        let stay = Self::parse(check_in, check_out)?;
        if !stay.is_well_ordered() {
            return Err(ValidationError {
                errors: vec![FieldError {
                    field: Field::CheckOut,
                    message: "must be after check-in".to_string(),
                }],
            });
        }
        Ok(stay)
    }

    pub fn nights(&self) -> u32 {
        nights(self.check_in, self.check_out)
    }

    pub fn is_well_ordered(&self) -> bool {
        self.check_out > self.check_in
    }

}

impl fmt::Display for StayDates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.check_in.format(DATE_FORMAT),
            self.check_out.format(DATE_FORMAT)
        )
    }
}

fn parse_field(field: Field, raw: &str, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push(FieldError {
            field,
            message: "is required".to_string(),
        });
        return None;
    }

    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            errors.push(FieldError {
                field,
                message: format!("'{}' is not a valid date ({})", raw, e),
            });
            None
        }
    }
}
