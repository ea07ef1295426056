use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

use crate::errors::AppError;

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|err| {
        let mut fields: Vec<String> = err.field_errors().keys().map(|field| camel_case(field)).collect();
        fields.sort();
        AppError::Validation {
            message: "Missing required fields".to_string(),
            fields,
        }
    })
}

/// Accepts a plain `YYYY-MM-DD` date or an RFC 3339 timestamp, which is
/// reduced to its UTC calendar date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| AppError::BadRequest(format!("Invalid date for {}: {}", field, value)))
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates() {
        let date = parse_date("dateOfBirth", "1990-01-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        let date = parse_date("dateOfJoining", "2021-01-01T02:00:00+05:30").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_date("dateOfJoining", "next tuesday"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn field_names_are_reported_in_camel_case() {
        assert_eq!(camel_case("date_of_joining"), "dateOfJoining");
        assert_eq!(camel_case("name"), "name");
    }
}
