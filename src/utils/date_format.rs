use serde::{self, Deserialize, Deserializer, Serializer};
use time::{Date, OffsetDateTime, macros::format_description};

// Parses a calendar date, also accepting datetime strings and keeping only the date part
pub fn parse_api_date(date_str: &str) -> Result<Date, String> {
    let date_str = date_str.trim();
    let format = format_description!("[year]-[month]-[day]");

    // If the string contains a 'T', it might be a datetime string - extract just the date part
    if date_str.contains('T')
        && let Some(date_part) = date_str.split('T').next()
        && let Ok(date) = Date::parse(date_part, &format)
    {
        return Ok(date);
    }

    Date::parse(date_str, &format).map_err(|e| format!("Failed to parse date '{date_str}': {e}"))
}

// Parses the timestamp formats the Peppol API returns in `createdAt`
pub fn parse_api_datetime(datetime_str: &str) -> Result<OffsetDateTime, String> {
    let datetime_str = datetime_str.trim();

    // Standard RFC3339
    let rfc3339 = time::format_description::well_known::Rfc3339;
    if let Ok(dt) = OffsetDateTime::parse(datetime_str, &rfc3339) {
        return Ok(dt);
    }

    let has_offset = datetime_str.contains('+') || datetime_str.ends_with('Z');

    // Fractional seconds but no timezone (assume UTC)
    // e.g. "2025-11-20T06:17:25.844847"
    if datetime_str.contains('T') && datetime_str.contains('.') && !has_offset {
        let format =
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
        if let Ok(dt) = time::PrimitiveDateTime::parse(datetime_str, &format) {
            return Ok(dt.assume_utc());
        }
    }

    // ISO format with T but no fractional seconds and no timezone
    if datetime_str.contains('T') && !datetime_str.contains('.') && !has_offset {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        if let Ok(dt) = time::PrimitiveDateTime::parse(datetime_str, &format) {
            return Ok(dt.assume_utc());
        }
    }

    // Plain date, midnight UTC
    if !datetime_str.contains('T') {
        let format = format_description!("[year]-[month]-[day]");
        if let Ok(date) = Date::parse(datetime_str, &format) {
            return Ok(date.midnight().assume_utc());
        }
    }

    Err(format!("Failed to parse datetime '{datetime_str}': no matching format"))
}

/// Formats a date as `YYYY-MM-DD`, the way it is printed in reports.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
#[must_use]
pub fn format_datetime(datetime: OffsetDateTime) -> String {
    datetime
        .to_offset(time::UtcOffset::UTC)
        .format(&format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| datetime.to_string())
}

// Date-time serialization for `createdAt` attributes
pub mod api_datetime_format {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = datetime
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let datetime_str = String::deserialize(deserializer)?;
        super::parse_api_datetime(&datetime_str).map_err(serde::de::Error::custom)
    }
}

// Optional OffsetDateTime serialization
pub mod api_datetime_format_option {
    use super::{Deserialize, Deserializer, Serializer, serde};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(datetime: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match datetime {
            Some(dt) => {
                let formatted = dt.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;

        match opt {
            Some(s) if !s.is_empty() => match super::parse_api_datetime(&s) {
                Ok(dt) => Ok(Some(dt)),
                Err(_) => Ok(None), // Return None if parsing fails
            },
            _ => Ok(None),
        }
    }
}
