use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{CoreError, Result};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn parse_rfc3339(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|e| CoreError::invalid_date_time(format!("Failed to parse '{s}': {e}")))
}

pub fn format_rfc3339(datetime: &OffsetDateTime) -> Result<String> {
    datetime
        .format(&Rfc3339)
        .map_err(|e| CoreError::invalid_date_time(format!("Failed to format {datetime}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse_rfc3339("2024-03-01T09:15:00Z").unwrap();
        assert_eq!(parsed, datetime!(2024-03-01 09:15:00 UTC));
    }

    #[test]
    fn test_parse_rfc3339_invalid() {
        let err = parse_rfc3339("yesterday").unwrap_err();
        assert!(matches!(err, CoreError::InvalidDateTime(_)));
    }

    #[test]
    fn test_format_rfc3339() {
        let dt = datetime!(2024-03-01 09:15:00 UTC);
        assert_eq!(format_rfc3339(&dt).unwrap(), "2024-03-01T09:15:00Z");
    }
}
