use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

pub fn get_utc_iso_datetime() -> String {
    let timestamp = chrono::Utc::now().to_rfc3339();
    return timestamp;
}

/// Convert an Excel serial date (days since 1899-12-30, fractional part = time of day)
/// to Unix epoch seconds. Returns `None` for serials that fall outside chrono's range.
pub fn excel_serial_to_epoch(serial: f64) -> Option<i64> {
    if !serial.is_finite() {
        return None;
    }
    let excel_base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial - days as f64) * 86400.0).round() as i64;
    let datetime = excel_base
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::try_seconds(seconds)?)?;
    Some(datetime.and_utc().timestamp())
}

/// Parse a textual date or date-time into Unix epoch seconds (naive values are taken as UTC).
pub fn parse_datetime_to_epoch(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.and_utc().timestamp());
        }
    }

    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_serial_to_epoch() {
        // 1970-01-01 is serial 25569
        assert_eq!(excel_serial_to_epoch(25569.0), Some(0));
        // 2023-11-14 22:13:20 UTC
        assert_eq!(excel_serial_to_epoch(45244.92592592593), Some(1_700_000_000));
        assert_eq!(excel_serial_to_epoch(f64::NAN), None);
    }

    #[test]
    fn test_parse_datetime_to_epoch() {
        assert_eq!(parse_datetime_to_epoch("1970-01-02"), Some(86_400));
        assert_eq!(
            parse_datetime_to_epoch("2023-11-14 22:13:20"),
            Some(1_700_000_000)
        );
        assert_eq!(
            parse_datetime_to_epoch("2023-11-14T22:13:20Z"),
            Some(1_700_000_000)
        );
        assert_eq!(parse_datetime_to_epoch("not a date"), None);
        assert_eq!(parse_datetime_to_epoch(""), None);
    }
}
