/// Format of the fixed-width minute-resolution stamp used throughout the
/// data model: `YYYYMMDDHHMM`, always 12 digits.
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Current local time as a `YYYYMMDDHHMM` stamp.
///
/// Generation markers record the local clock, not UTC.
pub fn now_stamp() -> String {
    chrono::Local::now().format(STAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_stamp_shape() {
        let stamp = now_stamp();
        assert_eq!(stamp.len(), 12);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_stamp_format_is_minute_resolution() {
        let dt = chrono::DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(dt.format(STAMP_FORMAT).to_string(), "197001010000");
    }
}
