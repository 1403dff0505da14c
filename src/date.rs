//! Lenient parsing of the date strings found in statement transactions.
//!
//! Upstream statements mix Brazilian `DD/MM/YYYY` dates with ISO 8601 dates
//! and date-times. Anything that cannot be read as a calendar date becomes
//! `None` instead of an error so that one bad row never breaks a chart.

use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

/// Parses `text` as either `DD/MM/YYYY` or an ISO 8601 date/date-time.
///
/// Returns `None` for absent, empty or unparseable input, including
/// impossible calendar dates such as `32/13/2024`.
pub fn parse_date(text: Option<&str>) -> Option<Date> {
    let text = text?.trim();

    if text.is_empty() {
        return None;
    }

    if text.contains('/') {
        parse_day_month_year(text)
    } else {
        parse_iso(text)
    }
}

fn parse_day_month_year(text: &str) -> Option<Date> {
    let parts: Vec<&str> = text.split('/').collect();

    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    let day: u8 = day.trim().parse().ok()?;
    let month: u8 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;

    let month = Month::try_from(month).ok()?;

    Date::from_calendar_date(year, month, day).ok()
}

fn parse_iso(text: &str) -> Option<Date> {
    let date_format = format_description!("[year]-[month]-[day]");
    let date_time_format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let date_time_subsecond_format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

    if let Ok(date) = Date::parse(text, date_format) {
        return Some(date);
    }

    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(date_time.date());
    }

    PrimitiveDateTime::parse(text, date_time_format)
        .or_else(|_| PrimitiveDateTime::parse(text, date_time_subsecond_format))
        .map(|date_time| date_time.date())
        .ok()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::parse_date;

    #[test]
    fn parses_day_month_year() {
        assert_eq!(parse_date(Some("15/03/2024")), Some(date!(2024 - 03 - 15)));
    }

    #[test]
    fn parses_single_digit_day_and_month() {
        assert_eq!(parse_date(Some("1/6/2024")), Some(date!(2024 - 06 - 01)));
    }

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_date(Some("2024-03-15")), Some(date!(2024 - 03 - 15)));
    }

    #[test]
    fn parses_iso_date_times() {
        assert_eq!(
            parse_date(Some("2024-03-15T10:30:00Z")),
            Some(date!(2024 - 03 - 15))
        );
        assert_eq!(
            parse_date(Some("2024-03-15T10:30:00-03:00")),
            Some(date!(2024 - 03 - 15))
        );
        assert_eq!(
            parse_date(Some("2024-03-15T10:30:00")),
            Some(date!(2024 - 03 - 15))
        );
        assert_eq!(
            parse_date(Some("2024-03-15T10:30:00.123")),
            Some(date!(2024 - 03 - 15))
        );
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_date(Some("32/13/2024")), None);
        assert_eq!(parse_date(Some("31/02/2024")), None);
        assert_eq!(parse_date(Some("2024-02-30")), None);
    }

    #[test]
    fn rejects_wrong_number_of_parts() {
        assert_eq!(parse_date(Some("15/03")), None);
        assert_eq!(parse_date(Some("15/03/2024/1")), None);
    }

    #[test]
    fn rejects_empty_and_absent_input() {
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("   ")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(Some("ontem")), None);
        assert_eq!(parse_date(Some("aa/bb/cccc")), None);
    }
}
