//! Brazilian Real currency formatting and pt-BR date labels.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use time::{Date, Month};

use crate::{date::parse_date, invoice::Invoice, month::MonthKey};

/// Label shown when no usable date is available.
pub const NO_DATE_LABEL: &str = "Sem data";

/// numfmt switches to scientific notation from this magnitude on.
const NUMFMT_SCIENTIFIC_CUTOFF: f64 = 1e12;

/// Formats `number` as Brazilian Real, e.g. "R$ 1.234,56" or "-R$ 10,00".
///
/// NaN and infinities are shown as "R$ 0,00".
pub fn format_brl(number: f64) -> String {
    if !number.is_finite() {
        return "R$ 0,00".to_owned();
    }

    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let build = |prefix: &str| {
        Formatter::currency(prefix)
            .inspect_err(|error| tracing::error!("invalid currency prefix {prefix:?}: {error:?}"))
            .ok()
            .map(|formatter| formatter.precision(Precision::Decimals(2)))
    };

    let number = (number * 100.0).round() / 100.0;

    if number.abs() >= NUMFMT_SCIENTIFIC_CUTOFF {
        return group_thousands(number);
    }

    let formatted = if number < 0.0 {
        NEGATIVE_FMT
            .get_or_init(|| build("-R$ "))
            .as_ref()
            .map(|formatter| formatter.fmt_string(number.abs()))
    } else if number > 0.0 {
        POSITIVE_FMT
            .get_or_init(|| build("R$ "))
            .as_ref()
            .map(|formatter| formatter.fmt_string(number))
    } else {
        // numfmt renders zero as a bare "0"
        return "R$ 0,00".to_owned();
    };

    match formatted {
        Some(formatted) => to_brazilian_notation(&formatted),
        None => group_thousands(number),
    }
}

/// Formats `number` as Brazilian Real without numfmt.
fn group_thousands(number: f64) -> String {
    let sign = if number < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", number.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits = integer.len();
    let mut grouped = String::with_capacity(digits + digits / 3);

    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (digits - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{sign}R$ {grouped},{fraction}")
}

/// Converts "R$ 1,234.5" into "R$ 1.234,50".
///
/// numfmt drops trailing zeros, so the decimals are padded back to two digits.
fn to_brazilian_notation(formatted: &str) -> String {
    let (integer, fraction) = formatted.rsplit_once('.').unwrap_or((formatted, ""));

    format!("{},{:0<2}", integer.replace(',', "."), fraction)
}

fn month_abbreviation(month: Month) -> &'static str {
    match month {
        Month::January => "jan",
        Month::February => "fev",
        Month::March => "mar",
        Month::April => "abr",
        Month::May => "mai",
        Month::June => "jun",
        Month::July => "jul",
        Month::August => "ago",
        Month::September => "set",
        Month::October => "out",
        Month::November => "nov",
        Month::December => "dez",
    }
}

/// Short month label for chart axes, e.g. "nov/24".
pub fn month_label(month: MonthKey) -> String {
    format!(
        "{}/{:02}",
        month_abbreviation(month.month()),
        month.year().rem_euclid(100)
    )
}

/// Long month label for headings, e.g. "nov 2024".
pub fn long_month_label(month: MonthKey) -> String {
    format!("{} {}", month_abbreviation(month.month()), month.year())
}

/// Day, abbreviated month and year, e.g. "05 jun 2024".
pub fn format_date_label(date: Date) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        month_abbreviation(date.month()),
        date.year()
    )
}

/// Labels a record by the first of several candidate dates.
///
/// `primary` is formatted if it parses as a date. Otherwise the first
/// non-empty entry of `raw_fallbacks` is shown as written, and failing that
/// [NO_DATE_LABEL].
pub fn date_label_or_fallback(primary: Option<&str>, raw_fallbacks: &[Option<&str>]) -> String {
    if let Some(date) = parse_date(primary) {
        return format_date_label(date);
    }

    raw_fallbacks
        .iter()
        .flatten()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| NO_DATE_LABEL.to_owned())
}

/// The date label for an invoice: its creation date, else its reference month,
/// else the creation timestamp as written.
pub fn invoice_date_label(invoice: &Invoice) -> String {
    date_label_or_fallback(
        invoice.created_at.as_deref(),
        &[
            invoice.reference_month.as_deref(),
            invoice.created_at.as_deref(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::invoice::Invoice;

    use super::{
        NO_DATE_LABEL, date_label_or_fallback, format_brl, format_date_label, invoice_date_label,
        group_thousands, long_month_label, month_label, to_brazilian_notation,
    };

    #[test]
    fn formats_positive_amounts() {
        assert_eq!(format_brl(200.0), "R$ 200,00");
        assert_eq!(format_brl(1234.5), "R$ 1.234,50");
        assert_eq!(format_brl(1234567.75), "R$ 1.234.567,75");
    }

    #[test]
    fn formats_negative_amounts() {
        assert_eq!(format_brl(-200.0), "-R$ 200,00");
        assert_eq!(format_brl(-0.25), "-R$ 0,25");
    }

    #[test]
    fn formats_zero() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(-0.0), "R$ 0,00");
        assert_eq!(format_brl(0.001), "R$ 0,00");
    }

    #[test]
    fn large_amounts_keep_positional_notation() {
        assert_eq!(format_brl(1e12), "R$ 1.000.000.000.000,00");
        assert_eq!(format_brl(-2.5e13), "-R$ 25.000.000.000.000,00");
    }

    #[test]
    fn non_finite_amounts_are_zero() {
        assert_eq!(format_brl(f64::INFINITY), "R$ 0,00");
        assert_eq!(format_brl(f64::NEG_INFINITY), "R$ 0,00");
        assert_eq!(format_brl(f64::NAN), "R$ 0,00");
    }

    #[test]
    fn groups_thousands_by_hand() {
        assert_eq!(group_thousands(1234.5), "R$ 1.234,50");
        assert_eq!(group_thousands(-12.0), "-R$ 12,00");
        assert_eq!(group_thousands(123456.0), "R$ 123.456,00");
    }

    #[test]
    fn pads_and_swaps_separators() {
        assert_eq!(to_brazilian_notation("R$ 1,234.5"), "R$ 1.234,50");
        assert_eq!(to_brazilian_notation("R$ 12"), "R$ 12,00");
        assert_eq!(to_brazilian_notation("R$ 0.25"), "R$ 0,25");
    }

    #[test]
    fn formats_month_labels() {
        let month = "2024-11".parse().unwrap();

        assert_eq!(month_label(month), "nov/24");
        assert_eq!(long_month_label(month), "nov 2024");
        assert_eq!(month_label("2005-02".parse().unwrap()), "fev/05");
    }

    #[test]
    fn formats_date_labels() {
        assert_eq!(format_date_label(date!(2024 - 06 - 05)), "05 jun 2024");
        assert_eq!(format_date_label(date!(2024 - 12 - 25)), "25 dez 2024");
    }

    #[test]
    fn falls_back_in_declared_order() {
        assert_eq!(
            date_label_or_fallback(Some("2024-03-15"), &[Some("mar/2024")]),
            "15 mar 2024"
        );
        assert_eq!(
            date_label_or_fallback(Some("garbage"), &[None, Some(" "), Some("Março/2024")]),
            "Março/2024"
        );
        assert_eq!(date_label_or_fallback(None, &[None]), NO_DATE_LABEL);
    }

    #[test]
    fn labels_invoices() {
        let created = Invoice {
            created_at: Some("2024-10-28T12:00:00Z".to_owned()),
            reference_month: Some("Outubro/2024".to_owned()),
            ..Default::default()
        };
        let reference_only = Invoice {
            created_at: Some("ontem".to_owned()),
            reference_month: Some("Outubro/2024".to_owned()),
            ..Default::default()
        };
        let raw_timestamp = Invoice {
            created_at: Some("ontem".to_owned()),
            ..Default::default()
        };

        assert_eq!(invoice_date_label(&created), "28 out 2024");
        assert_eq!(invoice_date_label(&reference_only), "Outubro/2024");
        assert_eq!(invoice_date_label(&raw_timestamp), "ontem");
        assert_eq!(invoice_date_label(&Invoice::default()), NO_DATE_LABEL);
    }
}
