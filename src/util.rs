// Formatting and small numeric helpers shared by the views.
//
// Everything the stat cards, tables and tooltips print goes through here so
// grouping, decimals and currency placement stay consistent across views.
use chrono::{DateTime, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Parse a date that may be a bare `YYYY-MM-DD`, a full RFC 3339 timestamp,
/// or the `DD/MM/YYYY` form used by the map's recent-contract lists.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() {
        return 0.0;
    }
    let p = part / whole * 100.0;
    if p.is_finite() {
        p
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with `1,234,567.89` style grouping on the integer part.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Currency amount with grouping. Pesos print with a bare `$`, anything else
/// is prefixed with its ISO code, matching the es-MX rendering.
pub fn format_currency(amount: f64, currency: &str, decimals: usize) -> String {
    let body = format_number(amount.abs(), decimals);
    let sign = if amount < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    if currency == "MXN" {
        format!("{sign}${body}")
    } else {
        format!("{sign}{currency} {body}")
    }
}

/// One decimal place and a trailing `%`.
pub fn format_percent(p: f64) -> String {
    format!("{:.1}%", p)
}

/// Share of a grand total with precision that grows as the share shrinks,
/// so tiny currencies still show a non-zero figure.
pub fn format_share(p: f64) -> String {
    if p < 0.001 {
        // Exponent always signed: `5.00e-4`, `0.00e+0`.
        let sci = format!("{:.2e}", p);
        return match sci.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => sci,
        };
    }
    let digits = if p < 0.01 {
        4
    } else if p < 0.1 {
        3
    } else if p < 1.0 {
        2
    } else {
        1
    };
    format!("{:.*}", digits, p)
}

/// Names longer than 25 characters become their first 22 plus `...`.
pub fn truncate_label(name: &str) -> String {
    if name.chars().count() > 25 {
        let head: String = name.chars().take(22).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Spanish label for a contract status code; unknown codes pass through.
pub fn translate_status(status: &str) -> String {
    let label = match status {
        "active" => "Activo",
        "pending" => "Pendiente",
        "cancelled" => "Cancelado",
        "terminated" => "Terminado",
        "planning" => "Planeación",
        "planned" => "Planeado",
        "unsuccessful" => "Sin éxito",
        "complete" => "Completado",
        "withdrawn" => "Retirado",
        "" => "Desconocido",
        other => other,
    };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(0.0, 1), "0.0");
        assert_eq!(format_int(9855u64), "9,855");
    }

    #[test]
    fn currency_placement() {
        assert_eq!(format_currency(98195.03, "MXN", 0), "$98,195");
        assert_eq!(format_currency(1250.5, "USD", 2), "USD 1,250.50");
        assert_eq!(format_currency(-10.0, "MXN", 0), "-$10");
    }

    #[test]
    fn percent_guards_zero_totals() {
        assert_eq!(percent_of(5.0, 0.0), 0.0);
        assert!((percent_of(1.0, 3.0) - 33.333).abs() < 0.001);
        assert_eq!(format_percent(76.84), "76.8%");
    }

    #[test]
    fn share_precision_adapts() {
        assert_eq!(format_share(45.678), "45.7");
        assert_eq!(format_share(0.5), "0.50");
        assert_eq!(format_share(0.05), "0.050");
        assert_eq!(format_share(0.005), "0.0050");
        assert_eq!(format_share(0.0005), "5.00e-4");
        assert_eq!(format_share(0.0), "0.00e+0");
    }

    #[test]
    fn truncates_long_names() {
        assert_eq!(truncate_label("Constructora Hernández S.A."), "Constructora Hernández...");
        assert_eq!(truncate_label("TechSolutions Inc."), "TechSolutions Inc.");
        let exactly_25 = "a".repeat(25);
        assert_eq!(truncate_label(&exactly_25), exactly_25);
    }

    #[test]
    fn dates_in_all_source_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 18);
        assert_eq!(parse_date_safe(Some("2025-03-18")), d);
        assert_eq!(parse_date_safe(Some("2025-03-18T08:30:00Z")), d);
        assert_eq!(parse_date_safe(Some("18/03/2025")), d);
        assert_eq!(parse_date_safe(Some("soon")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn status_translation() {
        assert_eq!(translate_status("active"), "Activo");
        assert_eq!(translate_status("mystery"), "mystery");
        assert_eq!(translate_status(""), "Desconocido");
    }
}
