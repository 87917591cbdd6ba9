//! Presentation units
//!
//! Stored quantities are metric tons. Conversions happen here, on the way out.

/// Metric tons per million metric tons
pub const MMT_DIVISOR: f64 = 1_000_000.0;

/// Million metric tons, rounded to two decimals. Null totals read as zero.
pub fn to_mmt(tons: Option<f64>) -> f64 {
    let mmt = tons.unwrap_or(0.0) / MMT_DIVISOR;
    (mmt * 100.0).round() / 100.0
}

/// Whole metric tons. Null totals read as zero.
pub fn to_tons(tons: Option<f64>) -> i64 {
    tons.map_or(0, |t| t.round() as i64)
}

/// `1234567.891` with 2 decimals -> `1,234,567.89`
pub fn grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + whole.len() / 3 + 1);
    if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}
