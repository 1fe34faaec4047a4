// Output formatting — TSV export and terminal display.

pub mod terminal;
pub mod tsv;

/// Marker written wherever a numeric value is unavailable.
pub const NA: &str = "NA";

/// Format a value with 4 decimals, or the NA marker.
///
/// Never prints an empty field or a stand-in zero for a missing value.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.4}"),
        _ => NA.to_string(),
    }
}
