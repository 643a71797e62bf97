use crate::error::{SizeError, SizeResult};

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
const PREFIXES: [&str; 7] = ["", "K", "M", "G", "T", "P", "E"];

/// Formats a byte count with binary units and the given number of decimals.
///
/// # Example
///
/// ```
/// use runway_utils::bytes::format_bytes;
///
/// assert_eq!(format_bytes(3 * 1024 * 1024 / 2, 1), "1.5 MiB");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let mut value = bytes as f64;
    let mut idx = 0;

    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    format!("{value:.precision$} {}", UNITS[idx])
}

/// Parses the short size notation used for swap files (`2G`, `512M`, `1024K`).
///
/// Suffixes are single letters with binary multipliers. A trailing `B` is
/// tolerated (`2GB` is 2 GiB). A plain integer is a byte count.
///
/// # Example
///
/// ```
/// use runway_utils::bytes::parse_size;
///
/// assert_eq!(parse_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
/// assert_eq!(parse_size("512m").unwrap(), 512 * 1024 * 1024);
/// ```
pub fn parse_size(s: &str) -> SizeResult<u64> {
    let upper = s.trim().to_uppercase();
    if upper.is_empty() {
        return Err(SizeError::Empty);
    }

    if let Ok(v) = upper.parse::<u64>() {
        return Ok(v);
    }

    let body = upper.strip_suffix('B').unwrap_or(&upper);
    if body.is_empty() || !body.ends_with(|c: char| PREFIXES.iter().any(|p| p.starts_with(c))) {
        return Err(SizeError::MissingUnit {
            input: s.to_string(),
        });
    }

    scale(body).ok_or_else(|| {
        SizeError::InvalidNumber {
            input: s.to_string(),
        }
    })
}

fn scale(body: &str) -> Option<u64> {
    PREFIXES.iter().enumerate().rev().find_map(|(exp, prefix)| {
        let num = body.strip_suffix(prefix)?.trim();
        let n = num.parse::<f64>().ok()?;
        if !n.is_finite() || n < 0.0 {
            return None;
        }
        Some((n * 1024_f64.powi(exp as i32)).round() as u64)
    })
}
