use chrono::{DateTime, SecondsFormat, Utc};

pub fn format_optional_str(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_address(address: &str, port: u16) -> String {
    if address.trim().is_empty() {
        return "-".to_string();
    }
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
