//! Human-readable durations for dashboard output.

/// Formats seconds the way the launcher's cards do: `0m` for nothing,
/// whole minutes under an hour, hours with one decimal from an hour up.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0m".to_string();
    }
    let minutes = seconds as f64 / 60.0;
    let hours = minutes / 60.0;
    if hours >= 1.0 {
        format!("{:.1}h", hours)
    } else {
        format!("{:.0}m", minutes)
    }
}
