//! Elapsed time formatting

/// Format a number of seconds as zero-padded `HH:MM:SS`.
///
/// The hours field is at least two digits wide and keeps growing past 99.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
