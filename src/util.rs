/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Compute download progress as a percentage.
#[must_use]
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32) * 100.0,
        _ => 0.0,
    }
}

/// Render a byte count with a binary unit suffix.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < MIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{:.1} MB", value / MIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_speed_human_readable() {
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(2_048.0), "2.0 KB/s");
        assert_eq!(format_speed(5_242_880.0), "5.0 MB/s");
    }

    #[test]
    fn calculates_progress_percent() {
        assert_eq!(progress_percent(0, Some(10)), 0.0);
        assert_eq!(progress_percent(5, Some(10)), 50.0);
        assert_eq!(progress_percent(10, Some(10)), 100.0);
        assert_eq!(progress_percent(5, None), 0.0);
        assert_eq!(progress_percent(5, Some(0)), 0.0);
    }

    #[test]
    fn formats_byte_counts() {
        assert_eq!(format_bytes(900), "900 B");
        assert_eq!(format_bytes(1_536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
