use crate::error::Result;
use std::path::Path;
use std::time::Duration;

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// "fresh" / "expired" label for a cache entry of the given age
pub fn freshness(age: Duration, ttl: Duration) -> &'static str {
    if age < ttl {
        "fresh"
    } else {
        "expired"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
        assert_eq!(format_duration(Duration::from_millis(7_200_900)), "2h 0m 0s");
    }

    #[test]
    fn test_freshness() {
        let ttl = Duration::from_secs(3600);
        assert_eq!(freshness(Duration::from_secs(10), ttl), "fresh");
        assert_eq!(freshness(ttl, ttl), "expired");
    }

    #[test]
    fn test_ensure_dir() {
        use tempfile::TempDir;
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("a").join("b");

        assert!(ensure_dir(&test_dir).is_ok());
        assert!(test_dir.is_dir());
        // Idempotent
        assert!(ensure_dir(&test_dir).is_ok());
    }
}
