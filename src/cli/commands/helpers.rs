//! Shared helper functions for CLI commands.

/// Shorten `s` to at most `max` characters, keeping the end.
///
/// File paths differ mostly in their tails, so the head is dropped.
pub fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let tail: String = s.chars().skip(len - keep).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_unchanged() {
        assert_eq!(truncate("a.jpg", 10), "a.jpg");
    }

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate("photos/2024/beach.jpg", 12), "...beach.jpg");
    }

    #[test]
    fn test_truncate_multibyte() {
        let out = truncate("写真/夏休み/海辺の夕焼け.png", 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with("夕焼け.png"));
    }
}
