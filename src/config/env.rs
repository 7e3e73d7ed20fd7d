//! # Environment variable helpers
//!
//! Typed reads with defaults. Every reader has a `_from` variant taking a
//! provider closure, so configuration can be loaded from a map in tests.
//!
//! # Examples
//! ```rust
//! use wzs_auth::config::env::{read_flag_from, read_u32_from};
//!
//! let get = |k: &str| match k {
//!     "SECURE" => Some("yes".to_string()),
//!     "DAYS" => Some("14".to_string()),
//!     _ => None,
//! };
//! assert!(read_flag_from(get, "SECURE", false));
//! assert_eq!(read_u32_from(get, "DAYS", 30), 14);
//! ```

/// Reads a boolean flag from the process environment.
pub fn read_flag(name: &str, default: bool) -> bool {
    read_flag_from(|k| std::env::var(k).ok(), name, default)
}

/// Reads a boolean flag through `provider`.
///
/// Truthy values (case-insensitive, optionally quoted): `1`, `true`, `yes`,
/// `on`. Anything else present is `false`; a missing value is `default`.
pub fn read_flag_from<F>(provider: F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match provider(name) {
        Some(v) => matches!(
            unquote(&v).to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

pub fn read_u32(name: &str, default: u32) -> u32 {
    read_u32_from(|k| std::env::var(k).ok(), name, default)
}

/// Reads a `u32`, falling back to `default` when missing or unparsable.
pub fn read_u32_from<F>(provider: F, name: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .and_then(|s| unquote(&s).parse::<u32>().ok())
        .unwrap_or(default)
}

/// Reads a trimmed, unquoted string. Blank values count as missing.
pub fn read_string_from<F>(provider: F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .map(|v| unquote(&v).to_string())
        .filter(|v| !v.is_empty())
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_flag_true_variants() {
        for val in ["1", "true", "TRUE", "yes", "YES", "on", "On"] {
            let got = read_flag_from(|_| Some(val.into()), "X", false);
            assert!(got, "Expected {val:?} to be truthy");
        }
    }

    #[test]
    fn test_read_flag_false_variants() {
        for val in ["0", "false", "no", "off", "xyz", ""] {
            let got = read_flag_from(|_| Some(val.into()), "X", true);
            assert!(!got, "Expected {val:?} to be falsy");
        }
    }

    #[test]
    fn test_read_flag_default_and_quotes() {
        assert!(read_flag_from(|_| None, "X", true));
        assert!(read_flag_from(|_| Some("\"true\"".into()), "X", false));
        assert!(read_flag_from(|_| Some("'yes'".into()), "X", false));
    }

    #[test]
    fn test_read_u32() {
        assert_eq!(read_u32_from(|_| Some(" 42 ".into()), "N", 10), 42);
        assert_eq!(read_u32_from(|_| Some("-1".into()), "N", 99), 99);
        assert_eq!(read_u32_from(|_| None, "N", 77), 77);
    }

    #[test]
    fn test_read_string_treats_blank_as_missing() {
        assert_eq!(
            read_string_from(|_| Some(" 'abc' ".into()), "S").as_deref(),
            Some("abc")
        );
        assert_eq!(read_string_from(|_| Some("   ".into()), "S"), None);
        assert_eq!(read_string_from(|_| None, "S"), None);
    }

    #[test]
    fn test_process_env_readers() {
        temp_env::with_vars(
            vec![("WZS_TEST_FLAG", Some("on")), ("WZS_TEST_NUM", Some("5"))],
            || {
                assert!(read_flag("WZS_TEST_FLAG", false));
                assert_eq!(read_u32("WZS_TEST_NUM", 1), 5);
            },
        );
    }
}
