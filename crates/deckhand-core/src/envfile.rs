//! `KEY=VALUE` env file parsing.
//!
//! Lines are processed top to bottom. Blank lines and `#` comments are
//! skipped, the first `=` splits key from value, and a repeated key keeps
//! its last value at the position where it first appeared.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Desired environment: key to value, in file order.
pub type EnvMap = IndexMap<String, String>;

pub fn parse_env(content: &str) -> Result<EnvMap> {
    let mut vars = EnvMap::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = line.trim_start();
        if trimmed.trim_end().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(Error::EnvFile {
                line: idx + 1,
                message: format!("expected KEY=VALUE, got \"{}\"", trimmed.trim_end()),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::EnvFile {
                line: idx + 1,
                message: "empty key".to_string(),
            });
        }
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

pub fn load_env_file(path: &Path) -> Result<EnvMap> {
    let content = fs::read_to_string(path)?;
    parse_env(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_occurrence_wins() {
        let vars = parse_env("A=1\nB=2\nA=3").unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["A"], "3");
        assert_eq!(vars["B"], "2");
        let keys: Vec<_> = vars.keys().map(String::as_str).collect();
        assert_eq!(keys, ["A", "B"]);
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let vars = parse_env("# header\n\n   \nKEY=value\n  # indented comment\n").unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["KEY"], "value");
    }

    #[test]
    fn test_first_equals_splits() {
        let vars = parse_env("DATABASE_URL=postgres://u:p@h/db?sslmode=require").unwrap();
        assert_eq!(vars["DATABASE_URL"], "postgres://u:p@h/db?sslmode=require");
    }

    #[test]
    fn test_value_kept_verbatim() {
        let vars = parse_env("GREETING= hello world \nEMPTY=\r\n").unwrap();
        assert_eq!(vars["GREETING"], " hello world ");
        assert_eq!(vars["EMPTY"], "");
    }

    #[test]
    fn test_crlf_line_endings() {
        let vars = parse_env("A=1\r\nB=2\r\n").unwrap();
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "2");
    }

    #[test]
    fn test_missing_equals_reports_line() {
        let err = parse_env("A=1\nnot a pair\n").unwrap_err();
        assert!(matches!(err, Error::EnvFile { line: 2, .. }));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = parse_env("=value").unwrap_err();
        assert!(matches!(err, Error::EnvFile { line: 1, .. }));
    }

    #[test]
    fn test_load_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PORT=3000\nNODE_ENV=production\n").unwrap();
        let vars = load_env_file(&path).unwrap();
        assert_eq!(vars["NODE_ENV"], "production");
    }
}
