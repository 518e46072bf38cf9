//! Read-only guard for generated SQL.

use cityq_core::{AppError, AppResult};

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "PRAGMA",
    "VACUUM", "REINDEX",
];

/// Check that `sql` is a single `SELECT`/`WITH` statement.
///
/// Returns the statement without its trailing semicolon.
pub fn ensure_read_only(sql: &str) -> AppResult<String> {
    let trimmed = sql.trim();
    let statement = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();

    if statement.is_empty() {
        return Err(AppError::Structured("Generated SQL is empty".to_string()));
    }

    let code = strip_literals(statement);

    if code.contains(';') {
        return Err(AppError::Structured(format!(
            "Only a single statement may be executed: {}",
            statement
        )));
    }

    let upper = code.to_ascii_uppercase();
    let first = upper.split_whitespace().next().unwrap_or_default();
    if first != "SELECT" && first != "WITH" {
        return Err(AppError::Structured(format!(
            "Only SELECT queries may be executed, got: {}",
            statement
        )));
    }

    if let Some(keyword) = upper
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .find(|word| FORBIDDEN_KEYWORDS.contains(word))
    {
        return Err(AppError::Structured(format!(
            "Query contains forbidden keyword {}: {}",
            keyword, statement
        )));
    }

    Ok(statement.to_string())
}

/// Replace the contents of quoted strings and identifiers with spaces so
/// keywords and semicolons inside them are ignored.
fn strip_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                out.push(c);
            }
            Some(_) => out.push(' '),
            None => {
                if c == '\'' || c == '"' || c == '`' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_select() {
        let sql = ensure_read_only("SELECT population FROM city_stats WHERE city_name = 'Miami';").unwrap();
        assert_eq!(sql, "SELECT population FROM city_stats WHERE city_name = 'Miami'");
    }

    #[test]
    fn test_accepts_cte() {
        assert!(ensure_read_only(
            "WITH big AS (SELECT * FROM city_stats WHERE population > 1000000) SELECT city_name FROM big"
        )
        .is_ok());
    }

    #[test]
    fn test_keywords_inside_literals_are_ignored() {
        assert!(ensure_read_only("select city_name from city_stats where state = 'DROP; Texas'").is_ok());
    }

    #[test]
    fn test_accepts_replace_function() {
        let sql = "SELECT REPLACE(state, 'New ', '') FROM city_stats";
        assert_eq!(ensure_read_only(sql).unwrap(), sql);
        assert!(ensure_read_only("select replace(city_name, ' City', '') as name from city_stats").is_ok());
    }

    #[test]
    fn test_rejects_writes() {
        for sql in [
            "DELETE FROM city_stats",
            "UPDATE city_stats SET population = 0",
            "INSERT INTO city_stats VALUES ('X', 1, 'Y')",
            "DROP TABLE city_stats",
            "PRAGMA table_info(city_stats)",
            "ATTACH DATABASE 'x.db' AS x",
            "REPLACE INTO city_stats VALUES ('X', 1, 'Y')",
            "WITH x AS (SELECT 1) INSERT OR REPLACE INTO city_stats VALUES ('X', 1, 'Y')",
        ] {
            let err = ensure_read_only(sql).unwrap_err();
            assert!(matches!(err, AppError::Structured(_)), "{}", sql);
        }
    }

    #[test]
    fn test_rejects_multiple_statements() {
        assert!(ensure_read_only("SELECT 1; SELECT 2").is_err());
        assert!(ensure_read_only("SELECT 1; DROP TABLE city_stats;").is_err());
    }

    #[test]
    fn test_rejects_select_with_embedded_write() {
        assert!(ensure_read_only("WITH x AS (DELETE FROM city_stats) SELECT 1").is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(ensure_read_only("  ;  ").is_err());
    }
}
