//! Quote-aware CSV tokenizer and field escaping, plus the header-sniffing
//! generic CSV adapter.

use super::sanitize::{RawPassword, RawRecord, RawTotp};

/// Parse CSV content into records of fields.
///
/// Fields are comma-delimited. A field wrapped in double quotes may contain
/// literal commas and newlines; a doubled quote inside a quoted field is one
/// literal quote character.
pub fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                other => field.push(other),
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            ',' => {
                record.push(std::mem::take(&mut field));
            }
            '\r' => {
                // Bare CR is treated like LF; CRLF consumes both.
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            other => field.push(other),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    // Drop records that are entirely empty (trailing newlines, blank rows).
    records
        .into_iter()
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .collect()
}

/// Escape a field for CSV output: wrap in quotes when it contains a comma,
/// quote, or newline, doubling embedded quotes.
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Fetch a column by index, defaulting to empty.
pub(crate) fn column(record: &[String], index: usize) -> String {
    record.get(index).cloned().unwrap_or_default()
}

// Header aliases for the generic adapter, in priority order per field.
const NAME_ALIASES: &[&str] = &["name", "title", "site", "account"];
const USERNAME_ALIASES: &[&str] = &["username", "user", "login", "email"];
const PASSWORD_ALIASES: &[&str] = &["password", "pass", "pwd", "pw"];
const URL_ALIASES: &[&str] = &["url", "web", "link", "uri"];
const CATEGORY_ALIASES: &[&str] = &["category", "group", "folder"];
const NOTES_ALIASES: &[&str] = &["notes", "note", "comment", "extra"];
const SECRET_ALIASES: &[&str] = &["secret", "totp", "otp"];

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        for (i, name) in header.iter().enumerate() {
            if name.to_ascii_lowercase().contains(alias) {
                return Some(i);
            }
        }
    }
    None
}

/// Parse an unrecognized CSV by sniffing its header for known column names.
pub fn parse_generic(content: &str) -> Vec<RawRecord> {
    let records = parse_csv(content);
    let Some((header, rows)) = records.split_first() else {
        return Vec::new();
    };

    let name_col = find_column(header, NAME_ALIASES);
    let username_col = find_column(header, USERNAME_ALIASES);
    let password_col = find_column(header, PASSWORD_ALIASES);
    let url_col = find_column(header, URL_ALIASES);
    let category_col = find_column(header, CATEGORY_ALIASES);
    let notes_col = find_column(header, NOTES_ALIASES);
    let secret_col = find_column(header, SECRET_ALIASES);

    let get = |row: &[String], col: Option<usize>| -> String {
        col.map(|i| column(row, i)).unwrap_or_default()
    };

    let mut out = Vec::new();
    for row in rows {
        let name = get(row, name_col);
        let secret = get(row, secret_col);

        if !secret.trim().is_empty() {
            out.push(RawRecord::Totp(RawTotp {
                name,
                issuer: String::new(),
                secret,
                digits: 6,
                period: 30,
                tags: vec!["import".to_string()],
            }));
        } else {
            out.push(RawRecord::Password(RawPassword {
                name,
                username: get(row, username_col),
                password: get(row, password_col),
                url: get(row, url_col),
                category: get(row, category_col),
                notes: get(row, notes_col),
                tags: vec!["import".to_string()],
            }));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_quoted_comma() {
        assert_eq!(
            parse_csv("a,\"b,c\",d"),
            vec![vec!["a".to_string(), "b,c".to_string(), "d".to_string()]]
        );
    }

    #[test]
    fn test_tokenizer_doubled_quote() {
        assert_eq!(
            parse_csv("a,\"b\"\"c\",d"),
            vec![vec!["a".to_string(), "b\"c".to_string(), "d".to_string()]]
        );
    }

    #[test]
    fn test_tokenizer_newline_inside_quotes() {
        let rows = parse_csv("a,\"line1\nline2\",c\nd,e,f");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "line1\nline2");
        assert_eq!(rows[1], vec!["d", "e", "f"]);
    }

    #[test]
    fn test_tokenizer_crlf_and_trailing_newline() {
        let rows = parse_csv("a,b\r\nc,d\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_tokenizer_skips_blank_rows() {
        let rows = parse_csv("a,b\n\n  ,  \nc,d");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_generic_header_sniffing() {
        let content = "Site Name,Login,PW,Web Address\nExample,alice,hunter2,example.com\n";
        let records = parse_generic(content);
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Password(p) => {
                assert_eq!(p.name, "Example");
                assert_eq!(p.username, "alice");
                assert_eq!(p.password, "hunter2");
                assert_eq!(p.url, "example.com");
            }
            _ => panic!("expected password record"),
        }
    }

    #[test]
    fn test_bare_pw_header_maps_password() {
        let content = "name,login,pw\nExample,alice,hunter2\n";
        let records = parse_generic(content);
        match &records[0] {
            RawRecord::Password(p) => assert_eq!(p.password, "hunter2"),
            _ => panic!("expected password record"),
        }
    }

    #[test]
    fn test_generic_secret_column_makes_totp() {
        let content = "name,totp secret\nGitHub,JBSWY3DPEHPK3PXP\n";
        let records = parse_generic(content);
        assert!(matches!(&records[0], RawRecord::Totp(t) if t.secret == "JBSWY3DPEHPK3PXP"));
    }
}
