//! KeePass CSV adapter.
//!
//! Column order: `title,username,password,url,notes`.

use super::csv::{column, parse_csv};
use super::sanitize::{RawPassword, RawRecord};

pub fn parse(content: &str) -> Vec<RawRecord> {
    let records = parse_csv(content);
    let Some((_header, rows)) = records.split_first() else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| {
            RawRecord::Password(RawPassword {
                name: column(row, 0),
                username: column(row, 1),
                password: column(row, 2),
                url: column(row, 3),
                notes: column(row, 4),
                category: "Imported".to_string(),
                tags: vec!["keepass".to_string()],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepass_columns() {
        let content = "title,username,password,url,notes\n\
                       Mail,alice,hunter2,https://mail.example.com,personal\n";
        let records = parse(content);
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Password(p) => {
                assert_eq!(p.name, "Mail");
                assert_eq!(p.username, "alice");
                assert_eq!(p.password, "hunter2");
                assert_eq!(p.url, "https://mail.example.com");
                assert_eq!(p.notes, "personal");
                assert_eq!(p.category, "Imported");
            }
            _ => panic!("expected password record"),
        }
    }

    #[test]
    fn test_short_rows_default_empty() {
        let content = "title,username,password,url,notes\nBare,,pw\n";
        let records = parse(content);
        match &records[0] {
            RawRecord::Password(p) => {
                assert_eq!(p.url, "");
                assert_eq!(p.notes, "");
            }
            _ => panic!("expected password record"),
        }
    }
}
