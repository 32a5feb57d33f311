//! Chrome password-export CSV adapter.
//!
//! Column order: `name,url,username,password`.

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
                url: column(row, 1),
                username: column(row, 2),
                password: column(row, 3),
                category: "Chrome Import".to_string(),
                notes: String::new(),
                tags: vec!["chrome".to_string()],
            })
        })
        .collect()
}
