//! WinAuth text adapter: one `otpauth://totp/...` URI per line.

use super::sanitize::{RawRecord, RawTotp};
use crate::store::models::TotpEntry;
use crate::totp::parse_otpauth_uri;
use std::fmt::Write;

/// Parse WinAuth export lines. Lines that fail to parse are reported as
/// (line number, reason) pairs alongside the successes.
pub fn parse(content: &str) -> (Vec<RawRecord>, Vec<String>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_otpauth_uri(line) {
            Ok(parsed) => {
                let name = parsed
                    .account_name
                    .or_else(|| parsed.issuer.clone())
                    .unwrap_or_else(|| format!("Imported token {}", index + 1));
                records.push(RawRecord::Totp(RawTotp {
                    name,
                    issuer: parsed.issuer.unwrap_or_default(),
                    secret: parsed.secret_base32,
                    digits: parsed.digits,
                    period: parsed.period,
                    tags: vec!["winauth".to_string()],
                }));
            }
            Err(e) => errors.push(format!("line {}: {}", index + 1, e)),
        }
    }
    (records, errors)
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                out.push(byte as char)
            }
            other => {
                let _ = write!(out, "%{:02X}", other);
            }
        }
    }
    out
}

/// Serialize TOTP entries as otpauth URIs, one per line.
pub fn export(entries: &[TotpEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let label = if entry.issuer.is_empty() {
            percent_encode(&entry.name)
        } else {
            format!("{}:{}", percent_encode(&entry.issuer), percent_encode(&entry.name))
        };
        let _ = write!(out, "otpauth://totp/{}?secret={}", label, entry.secret);
        if !entry.issuer.is_empty() {
            let _ = write!(out, "&issuer={}", percent_encode(&entry.issuer));
        }
        let _ = writeln!(out, "&digits={}&period={}", entry.digits, entry.period);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::sanitize::sanitize_record;
    use crate::store::models::VaultRecord;

    #[test]
    fn test_winauth_line_becomes_totp_entry() {
        let content =
            "otpauth://totp/Example:bob@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example&digits=6&period=30\n";
        let (records, errors) = parse(content);
        assert!(errors.is_empty());
        assert_eq!(records.len(), 1);

        match sanitize_record(records[0].clone()).unwrap() {
            VaultRecord::Totp(entry) => {
                assert_eq!(entry.name, "bob@example.com");
                assert_eq!(entry.issuer, "Example");
                assert_eq!(entry.secret, "JBSWY3DPEHPK3PXP");
                assert_eq!(entry.digits, 6);
                assert_eq!(entry.period, 30);
            }
            _ => panic!("expected TOTP record"),
        }
    }

    #[test]
    fn test_bad_lines_reported_not_fatal() {
        let content = "otpauth://totp/a?secret=JBSWY3DPEHPK3PXP\nnot a uri\n";
        let (records, errors) = parse(content);
        assert_eq!(records.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("line 2"));
    }

    #[test]
    fn test_export_round_trips() {
        let mut entry = TotpEntry::new("bob@example.com", "JBSWY3DPEHPK3PXP");
        entry.issuer = "Example".to_string();

        let lines = export(&[entry]);
        let (records, errors) = parse(&lines);
        assert!(errors.is_empty());
        match &records[0] {
            RawRecord::Totp(t) => {
                assert_eq!(t.name, "bob@example.com");
                assert_eq!(t.issuer, "Example");
            }
            _ => panic!("expected TOTP record"),
        }
    }
}
