//! TOTP (RFC 6238) code generation and `otpauth://` URI parsing.

use crate::{Result, VaultError};
use data_encoding::{BASE32, BASE32_NOPAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Runtime TOTP code response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpCode {
    pub code: String,
    pub seconds_remaining: u32,
}

/// Parsed provisioning data from an `otpauth://totp/...` URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTotpUri {
    pub secret_base32: String,
    pub digits: u8,
    pub period: u32,
    pub issuer: Option<String>,
    pub account_name: Option<String>,
}

/// Parse an `otpauth://totp/...` URI (commonly embedded in QR codes).
///
/// Malformed `digits`/`period` values fall back to the 6/30 defaults rather
/// than failing the whole URI; authenticator exports routinely carry junk in
/// those fields. An explicit `issuer` query parameter wins over the label
/// prefix. A WinAuth-style `serial` parameter is folded into the account
/// name.
pub fn parse_otpauth_uri(uri: &str) -> Result<ParsedTotpUri> {
    let trimmed = uri.trim();
    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| VaultError::InvalidInput("TOTP URI must start with otpauth://".to_string()))?;
    if !scheme.eq_ignore_ascii_case("otpauth") {
        return Err(VaultError::InvalidInput(
            "TOTP URI must start with otpauth://".to_string(),
        ));
    }

    let (kind, remainder) = rest
        .split_once('/')
        .ok_or_else(|| VaultError::InvalidInput("Invalid otpauth URI format".to_string()))?;
    if !kind.eq_ignore_ascii_case("totp") {
        return Err(VaultError::InvalidInput(
            "Only otpauth://totp URIs are supported".to_string(),
        ));
    }

    let (label_raw, query_raw) = match remainder.split_once('?') {
        Some((label, query)) => (label, query),
        None => (remainder, ""),
    };

    let label = percent_decode(label_raw)?;
    let mut issuer_from_label = None;
    let mut account_name = None;
    if let Some((issuer, account)) = label.split_once(':') {
        let issuer = issuer.trim();
        let account = account.trim();
        if !issuer.is_empty() {
            issuer_from_label = Some(issuer.to_string());
        }
        if !account.is_empty() {
            account_name = Some(account.to_string());
        }
    } else {
        let account = label.trim();
        if !account.is_empty() {
            account_name = Some(account.to_string());
        }
    }

    let mut secret_base32 = None;
    let mut issuer_from_query = None;
    let mut serial = None;
    let mut digits: u8 = 6;
    let mut period: u32 = 30;

    for pair in query_raw.split('&').filter(|part| !part.is_empty()) {
        let (key_raw, value_raw) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key_raw)?.to_ascii_lowercase();
        let value = percent_decode(value_raw)?;

        match key.as_str() {
            "secret" => {
                if !value.trim().is_empty() {
                    secret_base32 = Some(value);
                }
            }
            "issuer" => {
                if !value.trim().is_empty() {
                    issuer_from_query = Some(value);
                }
            }
            "serial" => {
                if !value.trim().is_empty() {
                    serial = Some(value.trim().to_string());
                }
            }
            "digits" => {
                if let Ok(parsed) = value.trim().parse::<u8>() {
                    digits = parsed;
                }
            }
            "period" => {
                if let Ok(parsed) = value.trim().parse::<u32>() {
                    period = parsed;
                }
            }
            _ => {}
        }
    }

    let secret = secret_base32
        .ok_or_else(|| VaultError::InvalidInput("TOTP URI is missing secret parameter".to_string()))?;
    let secret = normalize_secret(&secret)?;

    if let Some(serial) = serial {
        account_name = Some(match account_name {
            Some(name) => format!("{} ({})", name, serial),
            None => serial,
        });
    }

    Ok(ParsedTotpUri {
        secret_base32: secret,
        digits,
        period,
        issuer: issuer_from_query.or(issuer_from_label),
        account_name,
    })
}

/// Generate a TOTP code (HMAC-SHA1 per RFC 6238) for the given Unix
/// timestamp.
pub fn generate_totp_code(secret_base32: &str, digits: u8, period: u32, timestamp: i64) -> Result<String> {
    if digits != 6 && digits != 8 {
        return Err(VaultError::Validation("TOTP digits must be 6 or 8".to_string()));
    }
    if period == 0 {
        return Err(VaultError::Validation(
            "TOTP period must be greater than 0".to_string(),
        ));
    }

    let secret = decode_secret(secret_base32)?;
    let counter = (timestamp.max(0) as u64) / period as u64;
    let counter_bytes = counter.to_be_bytes();

    let mut mac = HmacSha1::new_from_slice(&secret)
        .map_err(|_| VaultError::InvalidInput("Invalid TOTP secret".to_string()))?;
    mac.update(&counter_bytes);
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 section 5.3.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    let modulo = 10u32.pow(digits as u32);
    let code = binary % modulo;
    Ok(format!("{:0width$}", code, width = digits as usize))
}

/// Get remaining seconds until the next TOTP rotation.
pub fn seconds_remaining(period: u32, timestamp: i64) -> u32 {
    if period == 0 {
        return 0;
    }

    let elapsed = timestamp.rem_euclid(period as i64) as u32;
    if elapsed == 0 {
        period
    } else {
        period - elapsed
    }
}

/// Generate the current code plus its time-to-live for the given timestamp.
pub fn current_code(secret_base32: &str, digits: u8, period: u32, timestamp: i64) -> Result<TotpCode> {
    Ok(TotpCode {
        code: generate_totp_code(secret_base32, digits, period, timestamp)?,
        seconds_remaining: seconds_remaining(period, timestamp),
    })
}

/// Normalize a base32 secret (strip spaces/dashes, uppercase) and verify it
/// decodes.
pub fn normalize_secret(secret_base32: &str) -> Result<String> {
    let normalized = secret_base32
        .trim()
        .replace([' ', '-'], "")
        .to_ascii_uppercase();

    if normalized.is_empty() {
        return Err(VaultError::InvalidInput("TOTP secret cannot be empty".to_string()));
    }

    decode_secret(&normalized)?;
    Ok(normalized)
}

fn decode_secret(secret_base32: &str) -> Result<Vec<u8>> {
    let normalized = secret_base32
        .trim()
        .replace([' ', '-'], "")
        .to_ascii_uppercase();

    let decoded = BASE32_NOPAD
        .decode(normalized.as_bytes())
        .or_else(|_| BASE32.decode(normalized.as_bytes()))
        .map_err(|_| VaultError::InvalidInput("TOTP secret must be valid base32".to_string()))?;

    if decoded.is_empty() {
        return Err(VaultError::InvalidInput(
            "TOTP secret cannot decode to empty bytes".to_string(),
        ));
    }

    Ok(decoded)
}

pub(crate) fn percent_decode(input: &str) -> Result<String> {
    fn from_hex(byte: u8) -> Option<u8> {
        match byte {
            b'0'..=b'9' => Some(byte - b'0'),
            b'a'..=b'f' => Some(byte - b'a' + 10),
            b'A'..=b'F' => Some(byte - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err(VaultError::InvalidInput(
                        "Invalid percent encoding in TOTP URI".to_string(),
                    ));
                }
                let hi = from_hex(bytes[i + 1]).ok_or_else(|| {
                    VaultError::InvalidInput("Invalid percent encoding in TOTP URI".to_string())
                })?;
                let lo = from_hex(bytes[i + 2]).ok_or_else(|| {
                    VaultError::InvalidInput("Invalid percent encoding in TOTP URI".to_string())
                })?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8(out)
        .map_err(|_| VaultError::InvalidInput("TOTP URI contains invalid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc_6238_vectors() {
        assert_eq!(generate_totp_code(RFC_SECRET, 8, 30, 59).unwrap(), "94287082");
        assert_eq!(
            generate_totp_code(RFC_SECRET, 8, 30, 1_111_111_109).unwrap(),
            "07081804"
        );
        assert_eq!(
            generate_totp_code(RFC_SECRET, 8, 30, 1_234_567_890).unwrap(),
            "89005924"
        );
    }

    #[test]
    fn test_six_digit_codes_are_truncations() {
        assert_eq!(generate_totp_code(RFC_SECRET, 6, 30, 59).unwrap(), "287082");
    }

    #[test]
    fn test_rejects_bad_digits_and_period() {
        assert!(generate_totp_code(RFC_SECRET, 7, 30, 59).is_err());
        assert!(generate_totp_code(RFC_SECRET, 6, 0, 59).is_err());
    }

    #[test]
    fn test_rejects_invalid_base32() {
        assert!(generate_totp_code("not base32 !!!", 6, 30, 59).is_err());
    }

    #[test]
    fn test_secret_normalization_tolerates_spacing() {
        let spaced = "gezd gnbv-gy3t qojq gezd gnbv gy3t qojq";
        assert_eq!(normalize_secret(spaced).unwrap(), RFC_SECRET);
        assert_eq!(
            generate_totp_code(spaced, 8, 30, 59).unwrap(),
            generate_totp_code(RFC_SECRET, 8, 30, 59).unwrap()
        );
    }

    #[test]
    fn test_seconds_remaining() {
        assert_eq!(seconds_remaining(30, 59), 1);
        assert_eq!(seconds_remaining(30, 60), 30);
        assert_eq!(seconds_remaining(30, 0), 30);
        assert_eq!(seconds_remaining(60, 90), 30);
    }

    #[test]
    fn test_parse_otpauth_uri_with_all_fields() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/Acme:alice%40example.com?secret=JBSWY3DPEHPK3PXP&issuer=Acme&digits=8&period=60",
        )
        .unwrap();

        assert_eq!(parsed.secret_base32, "JBSWY3DPEHPK3PXP");
        assert_eq!(parsed.digits, 8);
        assert_eq!(parsed.period, 60);
        assert_eq!(parsed.issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.account_name.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_parse_otpauth_uri_defaults() {
        let parsed =
            parse_otpauth_uri("otpauth://totp/alice@example.com?secret=JBSWY3DPEHPK3PXP").unwrap();

        assert_eq!(parsed.digits, 6);
        assert_eq!(parsed.period, 30);
        assert_eq!(parsed.issuer, None);
        assert_eq!(parsed.account_name.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_parse_otpauth_uri_query_issuer_wins() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/LabelIssuer:alice?secret=JBSWY3DPEHPK3PXP&issuer=QueryIssuer",
        )
        .unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("QueryIssuer"));
    }

    #[test]
    fn test_parse_otpauth_uri_non_numeric_params_default() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP&digits=abc&period=xyz",
        )
        .unwrap();
        assert_eq!(parsed.digits, 6);
        assert_eq!(parsed.period, 30);
    }

    #[test]
    fn test_parse_otpauth_uri_serial_joins_account() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/Steam?secret=JBSWY3DPEHPK3PXP&serial=SG-1234",
        )
        .unwrap();
        assert_eq!(parsed.account_name.as_deref(), Some("Steam (SG-1234)"));
    }

    #[test]
    fn test_parse_otpauth_uri_rejects_hotp() {
        assert!(parse_otpauth_uri("otpauth://hotp/alice?secret=JBSWY3DPEHPK3PXP").is_err());
        assert!(parse_otpauth_uri("https://example.com").is_err());
        assert!(parse_otpauth_uri("otpauth://totp/alice").is_err());
    }
}
