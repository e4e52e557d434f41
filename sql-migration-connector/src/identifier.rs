//! Identifier conversion: rewrites a source identifier into the target's
//! naming style and enforces its maximum length (spec §4.1).

use migration_connector::{ConnectorError, ConnectorResult, NamingConvention, Vendor};
use once_cell::sync::Lazy;
use regex::Regex;

static HASH_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// Splits an identifier into tokens on existing underscores, on
/// lower-to-upper case boundaries, and on digit/letter boundaries, then
/// recombines per `convention`. Truncates to `max_len`, preserving the
/// original prefix and appending a 6 hex-char hash suffix of the full
/// pre-truncation name so two names that collide after truncation don't
/// collide after conversion.
pub fn convert(source: &str, vendor: Vendor, convention: NamingConvention, max_len: usize) -> ConnectorResult<String> {
    if source.is_empty() {
        return Err(ConnectorError::InvalidIdentifier("identifier must not be empty".to_string()));
    }

    let convention = match convention {
        NamingConvention::Auto => auto_convention_for(vendor),
        other => other,
    };

    let converted = if convention == NamingConvention::Preserve {
        truncate_with_hash(source, max_len)
    } else {
        let tokens = tokenize(source);
        if tokens.is_empty() {
            return Err(ConnectorError::InvalidIdentifier(format!("identifier `{source}` has no alphanumeric content")));
        }
        truncate_with_hash(&recombine(&tokens, convention), max_len)
    };

    // `Preserve` passes the source through close to verbatim, and neither
    // `tokenize` nor `recombine` strips characters outside `[A-Za-z0-9_]` —
    // reject here rather than let an unsafe converted name reach a renderer
    // that only quotes it, never escapes it.
    if !is_safe_identifier(&converted) {
        return Err(ConnectorError::UnsafeIdentifier(converted));
    }

    Ok(converted)
}

fn auto_convention_for(vendor: Vendor) -> NamingConvention {
    match vendor {
        Vendor::SqlServer => NamingConvention::PascalCase,
        Vendor::Postgres => NamingConvention::SnakeCase,
        Vendor::MySql => NamingConvention::Lowercase,
        Vendor::Oracle => NamingConvention::Uppercase,
    }
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = source.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }

        if i > 0 {
            let prev = chars[i - 1];
            let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            let letter_digit_boundary = (prev.is_alphabetic() && c.is_ascii_digit()) || (prev.is_ascii_digit() && c.is_alphabetic());
            if (lower_to_upper || letter_digit_boundary) && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn recombine(tokens: &[String], convention: NamingConvention) -> String {
    match convention {
        NamingConvention::SnakeCase => tokens.iter().map(|t| t.to_lowercase()).collect::<Vec<_>>().join("_"),
        NamingConvention::PascalCase => tokens.iter().map(|t| capitalize(t)).collect::<Vec<_>>().join(""),
        NamingConvention::Lowercase => tokens.join("").to_lowercase(),
        NamingConvention::Uppercase => tokens.join("").to_uppercase(),
        NamingConvention::Auto | NamingConvention::Preserve => unreachable!("resolved before recombine"),
    }
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn truncate_with_hash(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    let suffix = format!("{:06x}", fnv1a(name) & 0xff_ffff);
    let prefix_len = max_len.saturating_sub(suffix.len());
    let prefix: String = name.chars().take(prefix_len).collect();
    format!("{prefix}{suffix}")
}

/// A small, non-cryptographic FNV-1a hash, used only to produce a stable
/// disambiguating suffix for truncated identifiers. Not security-sensitive.
fn fnv1a(input: &str) -> u64 {
    let mut hash = HASH_SEED;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}

/// Matches identifiers considered safe to interpolate into generated DDL
/// text (letters, digits, and underscore, not starting with a digit). Used
/// by data readers to validate table/column names before quoting them
/// (spec §4.5).
pub fn is_safe_identifier(name: &str) -> bool {
    static SAFE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*$").unwrap());
    SAFE_IDENTIFIER.is_match(name)
}

/// Rejects the first unsafe name in `names` with [`ConnectorError::UnsafeIdentifier`].
/// Used by every flavour's `DataReader` before it interpolates a catalog-sourced
/// table or column name into hand-built SQL text (spec §4.5).
pub fn validate_identifiers<'a>(names: impl IntoIterator<Item = &'a str>) -> ConnectorResult<()> {
    for name in names {
        if !is_safe_identifier(name) {
            return Err(ConnectorError::UnsafeIdentifier(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_picks_target_canonical_style() {
        assert_eq!(convert("UserAccount", Vendor::Postgres, NamingConvention::Auto, 63).unwrap(), "user_account");
        assert_eq!(convert("user_account", Vendor::SqlServer, NamingConvention::Auto, 128).unwrap(), "UserAccount");
        assert_eq!(convert("UserAccount", Vendor::MySql, NamingConvention::Auto, 64).unwrap(), "useraccount");
        assert_eq!(convert("UserAccount", Vendor::Oracle, NamingConvention::Auto, 30).unwrap(), "USERACCOUNT");
    }

    #[test]
    fn preserve_returns_verbatim() {
        assert_eq!(convert("Weird_Name123", Vendor::Postgres, NamingConvention::Preserve, 63).unwrap(), "Weird_Name123");
    }

    #[test]
    fn splits_on_digit_letter_boundary() {
        assert_eq!(convert("order2Items", Vendor::Postgres, NamingConvention::SnakeCase, 63).unwrap(), "order_2_items");
    }

    #[test]
    fn preserve_rejects_a_name_with_an_embedded_quote() {
        let result = convert("users\" ; DROP TABLE other --", Vendor::Postgres, NamingConvention::Preserve, 63);
        assert!(matches!(result, Err(ConnectorError::UnsafeIdentifier(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(convert("", Vendor::Postgres, NamingConvention::Auto, 63), Err(ConnectorError::InvalidIdentifier(_))));
    }

    #[test]
    fn truncation_preserves_prefix_and_appends_stable_hash() {
        let long_name = "ThisIsAnExtremelyLongTableNameThatVastlyExceedsTheOracleLimitOfThirtyCharacters";
        let converted = convert(long_name, Vendor::Oracle, NamingConvention::Auto, 30).unwrap();
        assert_eq!(converted.chars().count(), 30);
        assert!(converted.starts_with(&long_name.to_uppercase()[0..24]));

        let converted_again = convert(long_name, Vendor::Oracle, NamingConvention::Auto, 30).unwrap();
        assert_eq!(converted, converted_again, "conversion must be stable");
    }

    #[test]
    fn truncation_does_not_collide_for_distinct_long_names() {
        let a = "ThisIsAnExtremelyLongTableNameThatVastlyExceedsTheOracleLimitVariantA";
        let b = "ThisIsAnExtremelyLongTableNameThatVastlyExceedsTheOracleLimitVariantB";
        let converted_a = convert(a, Vendor::Oracle, NamingConvention::Auto, 30).unwrap();
        let converted_b = convert(b, Vendor::Oracle, NamingConvention::Auto, 30).unwrap();
        assert_ne!(converted_a, converted_b);
    }

    #[test]
    fn safe_identifier_regex_rejects_interpolation_hazards() {
        assert!(is_safe_identifier("users"));
        assert!(is_safe_identifier("_internal_table"));
        assert!(!is_safe_identifier("users; DROP TABLE users"));
        assert!(!is_safe_identifier("1users"));
    }

    proptest::proptest! {
        #[test]
        fn converted_identifier_never_exceeds_max_len(source in "[A-Za-z][A-Za-z0-9_]{0,120}", max_len in 4usize..64) {
            if let Ok(converted) = convert(&source, Vendor::Postgres, NamingConvention::Auto, max_len) {
                prop_assert!(converted.chars().count() <= max_len);
            }
        }
    }
}
