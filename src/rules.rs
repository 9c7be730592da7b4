// 🏷️ Classification Rules - headquarters/branch
//
// Pure functions shared by the create path (flag checked against the code)
// and the import path (flag derived from the code). The suffix test lives
// here and nowhere else.

use crate::entities::{SwiftCode, SwiftCodeCandidate};
use crate::error::{RegistryError, Result};
use regex::Regex;
use std::sync::OnceLock;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Suffix that marks a headquarters code
pub const HEADQUARTER_SUFFIX: &str = "XXX";

/// Length of the institution + country + location prefix
pub const HEADQUARTER_CODE_LEN: usize = 8;

pub const BANK_NAME_MAX: usize = 100;
pub const COUNTRY_NAME_MAX: usize = 50;
pub const COUNTRY_ISO2_LEN: usize = 2;

fn swift_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // institution (4) + country (2) + location (2) + optional branch (3)
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}([A-Z0-9]{3})?$")
            .expect("SWIFT code pattern is a valid regex")
    })
}

// ============================================================================
// PURE RULES
// ============================================================================

/// Structural check only; says nothing about whether the code is issued.
pub fn is_valid_swift_code(code: &str) -> bool {
    swift_code_pattern().is_match(code)
}

pub fn is_headquarter_code(code: &str) -> bool {
    code.ends_with(HEADQUARTER_SUFFIX)
}

/// Derive the back-reference to the headquarters.
///
/// Headquarters have none. Branches take the first 8 characters; anything
/// shorter is a corrupt candidate.
pub fn derive_headquarter_code(code: &str, is_headquarter: bool) -> Result<Option<String>> {
    if is_headquarter {
        return Ok(None);
    }

    if code.chars().count() < HEADQUARTER_CODE_LEN {
        return Err(RegistryError::CodeTooShortForDerivation(code.to_string()));
    }

    Ok(Some(code.chars().take(HEADQUARTER_CODE_LEN).collect()))
}

// ============================================================================
// VALIDATE AND NORMALIZE
// ============================================================================

/// Turn a candidate into a record ready for the store.
///
/// Every check runs here, before any store call.
pub fn validate_and_normalize(candidate: &SwiftCodeCandidate) -> Result<SwiftCode> {
    let code = candidate.code.as_str();

    if !is_valid_swift_code(code) {
        return Err(RegistryError::InvalidFormat(code.to_string()));
    }

    let suffix_says_headquarter = is_headquarter_code(code);
    let is_headquarter = match candidate.is_headquarter {
        Some(flag) if flag != suffix_says_headquarter => {
            return Err(RegistryError::InconsistentHeadquarterFlag {
                code: code.to_string(),
                flag,
            });
        }
        Some(flag) => flag,
        None => suffix_says_headquarter,
    };

    let country_iso2 = candidate.country_iso2.trim().to_uppercase();
    let country_name = candidate.country_name.trim().to_uppercase();

    let headquarter_code = derive_headquarter_code(code, is_headquarter)?;

    check_bounded("bankName", &candidate.bank_name, BANK_NAME_MAX)?;
    check_bounded("countryISO2", &country_iso2, COUNTRY_ISO2_LEN)?;
    check_bounded("countryName", &country_name, COUNTRY_NAME_MAX)?;

    if country_iso2.chars().count() != COUNTRY_ISO2_LEN
        || !country_iso2.chars().all(|c| c.is_ascii_uppercase())
    {
        return Err(RegistryError::InvalidCountryCode(country_iso2));
    }

    Ok(SwiftCode {
        code: code.to_string(),
        bank_name: candidate.bank_name.clone(),
        address: candidate.address.clone().unwrap_or_default(),
        country_iso2,
        country_name,
        is_headquarter,
        headquarter_code,
        time_zone: None,
    })
}

fn check_bounded(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::FieldEmpty { field });
    }
    if value.chars().count() > max {
        return Err(RegistryError::FieldTooLong { field, max });
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(code: &str) -> SwiftCodeCandidate {
        SwiftCodeCandidate::new(code, "Test Bank", "us", "United States")
            .with_address("1 Main St")
    }

    #[test]
    fn test_valid_swift_code_formats() {
        assert!(is_valid_swift_code("BANKUS33"));
        assert!(is_valid_swift_code("BANKUS33XXX"));
        assert!(is_valid_swift_code("BANKUS3A1B2"));

        assert!(!is_valid_swift_code(""));
        assert!(!is_valid_swift_code("BANKUS3"));
        assert!(!is_valid_swift_code("BANKUS33XX"));
        assert!(!is_valid_swift_code("BANKUS33XXXX"));
        assert!(!is_valid_swift_code("bankus33xxx"));
        assert!(!is_valid_swift_code("BAN1US33XXX"));
        assert!(!is_valid_swift_code("BANKU533XXX"));
    }

    #[test]
    fn test_is_headquarter_code() {
        assert!(is_headquarter_code("BANKUS33XXX"));
        assert!(!is_headquarter_code("BANKUS33YYY"));
        assert!(!is_headquarter_code("BANKUS33"));
    }

    #[test]
    fn test_derive_headquarter_code() {
        assert_eq!(derive_headquarter_code("BANKUS33XXX", true).unwrap(), None);
        assert_eq!(
            derive_headquarter_code("BANKUS33YYY", false).unwrap(),
            Some("BANKUS33".to_string())
        );
        assert_eq!(
            derive_headquarter_code("BANKUS33", false).unwrap(),
            Some("BANKUS33".to_string())
        );

        let err = derive_headquarter_code("HSBC1", false).unwrap_err();
        assert!(matches!(err, RegistryError::CodeTooShortForDerivation(_)));
    }

    #[test]
    fn test_headquarter_candidate_has_no_headquarter_code() {
        let record =
            validate_and_normalize(&candidate("BANKUS33XXX").with_headquarter(true)).unwrap();

        assert!(record.is_headquarter);
        assert_eq!(record.headquarter_code, None);
    }

    #[test]
    fn test_branch_candidate_derives_headquarter_code() {
        let record =
            validate_and_normalize(&candidate("BANKUS33YYY").with_headquarter(false)).unwrap();

        assert!(!record.is_headquarter);
        assert_eq!(record.headquarter_code.as_deref(), Some("BANKUS33"));
    }

    #[test]
    fn test_flag_matches_suffix_after_validation() {
        for code in ["BANKUS33XXX", "BANKUS33YYY", "BANKUS33", "ABCDGB2L123"] {
            let record = validate_and_normalize(&candidate(code)).unwrap();
            assert_eq!(record.is_headquarter, code.ends_with("XXX"), "code {}", code);
        }
    }

    #[test]
    fn test_inconsistent_flag_rejected() {
        let err =
            validate_and_normalize(&candidate("BANKUS33XXX").with_headquarter(false)).unwrap_err();
        assert!(matches!(err, RegistryError::InconsistentHeadquarterFlag { flag: false, .. }));

        let err =
            validate_and_normalize(&candidate("BANKUS33YYY").with_headquarter(true)).unwrap_err();
        assert!(matches!(err, RegistryError::InconsistentHeadquarterFlag { flag: true, .. }));
    }

    #[test]
    fn test_invalid_format_checked_first() {
        let mut bad = candidate("BANK");
        bad.bank_name = String::new();

        let err = validate_and_normalize(&bad).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFormat(_)));
    }

    #[test]
    fn test_country_fields_uppercased() {
        let record = validate_and_normalize(&candidate("BANKUS33XXX")).unwrap();

        assert_eq!(record.country_iso2, "US");
        assert_eq!(record.country_name, "UNITED STATES");
        assert_eq!(record.bank_name, "Test Bank");
        assert_eq!(record.address, "1 Main St");
    }

    #[test]
    fn test_missing_address_becomes_empty() {
        let candidate = SwiftCodeCandidate::new("BANKUS33XXX", "Test Bank", "US", "United States");
        let record = validate_and_normalize(&candidate).unwrap();
        assert_eq!(record.address, "");
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut c = candidate("BANKUS33XXX");
        c.bank_name = "   ".to_string();
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::FieldEmpty { field: "bankName" }
        ));

        let mut c = candidate("BANKUS33XXX");
        c.country_iso2 = String::new();
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::FieldEmpty { field: "countryISO2" }
        ));

        let mut c = candidate("BANKUS33XXX");
        c.country_name = String::new();
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::FieldEmpty { field: "countryName" }
        ));
    }

    #[test]
    fn test_length_bounds() {
        let mut c = candidate("BANKUS33XXX");
        c.bank_name = "B".repeat(BANK_NAME_MAX);
        assert!(validate_and_normalize(&c).is_ok());

        c.bank_name = "B".repeat(BANK_NAME_MAX + 1);
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::FieldTooLong { field: "bankName", max: 100 }
        ));

        let mut c = candidate("BANKUS33XXX");
        c.country_name = "N".repeat(COUNTRY_NAME_MAX + 1);
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::FieldTooLong { field: "countryName", max: 50 }
        ));

        let mut c = candidate("BANKUS33XXX");
        c.country_iso2 = "USA".to_string();
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::FieldTooLong { field: "countryISO2", max: 2 }
        ));
    }

    #[test]
    fn test_country_code_must_be_two_letters() {
        let mut c = candidate("BANKUS33XXX");
        c.country_iso2 = "U".to_string();
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::InvalidCountryCode(_)
        ));

        c.country_iso2 = "U1".to_string();
        assert!(matches!(
            validate_and_normalize(&c).unwrap_err(),
            RegistryError::InvalidCountryCode(_)
        ));
    }
}
