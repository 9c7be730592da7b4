// 🏦 SWIFT Code Entity
//
// One record per code. The code is the identity; nothing is mutated after
// insert ("update" is delete + re-create).
//
// Headquarters vs branch:
// - "BANKUS33XXX" → headquarters (suffix XXX), no headquarter_code
// - "BANKUS33YYY" → branch, headquarter_code = "BANKUS33"

use serde::{Deserialize, Serialize};

// ============================================================================
// RECORD
// ============================================================================

/// A stored SWIFT code record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwiftCode {
    #[serde(rename = "swiftCode")]
    pub code: String,

    #[serde(rename = "bankName")]
    pub bank_name: String,

    #[serde(default)]
    pub address: String,

    #[serde(rename = "countryISO2")]
    pub country_iso2: String,

    #[serde(rename = "countryName")]
    pub country_name: String,

    #[serde(rename = "isHeadquarter")]
    pub is_headquarter: bool,

    /// First 8 characters of `code` for branches, `None` for headquarters.
    /// Back-reference only: the headquarters record need not exist.
    #[serde(rename = "headquarterCode", skip_serializing_if = "Option::is_none", default)]
    pub headquarter_code: Option<String>,

    /// Only populated by the spreadsheet import
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none", default)]
    pub time_zone: Option<String>,
}

impl SwiftCode {
    /// The 8-character prefix that branches of this code point back to
    pub fn branch_prefix(&self) -> String {
        self.code.chars().take(8).collect()
    }
}

// ============================================================================
// CANDIDATE (what callers submit for creation)
// ============================================================================

/// A record proposed for insertion, before validation.
///
/// `is_headquarter` is optional: when the caller supplies it, it is checked
/// against the code's suffix; when absent, it is derived from the suffix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwiftCodeCandidate {
    #[serde(rename = "swiftCode", default)]
    pub code: String,

    #[serde(rename = "bankName", default)]
    pub bank_name: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(rename = "countryISO2", default)]
    pub country_iso2: String,

    #[serde(rename = "countryName", default)]
    pub country_name: String,

    #[serde(rename = "isHeadquarter", default)]
    pub is_headquarter: Option<bool>,
}

impl SwiftCodeCandidate {
    pub fn new(
        code: impl Into<String>,
        bank_name: impl Into<String>,
        country_iso2: impl Into<String>,
        country_name: impl Into<String>,
    ) -> Self {
        SwiftCodeCandidate {
            code: code.into(),
            bank_name: bank_name.into(),
            address: None,
            country_iso2: country_iso2.into(),
            country_name: country_name.into(),
            is_headquarter: None,
        }
    }

    /// Builder pattern: add address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Builder pattern: state the headquarter flag explicitly
    pub fn with_headquarter(mut self, is_headquarter: bool) -> Self {
        self.is_headquarter = Some(is_headquarter);
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
