// 🔎 Code Resolution Engine
//
// Read side: joins a headquarters with its branches (computed through the
// headquarter_code index, never stored as a collection).
// Write side: validates before touching the store, then records an event.

use crate::db::{Event, SwiftCodeStore, ENTITY_SWIFT_CODE};
use crate::entities::{SwiftCode, SwiftCodeCandidate};
use crate::error::{RegistryError, Result};
use crate::rules::validate_and_normalize;
use serde::{Deserialize, Serialize};

pub const ACTOR_API: &str = "api";

// ============================================================================
// VIEWS
// ============================================================================

/// Full view of one code; `branches` only exists for headquarters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailView {
    pub address: String,
    #[serde(rename = "bankName")]
    pub bank_name: String,
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    #[serde(rename = "countryName")]
    pub country_name: String,
    #[serde(rename = "isHeadquarter")]
    pub is_headquarter: bool,
    #[serde(rename = "swiftCode")]
    pub swift_code: String,
    /// `None` for a branch, `Some(vec![])` for a headquarters without branches
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub branches: Option<Vec<BranchView>>,
}

/// Reduced view of a branch nested under its headquarters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchView {
    pub address: String,
    #[serde(rename = "bankName")]
    pub bank_name: String,
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    #[serde(rename = "isHeadquarter")]
    pub is_headquarter: bool,
    #[serde(rename = "swiftCode")]
    pub swift_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryView {
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    #[serde(rename = "countryName")]
    pub country_name: String,
    #[serde(rename = "swiftCodes")]
    pub swift_codes: Vec<CountryCodeView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCodeView {
    pub address: String,
    #[serde(rename = "bankName")]
    pub bank_name: String,
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    #[serde(rename = "isHeadquarter")]
    pub is_headquarter: bool,
    #[serde(rename = "swiftCode")]
    pub swift_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
}

impl Confirmation {
    fn new(message: &str) -> Self {
        Confirmation {
            message: message.to_string(),
        }
    }
}

impl From<&SwiftCode> for BranchView {
    fn from(record: &SwiftCode) -> Self {
        BranchView {
            address: record.address.clone(),
            bank_name: record.bank_name.clone(),
            country_iso2: record.country_iso2.clone(),
            // Always false in this view, whatever the stored row says
            is_headquarter: false,
            swift_code: record.code.clone(),
        }
    }
}

impl From<SwiftCode> for CountryCodeView {
    fn from(record: SwiftCode) -> Self {
        CountryCodeView {
            address: record.address,
            bank_name: record.bank_name,
            country_iso2: record.country_iso2,
            is_headquarter: record.is_headquarter,
            swift_code: record.code,
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// The resolution engine over any store implementation
pub struct Registry<S> {
    store: S,
}

impl<S: SwiftCodeStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Registry { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up one code; headquarters come back with their branches.
    ///
    /// Exact, case-sensitive match against the stored code.
    pub fn resolve_details(&self, code: &str) -> Result<DetailView> {
        let record = self
            .store
            .get(code)?
            .ok_or_else(|| RegistryError::NotFound(format!("SWIFT code not found: {}", code)))?;

        let branches = if record.is_headquarter {
            let branches = self.store.get_by_headquarter_code(&record.branch_prefix())?;
            tracing::debug!(swift_code = %code, branches = branches.len(), "Resolved headquarters");
            Some(branches.iter().map(BranchView::from).collect())
        } else {
            None
        };

        Ok(DetailView {
            address: record.address,
            bank_name: record.bank_name,
            country_iso2: record.country_iso2,
            country_name: record.country_name,
            is_headquarter: record.is_headquarter,
            swift_code: record.code,
            branches,
        })
    }

    /// All codes for a country (case-insensitive ISO2).
    ///
    /// The country name comes from the first record in store order; records
    /// that disagree on the name are not reconciled. A country with no codes
    /// is reported as `NotFound`, same as an unknown country.
    pub fn resolve_by_country(&self, country_iso2: &str) -> Result<CountryView> {
        let country_iso2 = country_iso2.trim().to_uppercase();
        let records = self.store.get_by_country(&country_iso2)?;

        let country_name = match records.first() {
            Some(first) => first.country_name.clone(),
            None => {
                return Err(RegistryError::NotFound(format!(
                    "No SWIFT codes found for country: {}",
                    country_iso2
                )))
            }
        };

        tracing::debug!(country = %country_iso2, codes = records.len(), "Resolved country");

        Ok(CountryView {
            country_iso2,
            country_name,
            swift_codes: records.into_iter().map(CountryCodeView::from).collect(),
        })
    }

    /// Validate, then insert. Nothing is written if validation fails.
    pub fn create(&self, candidate: &SwiftCodeCandidate) -> Result<Confirmation> {
        let record = validate_and_normalize(candidate)?;
        self.store.insert(&record)?;

        tracing::info!(
            swift_code = %record.code,
            headquarter = record.is_headquarter,
            "SWIFT code added"
        );
        self.audit(Event::new(
            "swift_code_added",
            ENTITY_SWIFT_CODE,
            &record.code,
            serde_json::json!({
                "bank_name": record.bank_name,
                "country_iso2": record.country_iso2,
                "is_headquarter": record.is_headquarter,
                "headquarter_code": record.headquarter_code,
            }),
            ACTOR_API,
        ));

        Ok(Confirmation::new("SWIFT code added successfully"))
    }

    /// Delete one code. Branches of a deleted headquarters are left in place.
    pub fn remove(&self, code: &str) -> Result<Confirmation> {
        let record = self
            .store
            .get(code)?
            .ok_or_else(|| RegistryError::NotFound(format!("SWIFT code not found: {}", code)))?;

        if !self.store.delete(&record.code)? {
            return Err(RegistryError::NotFound(format!("SWIFT code not found: {}", code)));
        }

        tracing::info!(swift_code = %record.code, "SWIFT code deleted");
        self.audit(Event::new(
            "swift_code_deleted",
            ENTITY_SWIFT_CODE,
            &record.code,
            serde_json::json!({
                "bank_name": record.bank_name,
                "country_iso2": record.country_iso2,
            }),
            ACTOR_API,
        ));

        Ok(Confirmation::new("SWIFT code deleted successfully"))
    }

    /// Audit trail for a code, newest first. Survives deletion.
    pub fn history(&self, code: &str) -> Result<Vec<Event>> {
        self.store.events_for(code)
    }

    pub fn count(&self) -> Result<i64> {
        self.store.count()
    }

    // The mutation has already happened; a failed audit write must not undo it.
    fn audit(&self, event: Event) {
        if let Err(e) = self.store.record_event(&event) {
            tracing::error!(
                event_type = %event.event_type,
                entity_id = %event.entity_id,
                error = %e,
                "Failed to record audit event"
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    fn registry() -> Registry<SqliteStore> {
        Registry::new(SqliteStore::open_in_memory().unwrap())
    }

    fn candidate(code: &str, is_headquarter: bool) -> SwiftCodeCandidate {
        SwiftCodeCandidate::new(code, "Test Bank", "US", "United States")
            .with_address("123 Bank Street")
            .with_headquarter(is_headquarter)
    }

    #[test]
    fn test_headquarters_then_branch_scenario() {
        let registry = registry();

        let confirmation = registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        assert_eq!(confirmation.message, "SWIFT code added successfully");

        let view = registry.resolve_details("BANKUS33XXX").unwrap();
        assert!(view.is_headquarter);
        assert_eq!(view.country_name, "UNITED STATES");
        assert_eq!(view.branches, Some(vec![]));

        registry.create(&candidate("BANKUS33YYY", false)).unwrap();
        let branch = registry.store().get("BANKUS33YYY").unwrap().unwrap();
        assert_eq!(branch.headquarter_code.as_deref(), Some("BANKUS33"));

        let view = registry.resolve_details("BANKUS33XXX").unwrap();
        let branches = view.branches.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].swift_code, "BANKUS33YYY");
        assert!(!branches[0].is_headquarter);
        assert_eq!(branches[0].address, "123 Bank Street");
    }

    #[test]
    fn test_branch_details_have_no_branch_list() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        registry.create(&candidate("BANKUS33YYY", false)).unwrap();

        let view = registry.resolve_details("BANKUS33YYY").unwrap();

        assert!(!view.is_headquarter);
        assert_eq!(view.branches, None);
    }

    #[test]
    fn test_branch_list_contains_exactly_matching_prefix() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        registry.create(&candidate("BANKUS33AAA", false)).unwrap();
        registry.create(&candidate("BANKUS33BBB", false)).unwrap();
        registry.create(&candidate("BANKUS44CCC", false)).unwrap();
        registry.create(&candidate("OTHRUS33DDD", false)).unwrap();

        let view = registry.resolve_details("BANKUS33XXX").unwrap();
        let mut codes: Vec<String> = view
            .branches
            .unwrap()
            .into_iter()
            .map(|b| b.swift_code)
            .collect();
        codes.sort();

        assert_eq!(codes, vec!["BANKUS33AAA", "BANKUS33BBB"]);
    }

    #[test]
    fn test_branch_view_forces_headquarter_false() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();

        // A corrupt row flagged as headquarters but carrying a back-reference
        registry
            .store()
            .insert(&SwiftCode {
                code: "BANKUS33ZZZ".to_string(),
                bank_name: "Odd Bank".to_string(),
                address: String::new(),
                country_iso2: "US".to_string(),
                country_name: "UNITED STATES".to_string(),
                is_headquarter: true,
                headquarter_code: Some("BANKUS33".to_string()),
                time_zone: None,
            })
            .unwrap();

        let branches = registry.resolve_details("BANKUS33XXX").unwrap().branches.unwrap();
        assert_eq!(branches.len(), 1);
        assert!(!branches[0].is_headquarter);
    }

    #[test]
    fn test_details_not_found_and_case_sensitive() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();

        assert!(matches!(
            registry.resolve_details("NOPEUS33XXX").unwrap_err(),
            RegistryError::NotFound(_)
        ));
        assert!(matches!(
            registry.resolve_details("bankus33xxx").unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_country_lookup_is_case_insensitive() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        registry.create(&candidate("BANKUS33YYY", false)).unwrap();

        let upper = registry.resolve_by_country("US").unwrap();
        let lower = registry.resolve_by_country("us").unwrap();

        assert_eq!(upper, lower);
        assert_eq!(upper.country_iso2, "US");
        assert_eq!(upper.swift_codes.len(), 2);
        assert!(upper.swift_codes[0].is_headquarter);
        assert!(!upper.swift_codes[1].is_headquarter);
    }

    #[test]
    fn test_country_name_taken_from_first_record() {
        let registry = registry();
        registry
            .store()
            .insert(&SwiftCode {
                code: "FRSTUS33XXX".to_string(),
                bank_name: "First".to_string(),
                address: String::new(),
                country_iso2: "US".to_string(),
                country_name: "UNITED STATES".to_string(),
                is_headquarter: true,
                headquarter_code: None,
                time_zone: None,
            })
            .unwrap();
        registry
            .store()
            .insert(&SwiftCode {
                code: "SCNDUS33XXX".to_string(),
                bank_name: "Second".to_string(),
                address: String::new(),
                country_iso2: "US".to_string(),
                country_name: "USA".to_string(),
                is_headquarter: true,
                headquarter_code: None,
                time_zone: None,
            })
            .unwrap();

        let view = registry.resolve_by_country("US").unwrap();

        assert_eq!(view.country_name, "UNITED STATES");
        assert_eq!(view.swift_codes.len(), 2);
    }

    #[test]
    fn test_unknown_country_not_found() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();

        assert!(matches!(
            registry.resolve_by_country("ZZ").unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_inconsistent_flag_writes_nothing() {
        let registry = registry();

        let err = registry.create(&candidate("BANKUS33XXX", false)).unwrap_err();

        assert!(matches!(err, RegistryError::InconsistentHeadquarterFlag { .. }));
        assert_eq!(registry.count().unwrap(), 0);
        assert!(registry.history("BANKUS33XXX").unwrap().is_empty());
    }

    #[test]
    fn test_create_existing_code_conflicts() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();

        let err = registry.create(&candidate("BANKUS33XXX", true)).unwrap_err();

        assert!(matches!(err, RegistryError::AlreadyExists(_)));
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn test_delete_twice() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();

        let confirmation = registry.remove("BANKUS33XXX").unwrap();
        assert_eq!(confirmation.message, "SWIFT code deleted successfully");

        assert!(matches!(
            registry.remove("BANKUS33XXX").unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_deleting_headquarters_orphans_branches() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        registry.create(&candidate("BANKUS33YYY", false)).unwrap();

        registry.remove("BANKUS33XXX").unwrap();

        let branch = registry.resolve_details("BANKUS33YYY").unwrap();
        assert_eq!(branch.swift_code, "BANKUS33YYY");
        assert_eq!(
            registry.store().get("BANKUS33YYY").unwrap().unwrap().headquarter_code.as_deref(),
            Some("BANKUS33")
        );
    }

    #[test]
    fn test_history_records_add_and_delete() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        registry.remove("BANKUS33XXX").unwrap();

        let history = registry.history("BANKUS33XXX").unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, "swift_code_deleted");
        assert_eq!(history[1].event_type, "swift_code_added");
        assert_eq!(history[1].actor, ACTOR_API);
    }

    #[test]
    fn test_detail_view_serialization() {
        let registry = registry();
        registry.create(&candidate("BANKUS33XXX", true)).unwrap();
        registry.create(&candidate("BANKUS33YYY", false)).unwrap();

        let hq = serde_json::to_value(registry.resolve_details("BANKUS33XXX").unwrap()).unwrap();
        assert_eq!(hq["isHeadquarter"], true);
        assert_eq!(hq["countryISO2"], "US");
        assert_eq!(hq["branches"][0]["swiftCode"], "BANKUS33YYY");

        let branch =
            serde_json::to_value(registry.resolve_details("BANKUS33YYY").unwrap()).unwrap();
        assert!(branch.get("branches").is_none());
    }
}
