//! Static mapping between numeric 8-K disclosure item codes, their dash-form
//! labels, and the standard's human-readable titles.
//!
//! The table is immutable and built once per process. The section retrieval
//! service addresses items by dash label (`"1-1"`), while upstream filing
//! discovery reports numeric codes (`"1.01"`); [`label_for`] bridges the two
//! and fails predictably for codes outside the standard.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::errors::IngestError;

/// `(numeric code, dash label, standard title)` rows for Form 8-K items.
const ITEM_TABLE: &[(&str, &str, &str)] = &[
    ("1.01", "1-1", "Entry into a Material Definitive Agreement"),
    ("1.02", "1-2", "Termination of a Material Definitive Agreement"),
    ("1.03", "1-3", "Bankruptcy or Receivership"),
    (
        "1.04",
        "1-4",
        "Mine Safety - Reporting of Shutdowns and Patterns of Violations",
    ),
    ("2.01", "2-1", "Completion of Acquisition or Disposition of Assets"),
    ("2.02", "2-2", "Results of Operations and Financial Condition"),
    (
        "2.03",
        "2-3",
        "Creation of a Direct Financial Obligation or an Obligation under an Off-Balance Sheet Arrangement of a Registrant",
    ),
    (
        "2.04",
        "2-4",
        "Triggering Events That Accelerate or Increase a Direct Financial Obligation or an Obligation under an Off-Balance Sheet Arrangement",
    ),
    ("2.05", "2-5", "Cost Associated with Exit or Disposal Activities"),
    ("2.06", "2-6", "Material Impairments"),
    (
        "3.01",
        "3-1",
        "Notice of Delisting or Failure to Satisfy a Continued Listing Rule or Standard; Transfer of Listing",
    ),
    ("3.02", "3-2", "Unregistered Sales of Equity Securities"),
    (
        "3.03",
        "3-3",
        "Material Modifications to Rights of Security Holders",
    ),
    ("4.01", "4-1", "Changes in Registrant's Certifying Accountant"),
    (
        "4.02",
        "4-2",
        "Non-Reliance on Previously Issued Financial Statements or a Related Audit Report or Completed Interim Review",
    ),
    ("5.01", "5-1", "Changes in Control of Registrant"),
    (
        "5.02",
        "5-2",
        "Departure of Directors or Certain Officers; Election of Directors; Appointment of Certain Officers; Compensatory Arrangements of Certain Officers",
    ),
    (
        "5.03",
        "5-3",
        "Amendments to Articles of Incorporation or Bylaws; Change in Fiscal Year",
    ),
    (
        "5.04",
        "5-4",
        "Temporary Suspension of Trading Under Registrant's Employee Benefit Plans",
    ),
    (
        "5.05",
        "5-5",
        "Amendment to Registrant's Code of Ethics, or Waiver of a Provision of the Code of Ethics",
    ),
    ("5.06", "5-6", "Change in Shell Company Status"),
    ("5.07", "5-7", "Submission of Matters to a Vote of Security Holders"),
    ("5.08", "5-8", "Shareholder Director Nominations"),
    ("6.01", "6-1", "ABS Informational and Computational Material"),
    ("6.02", "6-2", "Change of Servicer or Trustee"),
    ("6.03", "6-3", "Change in Credit Enhancement or Other External Support"),
    ("6.04", "6-4", "Failure to Make a Required Distribution"),
    ("6.05", "6-5", "Securities Act Updating Disclosure"),
    ("7.01", "7-1", "Regulation FD Disclosure"),
    ("8.01", "8-1", "Other Events"),
    ("9.01", "9-1", "Financial Statements and Exhibits"),
];

struct ItemCodeMap {
    by_code: HashMap<&'static str, &'static str>,
    by_label: HashMap<&'static str, (&'static str, &'static str)>,
}

fn map() -> &'static ItemCodeMap {
    static MAP: OnceLock<ItemCodeMap> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut by_code = HashMap::with_capacity(ITEM_TABLE.len());
        let mut by_label = HashMap::with_capacity(ITEM_TABLE.len());
        for (code, label, title) in ITEM_TABLE {
            by_code.insert(*code, *label);
            by_label.insert(*label, (*code, *title));
        }
        ItemCodeMap { by_code, by_label }
    })
}

/// Translate a numeric item code (`"1.01"`) into its dash label (`"1-1"`).
///
/// Returns [`IngestError::UnknownItemCode`] when the code is not part of the
/// Form 8-K standard, so a bad upstream payload surfaces as an identifiable
/// error instead of a silent missing label.
pub fn label_for(code: &str) -> Result<&'static str, IngestError> {
    map()
        .by_code
        .get(code)
        .copied()
        .ok_or_else(|| IngestError::UnknownItemCode {
            code: code.to_string(),
        })
}

/// Reverse lookup: numeric code for a dash label.
pub fn code_for(label: &str) -> Option<&'static str> {
    map().by_label.get(label).map(|(code, _)| *code)
}

/// Human-readable standard title for a dash label.
pub fn title_for(label: &str) -> Option<&'static str> {
    map().by_label.get(label).map(|(_, title)| *title)
}

/// Translate a slice of numeric codes, failing on the first unknown one.
pub fn labels_for(codes: &[String]) -> Result<Vec<&'static str>, IngestError> {
    codes.iter().map(|code| label_for(code)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        assert_eq!(label_for("1.01").unwrap(), "1-1");
        assert_eq!(label_for("9.01").unwrap(), "9-1");
        assert_eq!(code_for("5-7"), Some("5.07"));
        assert_eq!(
            title_for("1-1"),
            Some("Entry into a Material Definitive Agreement")
        );
    }

    #[test]
    fn unknown_code_is_an_identifiable_error() {
        let err = label_for("4.03").unwrap_err();
        match err {
            IngestError::UnknownItemCode { code } => assert_eq!(code, "4.03"),
            other => panic!("expected UnknownItemCode, got {other:?}"),
        }
    }

    #[test]
    fn batch_translation_fails_on_first_unknown() {
        let codes = vec!["1.01".to_string(), "9.99".to_string()];
        assert!(labels_for(&codes).is_err());

        let codes = vec!["2.02".to_string(), "9.01".to_string()];
        assert_eq!(labels_for(&codes).unwrap(), vec!["2-2", "9-1"]);
    }

    #[test]
    fn table_is_internally_consistent() {
        for (code, label, _) in ITEM_TABLE {
            assert_eq!(label_for(code).unwrap(), *label);
            assert_eq!(code_for(label), Some(*code));
            assert!(title_for(label).is_some());
        }
    }
}
