//! FedRAMP baseline control lists.

use std::collections::BTreeSet;

use super::types::BaselineLevel;

const LOW: &[&str] = &[
    "AC-02", "AC-03", "AC-17", "AC-22", "AU-02", "AU-04", "AU-06", "CM-02", "CM-06", "CM-08",
    "CP-09", "CP-10", "IA-02", "IA-05", "MP-07", "PE-02", "SC-07", "SC-08", "SC-13", "SI-02",
    "SI-03", "SI-04",
];

// Family prefix followed by the control numbers in that family.
const MODERATE: &[(&str, &[u8])] = &[
    ("AC", &[1, 2, 3, 4, 5, 6, 7, 8, 11, 12, 14, 17, 18, 19, 20, 22]),
    ("AT", &[1, 2, 3, 4]),
    ("AU", &[1, 2, 3, 4, 5, 6, 8, 9, 11, 12]),
    ("CA", &[1, 2, 3, 5, 6, 7, 9]),
    ("CM", &[1, 2, 3, 4, 5, 6, 7, 8, 10, 11]),
    ("CP", &[1, 2, 3, 4, 6, 7, 8, 9, 10]),
    ("IA", &[1, 2, 3, 4, 5, 6, 7, 8]),
    ("IR", &[1, 2, 4, 5, 6, 7, 8]),
    ("MA", &[1, 2, 3, 4, 5, 6]),
    ("MP", &[1, 2, 3, 4, 5, 6, 7]),
    ("PE", &[1, 2, 3, 4, 5, 6, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17]),
    ("PL", &[1, 2, 4, 8]),
    ("PS", &[1, 2, 3, 4, 5, 6, 7, 8]),
    ("RA", &[1, 2, 3, 5]),
    ("SA", &[1, 2, 3, 4, 5, 8, 9, 10, 11]),
    ("SC", &[1, 2, 4, 5, 7, 8, 10, 12, 13, 15, 17, 18, 19, 20, 21, 22, 23, 39]),
    ("SI", &[1, 2, 3, 4, 5, 7, 8, 10, 11, 12, 16]),
];

/// Control ids (`AC-02` form) required by a FedRAMP baseline.
///
/// No list is embedded for the High baseline; it returns the Moderate list,
/// which High is a superset of.
pub fn fedramp_baseline(level: BaselineLevel) -> BTreeSet<String> {
    match level {
        BaselineLevel::Low => LOW.iter().map(|id| id.to_string()).collect(),
        BaselineLevel::Moderate | BaselineLevel::High => MODERATE
            .iter()
            .flat_map(|(family, numbers)| {
                numbers.iter().map(move |n| format!("{}-{:02}", family, n))
            })
            .collect(),
    }
}

/// Canonical form of a control id for baseline comparison: `ac-2` and
/// `AC-02` both become `AC-02`. Ids without a numeric suffix are upper-cased.
pub fn canonical_control_id(id: &str) -> String {
    let id = id.trim().to_ascii_uppercase();
    match id.split_once('-') {
        Some((family, rest)) => {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            match digits.parse::<u32>() {
                Ok(n) => format!("{}-{:02}{}", family, n, &rest[digits.len()..]),
                Err(_) => id,
            }
        }
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_baseline() {
        let low = fedramp_baseline(BaselineLevel::Low);
        assert_eq!(low.len(), 22);
        assert!(low.contains("SI-04"));
    }

    #[test]
    fn test_moderate_baseline_is_superset_of_low() {
        let low = fedramp_baseline(BaselineLevel::Low);
        let moderate = fedramp_baseline(BaselineLevel::Moderate);
        assert!(moderate.contains("SC-39"));
        assert!(moderate.contains("PE-17"));
        assert!(!moderate.contains("PE-07"));
        assert!(low.is_subset(&moderate));
    }

    #[test]
    fn test_canonical_control_id() {
        assert_eq!(canonical_control_id("ac-2"), "AC-02");
        assert_eq!(canonical_control_id("AC-17"), "AC-17");
        assert_eq!(canonical_control_id("AC-2(1)"), "AC-02(1)");
        assert_eq!(canonical_control_id("GDPR-ART-25"), "GDPR-ART-25");
        assert_eq!(canonical_control_id("nodash"), "NODASH");
    }
}
