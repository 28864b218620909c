// Property tests for case identifier inference

use fcsmeta_core::columns::{plan_columns, CASE_NUMBER};
use proptest::prelude::*;

fn declared() -> Vec<String> {
    vec!["case_number".to_string(), "category".to_string()]
}

/// Randomly upper/lower-case each character of `s`.
fn recase(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_case_prefix_is_found_in_any_casing(
        mask in proptest::collection::vec(any::<bool>(), 1..8),
        suffix in "[A-Za-z_]{0,8}",
        leading in proptest::collection::vec("[d-z][a-z]{2,6}", 0..3),
    ) {
        let case_header = format!("{}{}", recase("case", &mask), suffix);
        let mut headers = leading.clone();
        let case_index = headers.len();
        headers.push(case_header.clone());
        headers.push("Category".to_string());

        let plan = plan_columns("input.tsv", &headers, &declared()).unwrap();

        prop_assert_eq!(&plan.case_source, &case_header);
        prop_assert_eq!(plan.headers[case_index].as_str(), CASE_NUMBER);
        prop_assert!(plan.keep.contains(&CASE_NUMBER.to_string()));
        prop_assert!(plan.keep.contains(&"category".to_string()));
    }

    #[test]
    fn prop_kept_columns_are_always_declared(
        headers in proptest::collection::vec("[a-z_]{1,10}", 1..6),
    ) {
        let mut headers = headers;
        headers.push("case_id".to_string());
        let plan = plan_columns("input.tsv", &headers, &declared()).unwrap();
        for column in &plan.keep {
            prop_assert!(declared().contains(column));
        }
    }
}
