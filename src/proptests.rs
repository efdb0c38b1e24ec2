//! Property-based tests for repository identity and descriptor resolution.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::application::parse_applications;
    use crate::git::normalize_repo_url;
    use proptest::prelude::*;

    // ============================================================================
    // normalize_repo_url property tests
    // ============================================================================

    proptest! {
        /// Property: normalization is total and deterministic
        #[test]
        fn normalize_is_deterministic(input in ".*") {
            let first = normalize_repo_url(&input);
            let second = normalize_repo_url(&input);
            prop_assert_eq!(first, second);
        }

        /// Property: normalizing twice changes nothing further
        #[test]
        fn normalize_is_idempotent(input in ".*") {
            let once = normalize_repo_url(&input);
            prop_assert_eq!(normalize_repo_url(&once), once.clone());
        }

        /// Property: https, http and scp-like spellings agree
        #[test]
        fn normalize_schemes_agree(
            host in "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5}){1,2}",
            path in "[a-z][a-z0-9_-]{0,10}(/[a-z][a-z0-9_-]{0,10}){0,3}",
        ) {
            let scp = format!("git@{}:{}", host, path);
            prop_assert_eq!(normalize_repo_url(&format!("https://{}/{}", host, path)), scp.clone());
            prop_assert_eq!(normalize_repo_url(&format!("http://{}/{}", host, path)), scp.clone());
            prop_assert_eq!(normalize_repo_url(&scp), scp);
        }
    }

    // ============================================================================
    // values-file ordering property tests
    // ============================================================================

    fn application_with_values(indices: &[usize]) -> String {
        let mut yaml = String::from(
            "apiVersion: argoproj.io/v1alpha1\nkind: Application\nmetadata:\n  name: app\n  annotations: {rawRepository: repo, rawPath: svc}\nspec:\n  source:\n    plugin:\n      env:\n",
        );
        for index in indices {
            yaml.push_str(&format!(
                "        - {{name: WERF_VALUES_{index}, value: values-{index}.yaml}}\n"
            ));
        }
        yaml
    }

    proptest! {
        /// Property: values files come out in ascending index order whatever the input order
        #[test]
        fn values_files_sorted_for_any_permutation(
            indices in Just((0usize..12).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let apps = parse_applications(application_with_values(&indices).as_bytes()).unwrap();
            let expected: Vec<String> = (0..12).map(|i| format!("values-{}.yaml", i)).collect();
            prop_assert_eq!(&apps[0].values_files, &expected);
        }
    }
}
