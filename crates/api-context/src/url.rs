//! Request path rules for the web and OCS front controllers

use bdd_core::endpoints::{INDEX_PREFIX, OCS_PREFIX};

/// Route a step URL to its front controller.
///
/// A missing leading slash is added, and anything that is not already an OCS
/// path goes through `/index.php`.
pub fn normalize_path(url: &str) -> String {
    let mut path = if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{url}")
    };
    if !path.contains(OCS_PREFIX) {
        path.insert_str(0, INDEX_PREFIX);
    }
    path
}

pub fn ocs_path(url: &str) -> String {
    format!("{OCS_PREFIX}{url}")
}

pub fn full_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn web_paths_go_through_index() {
        assert_eq!(normalize_path("apps/files"), "/index.php/apps/files");
        assert_eq!(normalize_path("/apps/files"), "/index.php/apps/files");
    }

    #[test]
    fn ocs_paths_are_left_alone() {
        let path = normalize_path(&ocs_path("/cloud/users/test"));
        assert_eq!(path, "/ocs/v2.php/cloud/users/test");
    }

    #[test]
    fn trailing_slash_on_base_is_dropped() {
        assert_eq!(
            full_url("http://127.0.0.1:8080/", "/index.php/login"),
            "http://127.0.0.1:8080/index.php/login"
        );
    }

    proptest! {
        #[test]
        fn normalized_paths_are_absolute(url in "[a-z/]{0,20}") {
            let path = normalize_path(&url);
            prop_assert!(path.starts_with('/'));
            prop_assert!(path.starts_with(INDEX_PREFIX) || path.contains(OCS_PREFIX));
        }
    }
}
