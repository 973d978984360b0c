//! Install + test command construction per target language (§6's `target_language` parameter).
//!
//! Defaults to the Python/pytest profile the corpus's own test-running code assumes; other
//! languages get a reasonable idiomatic equivalent. Unknown languages fall back to Python.

pub struct TestProfile {
    /// Zero or more install steps, run in order before `test_cmd`.
    pub install_cmd: Vec<Vec<String>>,
    pub test_cmd: Vec<String>,
}

#[must_use]
pub fn for_language(language: &str, rel_test_path: Option<&str>) -> TestProfile {
    match language {
        "node" | "javascript" | "typescript" => TestProfile {
            install_cmd: vec![vec!["npm".into(), "install".into()]],
            test_cmd: match rel_test_path {
                Some(path) => vec!["npx".into(), "jest".into(), path.to_string()],
                None => vec!["npx".into(), "jest".into()],
            },
        },
        "rust" => TestProfile {
            install_cmd: Vec::new(),
            test_cmd: vec!["cargo".into(), "test".into()],
        },
        _ => TestProfile {
            // Project-declared dependencies first, then the pinned test framework itself: the
            // base image carries no pytest, so this step is mandatory even when requirements.txt
            // is absent or empty.
            install_cmd: vec![
                vec![
                    "pip".into(),
                    "install".into(),
                    "-r".into(),
                    "requirements.txt".into(),
                    "||".into(),
                    "true".into(),
                ],
                vec!["pip".into(), "install".into(), "pytest".into()],
            ],
            test_cmd: match rel_test_path {
                Some(path) => vec![
                    "python".into(),
                    "-m".into(),
                    "pytest".into(),
                    path.to_string(),
                    "-v".into(),
                    "--tb=short".into(),
                ],
                None => vec![
                    "python".into(),
                    "-m".into(),
                    "pytest".into(),
                    "-v".into(),
                    "--tb=short".into(),
                ],
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_python() {
        let profile = for_language("cobol", None);
        assert_eq!(profile.test_cmd[0], "python");
    }

    #[test]
    fn rust_profile_has_no_install_step() {
        let profile = for_language("rust", None);
        assert!(profile.install_cmd.is_empty());
    }

    #[test]
    fn python_profile_installs_pytest_unconditionally_after_requirements() {
        let profile = for_language("python", None);
        assert_eq!(profile.install_cmd.len(), 2);
        assert!(profile.install_cmd[0].contains(&"||".to_string()));
        assert_eq!(profile.install_cmd[1], vec!["pip", "install", "pytest"]);
    }
}
