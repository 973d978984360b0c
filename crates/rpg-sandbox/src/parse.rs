//! Parses `<N> passed`, `<N> failed` out of merged stdout/stderr (§4.4).
//!
//! Mirrors the token-scan used by the system this was distilled from: split each line on
//! whitespace, and whenever a token is exactly "passed" or "failed", take the previous token as
//! the count. Non-numeric counts are skipped rather than treated as a parse error.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[must_use]
pub fn parse_test_counts(output: &str) -> TestCounts {
    let mut passed = 0usize;
    let mut failed = 0usize;

    for line in output.lines() {
        if !line.contains(" passed") && !line.contains(" failed") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        for (i, part) in parts.iter().enumerate() {
            if i == 0 {
                continue;
            }
            if *part == "passed" {
                if let Ok(n) = parts[i - 1].parse::<usize>() {
                    passed = n;
                }
            } else if *part == "failed" {
                if let Ok(n) = parts[i - 1].parse::<usize>() {
                    failed = n;
                }
            }
        }
    }

    TestCounts {
        total: passed + failed,
        passed,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pytest_summary_line() {
        let output = "===== 5 passed, 2 failed in 1.23s =====";
        let counts = parse_test_counts(output);
        assert_eq!(counts, TestCounts { total: 7, passed: 5, failed: 2 });
    }

    #[test]
    fn parses_all_passed_with_no_failed_token() {
        let output = "3 passed in 0.10s";
        let counts = parse_test_counts(output);
        assert_eq!(counts, TestCounts { total: 3, passed: 3, failed: 0 });
    }

    #[test]
    fn unparseable_output_yields_zero_total() {
        let output = "no recognizable summary here";
        assert_eq!(parse_test_counts(output), TestCounts::default());
    }

    #[test]
    fn ignores_non_numeric_token_before_passed() {
        let output = "tests passed";
        assert_eq!(parse_test_counts(output), TestCounts::default());
    }
}
