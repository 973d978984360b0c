//! Natural-language-ification of feature paths, improving recall against free-text goals.

const DOMAIN_HINTS: &[(&str, &str)] = &[
    ("ml", "machine learning"),
    ("ai", "artificial intelligence"),
    ("data", "dataset processing analysis"),
    ("auth", "authentication authorization"),
    ("db", "database storage"),
    ("api", "interface endpoint"),
    ("ui", "user interface"),
    ("net", "networking"),
    ("io", "input output"),
];

/// Turn `ml/training/early_stopping` into `machine learning training early stopping`.
#[must_use]
pub fn naturalize(path: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let segments: Vec<&str> = path.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        let cleaned = segment.replace(['_', '-'], " ");
        if i == 0 {
            if let Some((_, hint)) = DOMAIN_HINTS.iter().find(|(k, _)| *k == segment.to_lowercase())
            {
                words.push((*hint).to_string());
            }
        }
        words.push(cleaned);
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_separators() {
        assert_eq!(naturalize("math/basic_ops/add-two"), "math basic ops add two");
    }

    #[test]
    fn prepends_domain_hint_for_known_top_segment() {
        assert_eq!(
            naturalize("ml/training/early_stopping"),
            "machine learning ml training early stopping"
        );
    }

    #[test]
    fn leaves_unknown_top_segment_unhinted() {
        assert_eq!(naturalize("widgets/button"), "widgets button");
    }
}
