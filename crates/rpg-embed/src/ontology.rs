//! Flattens a nested ontology (maps of maps of leaf lists) into slash-joined feature paths.

use serde_json::Value;

/// Walk a JSON object tree and collect `top/mid/leaf` paths for every string found at a leaf
/// position, whether that leaf sits in an array or bare under a key.
#[must_use]
pub fn flatten(tree: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    walk(tree, &[], &mut paths);
    paths
}

fn walk(node: &Value, prefix: &[String], out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let mut next = prefix.to_vec();
                next.push(key.clone());
                walk(value, &next, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Some(leaf) = item.as_str() {
                    let mut next = prefix.to_vec();
                    next.push(leaf.to_string());
                    out.push(next.join("/"));
                } else {
                    walk(item, prefix, out);
                }
            }
        }
        Value::String(leaf) => {
            let mut next = prefix.to_vec();
            next.push(leaf.clone());
            out.push(next.join("/"));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_maps_of_leaf_lists() {
        let tree = json!({
            "math": {
                "basic": ["add", "subtract"],
                "advanced": { "calculus": ["derivative"] }
            }
        });
        let mut paths = flatten(&tree);
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "math/advanced/calculus/derivative".to_string(),
                "math/basic/add".to_string(),
                "math/basic/subtract".to_string(),
            ]
        );
    }

    #[test]
    fn empty_tree_yields_no_paths() {
        assert!(flatten(&json!({})).is_empty());
    }
}
