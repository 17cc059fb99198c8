//! Dotted/bracketed JSON path queries
//!
//! Grammar: segments separated by `.`, each a key name optionally followed
//! by one or more `[index]` suffixes, e.g. `store.book[0].title`.
//! Matching is case-sensitive. Any miss resolves to "path not found";
//! malformed indexes are treated the same way rather than as errors.

use serde_json::Value;

/// Resolve `expr` against `value`
///
/// Returns the matched value, or `None` when any segment fails to match.
pub fn search<'a>(value: &'a Value, expr: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in expr.split('.') {
        if segment.is_empty() {
            return None;
        }
        let (key, indexes) = split_segment(segment)?;
        if !key.is_empty() {
            current = current.as_object()?.get(key)?;
        }
        for index in indexes {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// Split `book[0][1]` into `("book", [0, 1])`
fn split_segment(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(bracket) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };

    let key = &segment[..bracket];
    let mut indexes = Vec::new();
    let mut rest = &segment[bracket..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((key, indexes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "store": {
                "book": [
                    { "title": "A" },
                    { "title": "B" }
                ],
                "open": true
            }
        })
    }

    #[test]
    fn test_object_traversal() {
        let value = sample();
        assert_eq!(search(&value, "store.open"), Some(&json!(true)));
    }

    #[test]
    fn test_array_index() {
        let value = sample();
        assert_eq!(search(&value, "store.book[0]"), Some(&json!({ "title": "A" })));
        assert_eq!(search(&value, "store.book[1].title"), Some(&json!("B")));
    }

    #[test]
    fn test_misses_return_none() {
        let value = sample();
        assert!(search(&value, "store.magazine").is_none());
        assert!(search(&value, "store.book[5]").is_none());
        assert!(search(&value, "store.open[0]").is_none());
        assert!(search(&value, "store..open").is_none());
    }

    #[test]
    fn test_malformed_index_is_a_miss() {
        let value = sample();
        assert!(search(&value, "store.book[x]").is_none());
        assert!(search(&value, "store.book[0").is_none());
    }

    #[test]
    fn test_whole_document_path() {
        let value = sample();
        assert_eq!(search(&value, "store"), value.get("store"));
    }
}
