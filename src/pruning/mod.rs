//! Pruner & Feature Extractor (spec §4.1).
//!
//! Turns raw API specification text (JSON or YAML) into a stable,
//! deduplicated, lexicographically sorted list of feature strings that
//! represent the API's structural identity, independent of boilerplate
//! fields that vary without changing the API's meaning.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::errors::{GatekeeperError, Result};

/// HTTP methods recognized inside a path item object.
const HTTP_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options"];

/// Top-level keys removed from the document before feature extraction.
const PRUNED_TOP_LEVEL_KEYS: &[&str] = &["servers", "externalDocs", "security"];

/// `info.*` keys removed before feature extraction.
const PRUNED_INFO_KEYS: &[&str] = &["contact", "license", "termsOfService"];

/// Parse `text` as JSON or YAML (JSON when the first non-whitespace byte is
/// `{`, YAML otherwise) into a common [`serde_json::Value`] tree.
pub fn parse_document(text: &str) -> Result<Value> {
    let first_non_ws = text.trim_start().chars().next();
    match first_non_ws {
        None => Err(GatekeeperError::invalid_input(
            "specification text is empty",
        )),
        Some('{') => {
            serde_json::from_str(text).map_err(|e| GatekeeperError::parse_error(e.to_string()))
        }
        Some(_) => {
            let yaml_value: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| GatekeeperError::parse_error(e.to_string()))?;
            serde_json::to_value(yaml_value).map_err(|e| GatekeeperError::parse_error(e.to_string()))
        }
    }
}

/// Remove the boilerplate fields named in spec §4.1, leaving `info.title`,
/// `info.description`, `info.version`, `paths`, and `components.schemas`
/// untouched.
pub fn prune(doc: &Value) -> Result<Value> {
    let object = doc
        .as_object()
        .ok_or_else(|| GatekeeperError::invalid_input("specification is not an object"))?;

    let mut pruned = object.clone();
    for key in PRUNED_TOP_LEVEL_KEYS {
        pruned.remove(*key);
    }

    if let Some(Value::Object(info)) = pruned.get_mut("info") {
        for key in PRUNED_INFO_KEYS {
            info.remove(*key);
        }
    }

    Ok(Value::Object(pruned))
}

/// Re-serialize a pruned document into canonical bytes.
///
/// `serde_json::Value`'s object map is a `BTreeMap` (this crate does not
/// enable the `preserve_order` feature), so `serde_json::to_vec` already
/// emits object keys in sorted order; two documents that are structurally
/// identical but were authored with differently-ordered keys therefore
/// serialize to byte-identical output.
pub fn canonical_bytes(doc: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(doc).map_err(GatekeeperError::from)
}

/// Extract the ordered, deduplicated feature list from a pruned document
/// (spec §4.1). An empty document (no paths, no schemas) yields an empty
/// feature list — this is not an error.
pub fn extract_features(doc: &Value) -> Vec<String> {
    let mut features = BTreeSet::new();

    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (raw_path, path_item) in paths {
            let normalized_path = normalize_path(raw_path);
            let Some(path_item) = path_item.as_object() else {
                continue;
            };

            for method in HTTP_METHODS {
                let Some(operation) = path_item.get(*method) else {
                    continue;
                };
                let method_upper = method.to_uppercase();
                features.insert(format!("{method_upper} {normalized_path}"));

                if let Some(operation_id) = operation.get("operationId").and_then(Value::as_str) {
                    features.insert(format!(
                        "{method_upper} {normalized_path} operationId:{}",
                        operation_id.to_lowercase()
                    ));
                }

                if let Some(tags) = operation.get("tags").and_then(Value::as_array) {
                    for tag in tags.iter().filter_map(Value::as_str) {
                        features.insert(format!(
                            "{method_upper} {normalized_path} tag:{}",
                            tag.to_lowercase()
                        ));
                    }
                }
            }
        }
    }

    if let Some(schemas) = doc
        .get("components")
        .and_then(Value::as_object)
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
    {
        for (name, schema) in schemas {
            let lower_name = name.to_lowercase();
            features.insert(format!("schema:{lower_name}"));

            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (prop_name, prop_schema) in properties {
                    let prop_type = prop_schema
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("object");
                    features.insert(format!(
                        "schema:{lower_name}.{}:{}",
                        prop_name.to_lowercase(),
                        prop_type.to_lowercase()
                    ));
                }
            }
        }
    }

    features.into_iter().collect()
}

/// Replace every `{segment}` with the literal `{param}` and lowercase the path.
fn normalize_path(raw_path: &str) -> String {
    let mut normalized = String::with_capacity(raw_path.len());
    let mut chars = raw_path.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            // Skip to the matching '}' and emit the literal placeholder instead.
            for inner in chars.by_ref() {
                if inner == '}' {
                    break;
                }
            }
            normalized.push_str("{param}");
        } else {
            normalized.push(c);
        }
    }
    normalized.to_lowercase()
}

/// Run the full pruner/extractor pipeline over raw specification text.
pub fn extract(spec_text: &str) -> Result<Vec<String>> {
    let doc = parse_document(spec_text)?;
    let pruned = prune(&doc)?;
    Ok(extract_features(&pruned))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r#"{
        "info": {"title": "Petstore", "version": "1.0", "contact": {"email": "a@b.com"}},
        "servers": [{"url": "https://a"}],
        "paths": {
            "/pets": {
                "get": {"operationId": "listPets", "tags": ["pets"]}
            }
        },
        "components": {
            "schemas": {
                "Pet": {"properties": {"id": {"type": "integer"}, "name": {"type": "string"}}}
            }
        }
    }"#;

    #[test]
    fn detects_json_by_leading_brace() {
        let doc = parse_document(PETSTORE).unwrap();
        assert!(doc.is_object());
    }

    #[test]
    fn detects_yaml_otherwise() {
        let yaml = "info:\n  title: Petstore\npaths: {}\n";
        let doc = parse_document(yaml).unwrap();
        assert_eq!(doc["info"]["title"], "Petstore");
    }

    #[test]
    fn empty_text_is_invalid_input() {
        let err = parse_document("   ").unwrap_err();
        assert!(matches!(err, GatekeeperError::InvalidInput { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_document("{ not json").unwrap_err();
        assert!(matches!(err, GatekeeperError::ParseError { .. }));
    }

    #[test]
    fn prune_removes_boilerplate_but_keeps_meaning() {
        let doc = parse_document(PETSTORE).unwrap();
        let pruned = prune(&doc).unwrap();
        assert!(pruned.get("servers").is_none());
        assert!(pruned["info"].get("contact").is_none());
        assert_eq!(pruned["info"]["title"], "Petstore");
        assert!(pruned.get("paths").is_some());
    }

    #[test]
    fn extract_features_produces_path_and_schema_tokens() {
        let doc = parse_document(PETSTORE).unwrap();
        let pruned = prune(&doc).unwrap();
        let features = extract_features(&pruned);

        assert!(features.contains(&"GET /pets".to_string()));
        assert!(features.contains(&"GET /pets operationId:listpets".to_string()));
        assert!(features.contains(&"GET /pets tag:pets".to_string()));
        assert!(features.contains(&"schema:pet".to_string()));
        assert!(features.contains(&"schema:pet.id:integer".to_string()));
        assert!(features.contains(&"schema:pet.name:string".to_string()));
    }

    #[test]
    fn features_are_sorted_and_deduplicated() {
        let doc = parse_document(PETSTORE).unwrap();
        let pruned = prune(&doc).unwrap();
        let mut features = extract_features(&pruned);
        let mut sorted = features.clone();
        sorted.sort();
        features.dedup();
        assert_eq!(features, sorted);
    }

    #[test]
    fn path_parameter_segments_are_normalized() {
        assert_eq!(normalize_path("/Pets/{petId}/Owner"), "/pets/{param}/owner");
    }

    #[test]
    fn empty_paths_and_schemas_yield_empty_feature_list_not_an_error() {
        let doc = serde_json::json!({"info": {"title": "x", "version": "1"}});
        let features = extract_features(&doc);
        assert!(features.is_empty());
    }

    #[test]
    fn boilerplate_only_differences_prune_to_identical_bytes() {
        let spec_a = PETSTORE.replace("https://a", "https://a");
        let spec_b = PETSTORE.replace("https://a", "https://b");
        let pruned_a = prune(&parse_document(&spec_a).unwrap()).unwrap();
        let pruned_b = prune(&parse_document(&spec_b).unwrap()).unwrap();
        assert_eq!(
            canonical_bytes(&pruned_a).unwrap(),
            canonical_bytes(&pruned_b).unwrap()
        );
    }

    #[test]
    fn key_order_does_not_affect_canonical_bytes() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    }
}
