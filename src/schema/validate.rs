//! JSON Schema Draft-7 structural validation with best-match sub-error
//! reporting.
//!
//! Covered vocabulary: `type`, `required`, `enum`, `const`, `pattern`,
//! `properties`, `items` (single-schema form), `$ref`, `oneOf`, `anyOf`,
//! `allOf`, boolean schemas. Every violation is collected, never just the
//! first, and the result is sorted by each error's string representation so
//! repeated runs over identical input produce identical output.
//!
//! `oneOf`/`anyOf` failures keep the per-branch failures as `sub_errors`
//! with paths relative to the branching point; reporting picks the single
//! most relevant sub-error (deepest path wins, branching keywords rank
//! lowest) and composes its path onto the parent's.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;
use crate::keyfind::{format_as_index, PathSegment};
use crate::schema::SchemaRegistry;

/// One schema violation. `path` locates the offending value relative to the
/// instance root for top-level errors, and relative to the branching point
/// for `sub_errors`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    pub path: Vec<PathSegment>,
    pub sub_errors: Vec<ValidationError>,
    keyword: &'static str,
}

impl ValidationError {
    fn leaf(message: String, path: Vec<PathSegment>, keyword: &'static str) -> Self {
        Self {
            message,
            path,
            sub_errors: Vec::new(),
            keyword,
        }
    }

    // branching keywords carry no specificity of their own
    fn keyword_weight(&self) -> u8 {
        match self.keyword {
            "anyOf" | "oneOf" => 0,
            _ => 1,
        }
    }

    fn sort_repr(&self) -> String {
        format!("{} @ {}", self.message, format_as_index("$", &self.path))
    }
}

/// Validate `data` against the schema for a declared feed version.
pub fn get_version_schema_errors(
    registry: &SchemaRegistry,
    data: &Value,
    version: &str,
) -> Result<Vec<ValidationError>, SchemaError> {
    let schema = registry.schema_ref_for_version(version)?;
    get_schema_errors(registry, data, &schema)
}

/// Validate `data` against an arbitrary schema, resolving `$ref`s through
/// the registry. Returns all violations in a stable order.
pub fn get_schema_errors(
    registry: &SchemaRegistry,
    data: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, SchemaError> {
    let scope = Arc::new(schema.clone());
    let mut errors = Vec::new();
    let mut path = Vec::new();
    validate_node(registry, &scope, schema, data, &mut path, &mut errors)?;
    errors.sort_by(|a, b| a.sort_repr().cmp(&b.sort_repr()));
    Ok(errors)
}

/// Resolve each violation to its reported `(message, locator)` pair.
///
/// Violations with sub-errors report their best match; if best-match
/// selection somehow yields nothing for a non-empty context, the violation
/// is dropped from the report rather than surfacing a blank line.
pub fn get_formatted_errors(errors: &[ValidationError], feed_name: &str) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(errors.len());
    for error in errors {
        if error.sub_errors.is_empty() {
            out.push((
                error.message.clone(),
                format_as_index(feed_name, &error.path),
            ));
        } else {
            match best_match(&error.sub_errors) {
                Some(best) => out.push((
                    best.message.clone(),
                    format_as_index(&format_as_index(feed_name, &error.path), &best.path),
                )),
                None => {
                    debug!(
                        parent = %error.message,
                        "dropping violation with no usable best match"
                    );
                }
            }
        }
    }
    out
}

/// Pick the most relevant error: deepest path wins, ties broken by keyword
/// specificity. Descends into the winner's own sub-errors until it reaches
/// a leaf.
pub fn best_match(errors: &[ValidationError]) -> Option<&ValidationError> {
    // first-encountered wins ties (max_by_key would pick the last)
    fn most_relevant(errors: &[ValidationError]) -> Option<&ValidationError> {
        let mut best: Option<(&ValidationError, (usize, u8))> = None;
        for error in errors {
            let score = (error.path.len(), error.keyword_weight());
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((error, score));
            }
        }
        best.map(|(error, _)| error)
    }

    let mut best = most_relevant(errors)?;
    while let Some(next) = most_relevant(&best.sub_errors) {
        best = next;
    }
    Some(best)
}

fn validate_node(
    registry: &SchemaRegistry,
    scope: &Arc<Value>,
    schema: &Value,
    instance: &Value,
    path: &mut Vec<PathSegment>,
    errors: &mut Vec<ValidationError>,
) -> Result<(), SchemaError> {
    if let Some(allowed) = schema.as_bool() {
        if !allowed {
            errors.push(ValidationError::leaf(
                format!("{} is disallowed by a false schema", render(instance)),
                path.clone(),
                "false",
            ));
        }
        return Ok(());
    }
    let Some(obj) = schema.as_object() else {
        return Ok(());
    };

    // Draft 7: $ref replaces all sibling keywords
    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        let (next_scope, fragment) = locate(registry, scope, reference)?;
        let target =
            next_scope
                .pointer(&fragment)
                .ok_or_else(|| SchemaError::InvalidDocument {
                    uri: reference.to_string(),
                    reason: format!("fragment `{fragment}` not found"),
                })?;
        return validate_node(registry, &next_scope, target, instance, path, errors);
    }

    if let Some(expected) = obj.get("type") {
        if !type_matches(expected, instance) {
            errors.push(ValidationError::leaf(
                format!(
                    "{} is not of type {}",
                    render(instance),
                    render_type_list(expected)
                ),
                path.clone(),
                "type",
            ));
        }
    }

    if let Some(Value::Array(options)) = obj.get("enum") {
        if !options.contains(instance) {
            errors.push(ValidationError::leaf(
                format!("{} is not one of {}", render(instance), render_list(options)),
                path.clone(),
                "enum",
            ));
        }
    }

    if let Some(expected) = obj.get("const") {
        if instance != expected {
            errors.push(ValidationError::leaf(
                format!("{} was expected", render(expected)),
                path.clone(),
                "const",
            ));
        }
    }

    if let (Some(Value::String(pattern)), Some(s)) = (obj.get("pattern"), instance.as_str()) {
        let re = compiled_pattern(pattern)?;
        if !re.is_match(s) {
            errors.push(ValidationError::leaf(
                format!("{} does not match '{pattern}'", render(instance)),
                path.clone(),
                "pattern",
            ));
        }
    }

    if let (Some(Value::Array(required)), Some(map)) = (obj.get("required"), instance.as_object()) {
        for property in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(property) {
                errors.push(ValidationError::leaf(
                    format!("'{property}' is a required property"),
                    path.clone(),
                    "required",
                ));
            }
        }
    }

    if let (Some(Value::Object(props)), Some(map)) = (obj.get("properties"), instance.as_object()) {
        for (key, subschema) in props {
            if let Some(value) = map.get(key) {
                path.push(PathSegment::Key(key.clone()));
                validate_node(registry, scope, subschema, value, path, errors)?;
                path.pop();
            }
        }
    }

    if let (Some(item_schema), Some(items)) = (obj.get("items"), instance.as_array()) {
        for (index, value) in items.iter().enumerate() {
            path.push(PathSegment::Index(index));
            validate_node(registry, scope, item_schema, value, path, errors)?;
            path.pop();
        }
    }

    if let Some(Value::Array(branches)) = obj.get("allOf") {
        for branch in branches {
            validate_node(registry, scope, branch, instance, path, errors)?;
        }
    }

    if let Some(Value::Array(branches)) = obj.get("anyOf") {
        let mut context = Vec::new();
        let mut matched = false;
        for branch in branches {
            let branch_errs = branch_errors(registry, scope, branch, instance)?;
            if branch_errs.is_empty() {
                matched = true;
                break;
            }
            context.extend(branch_errs);
        }
        if !matched {
            errors.push(ValidationError {
                message: format!(
                    "{} is not valid under any of the given schemas",
                    render(instance)
                ),
                path: path.clone(),
                sub_errors: context,
                keyword: "anyOf",
            });
        }
    }

    if let Some(Value::Array(branches)) = obj.get("oneOf") {
        let mut context = Vec::new();
        let mut matched = 0usize;
        for branch in branches {
            let branch_errs = branch_errors(registry, scope, branch, instance)?;
            if branch_errs.is_empty() {
                matched += 1;
            } else if matched == 0 {
                context.extend(branch_errs);
            }
        }
        if matched == 0 {
            errors.push(ValidationError {
                message: format!(
                    "{} is not valid under any of the given schemas",
                    render(instance)
                ),
                path: path.clone(),
                sub_errors: context,
                keyword: "oneOf",
            });
        } else if matched > 1 {
            errors.push(ValidationError::leaf(
                format!(
                    "{} is valid under each of {matched} of the given schemas",
                    render(instance)
                ),
                path.clone(),
                "oneOf",
            ));
        }
    }

    Ok(())
}

// Branch failures are collected with paths relative to the branching point.
fn branch_errors(
    registry: &SchemaRegistry,
    scope: &Arc<Value>,
    branch: &Value,
    instance: &Value,
) -> Result<Vec<ValidationError>, SchemaError> {
    let mut errs = Vec::new();
    let mut rel_path = Vec::new();
    validate_node(registry, scope, branch, instance, &mut rel_path, &mut errs)?;
    Ok(errs)
}

fn locate(
    registry: &SchemaRegistry,
    scope: &Arc<Value>,
    reference: &str,
) -> Result<(Arc<Value>, String), SchemaError> {
    if let Some(fragment) = reference.strip_prefix('#') {
        return Ok((Arc::clone(scope), fragment.to_string()));
    }
    let (uri, fragment) = match reference.split_once('#') {
        Some((uri, fragment)) => (uri, fragment.to_string()),
        None => (reference, String::new()),
    };
    let doc = registry.resolve(uri)?;
    Ok((doc, fragment))
}

fn type_matches(expected: &Value, instance: &Value) -> bool {
    match expected {
        Value::String(name) => type_name_matches(name, instance),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_name_matches(name, instance)),
        _ => true,
    }
}

fn type_name_matches(name: &str, instance: &Value) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        // a float with a zero fraction counts as an integer in Draft 7
        "integer" => {
            instance.is_i64()
                || instance.is_u64()
                || instance.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => true,
    }
}

static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn compiled_pattern(pattern: &str) -> Result<Regex, SchemaError> {
    let mut cache = PATTERN_CACHE.lock().expect("pattern cache lock poisoned");
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern).map_err(|e| SchemaError::InvalidDocument {
        uri: format!("pattern:{pattern}"),
        reason: e.to_string(),
    })?;
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

const RENDER_LIMIT: usize = 120;

// Compact, truncated rendering for error messages. Deterministic for a
// given value, which the sort contract relies on.
fn render(value: &Value) -> String {
    let mut s = match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    };
    if s.chars().count() > RENDER_LIMIT {
        s = s.chars().take(RENDER_LIMIT).collect::<String>() + "...";
    }
    s
}

fn render_type_list(expected: &Value) -> String {
    match expected {
        Value::String(name) => format!("'{name}'"),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(|n| format!("'{n}'"))
            .collect::<Vec<_>>()
            .join(", "),
        other => render(other),
    }
}

fn render_list(options: &[Value]) -> String {
    let rendered = options.iter().map(render).collect::<Vec<_>>().join(", ");
    format!("[{rendered}]")
}
