//! Payload validation filter.
//!
//! Routes register the DTO their body must satisfy. The body is buffered,
//! checked against every rule on the DTO, and handed on untouched.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{MatchedPath, Request},
    http::Method,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use validator::{Validate, ValidationErrors};

use super::RequestFilter;
use crate::config::MAX_PAYLOAD_BYTES;
use crate::errors::{AppError, FieldViolation};

type Check = fn(&[u8]) -> Result<(), Vec<FieldViolation>>;

#[derive(Default)]
pub struct ValidationFilter {
    rules: HashMap<(Method, String), Check>,
}

impl ValidationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require bodies sent to `method path` to deserialize into `T` and
    /// pass its validation rules.
    pub fn rule<T>(mut self, method: Method, path: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Validate,
    {
        self.rules.insert((method, path.into()), check_payload::<T>);
        self
    }

    fn rule_for(&self, request: &Request) -> Option<Check> {
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str())
            .unwrap_or_else(|| request.uri().path());
        self.rules
            .get(&(request.method().clone(), path.to_string()))
            .copied()
    }
}

#[async_trait]
impl RequestFilter for ValidationFilter {
    fn name(&self) -> &'static str {
        "payload_validation"
    }

    async fn on_request(&self, request: Request) -> Result<Request, AppError> {
        let Some(check) = self.rule_for(&request) else {
            return Ok(request);
        };

        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, MAX_PAYLOAD_BYTES).await.map_err(|_| {
            AppError::violation(
                "body",
                format!("Payload must be at most {} bytes", MAX_PAYLOAD_BYTES),
            )
        })?;

        check(&bytes).map_err(AppError::ValidationFailed)?;

        Ok(Request::from_parts(parts, Body::from(bytes)))
    }
}

fn check_payload<T>(bytes: &[u8]) -> Result<(), Vec<FieldViolation>>
where
    T: DeserializeOwned + Validate,
{
    let value: Value = serde_json::from_slice(bytes).map_err(|e| malformed(&e))?;
    let Value::Object(mut fields) = value else {
        return Err(vec![FieldViolation::new("body", "Payload must be a JSON object")]);
    };

    let mut violations = Vec::new();
    let mut mistyped = HashSet::new();
    for (field, raw) in &fields {
        if let Some(message) = type_mismatch::<T>(field, raw) {
            violations.push(FieldViolation::new(field.as_str(), message));
            mistyped.insert(field.clone());
        }
    }
    fields.retain(|field, _| !mistyped.contains(field));

    let payload: T = serde_json::from_value(Value::Object(fields)).map_err(|e| malformed(&e))?;
    if let Err(errors) = payload.validate() {
        violations.extend(
            collect_violations(&errors)
                .into_iter()
                .filter(|v| !mistyped.contains(&v.field)),
        );
    }

    if violations.is_empty() {
        return Ok(());
    }
    violations.sort();
    Err(violations)
}

/// Deserialize `field` on its own to see whether its JSON type fits `T`.
/// Rules DTOs keep every field optional, so a lone field stands for itself.
fn type_mismatch<T: DeserializeOwned>(field: &str, raw: &Value) -> Option<String> {
    let mut lone = Map::new();
    lone.insert(field.to_string(), raw.clone());
    match serde_json::from_value::<T>(Value::Object(lone)) {
        Ok(_) => None,
        Err(e) if e.to_string().starts_with("missing field") => None,
        Err(e) => Some(format!("{} has the wrong type: {}", field, e)),
    }
}

fn malformed(e: &serde_json::Error) -> Vec<FieldViolation> {
    vec![FieldViolation::new("body", format!("Malformed JSON payload: {}", e))]
}

/// Flatten validator output into one violation per failed rule, sorted by
/// field so the same payload always yields the same list.
pub fn collect_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| default_message(field, &e.code));
                FieldViolation::new(field, message)
            })
        })
        .collect();
    violations.sort();
    violations
}

fn default_message(field: &str, code: &str) -> String {
    match code {
        "required" => format!("{} is required", field),
        "range" => format!("{} is out of range", field),
        "length" => format!("{} has an invalid length", field),
        "email" => format!("{} must be a valid email address", field),
        _ => format!("{} is invalid", field),
    }
}
