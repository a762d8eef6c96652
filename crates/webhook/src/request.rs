//! Request assembly: method selection, GET body-to-query
//! promotion, and templated header/body substitution.

use ax_template::TemplateContext;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Inbound `inputFields` shape for a webhook action, pre-substitution.
pub struct WebhookSpec {
    pub method: HttpMethod,
    pub url_template: String,
    pub headers_template: BTreeMap<String, String>,
    pub body_template: Option<Value>,
    pub retry_on_failure: bool,
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// A fully-substituted, ready-to-send request.
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Substitute all placeholders in `spec` against `ctx`, then apply the
/// GET body-to-query-params promotion.
pub fn prepare(spec: &WebhookSpec, ctx: &TemplateContext<'_>) -> PreparedRequest {
    let url = ax_template::substitute(&spec.url_template, ctx);

    let mut headers: Vec<(String, String)> = spec
        .headers_template
        .iter()
        .map(|(k, v)| (k.clone(), ax_template::substitute(v, ctx)))
        .collect();

    let has_content_type = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    if !has_content_type {
        headers.push(("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string()));
    }

    let substituted_body = spec.body_template.as_ref().map(|v| substitute_json(v, ctx));

    if spec.method == HttpMethod::Get {
        if let Some(body) = &substituted_body {
            let mut url_with_query = url.clone();
            let query = body_to_query_string(body);
            if !query.is_empty() {
                let sep = if url_with_query.contains('?') { '&' } else { '?' };
                url_with_query.push(sep);
                url_with_query.push_str(&query);
            }
            return PreparedRequest { method: spec.method, url: url_with_query, headers, body: None };
        }
        return PreparedRequest { method: spec.method, url, headers, body: None };
    }

    let body = substituted_body.map(|v| {
        if v.is_string() {
            v.as_str().unwrap_or_default().to_string()
        } else {
            v.to_string()
        }
    });

    PreparedRequest { method: spec.method, url, headers, body }
}

fn substitute_json(value: &Value, ctx: &TemplateContext<'_>) -> Value {
    match value {
        Value::String(s) => Value::String(ax_template::substitute(s, ctx)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_json(v, ctx)).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), substitute_json(v, ctx));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn body_to_query_string(body: &Value) -> String {
    let Value::Object(map) = body else {
        return String::new();
    };
    map.iter()
        .map(|(k, v)| {
            let value_str = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", urlencode(k), urlencode(&value_str))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_request_promotes_body_to_query_params() {
        let spec = WebhookSpec {
            method: HttpMethod::Get,
            url_template: "https://example.com/search".into(),
            headers_template: BTreeMap::new(),
            body_template: Some(json!({"q": "rust"})),
            retry_on_failure: false,
            max_retries: None,
            initial_delay_ms: None,
            max_delay_ms: None,
        };
        let props = json!({});
        let inputs: Vec<String> = vec![];
        let ctx = TemplateContext { properties: &props, inputs: &inputs };
        let prepared = prepare(&spec, &ctx);
        assert!(prepared.body.is_none());
        assert_eq!(prepared.url, "https://example.com/search?q=rust");
    }

    #[test]
    fn post_request_serializes_body_and_defaults_content_type() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Custom".to_string(), "{{firstname}}".to_string());
        let spec = WebhookSpec {
            method: HttpMethod::Post,
            url_template: "https://example.com/anything".into(),
            headers_template: headers,
            body_template: Some(json!({"n": "{{firstname}}"})),
            retry_on_failure: false,
            max_retries: None,
            initial_delay_ms: None,
            max_delay_ms: None,
        };
        let props = json!({"firstname": "Ada"});
        let inputs: Vec<String> = vec![];
        let ctx = TemplateContext { properties: &props, inputs: &inputs };
        let prepared = prepare(&spec, &ctx);
        assert_eq!(prepared.body.as_deref(), Some(r#"{"n":"Ada"}"#));
        assert!(prepared
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == DEFAULT_CONTENT_TYPE));
        assert!(prepared.headers.iter().any(|(k, v)| k == "X-Custom" && v == "Ada"));
    }
}
