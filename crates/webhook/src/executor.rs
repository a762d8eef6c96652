//! Ties request assembly, the SSRF guard, and the retry engine together
//! into the single attempt loop the Webhook Executor runs per dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;

use ax_domain::sanitize::sanitize_error;
use ax_domain::types::{Attempt, ExecutionStatus};
use ax_ssrf::{SsrfError, SsrfGuard};
use ax_template::TemplateContext;

use crate::request::{prepare, PreparedRequest, WebhookSpec};
use crate::response::{request_snapshot, truncate_bytes};
use crate::retry::{backoff_delay, classify_transport_error, is_retryable_status, RetryPolicy};

const MAX_REDIRECT_HOPS: u32 = 5;

pub struct WebhookOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub retries_used: u32,
    pub error: Option<String>,
    pub attempts: Vec<Attempt>,
    pub request_snapshot: String,
    pub response_snapshot: Option<String>,
}

/// Run the webhook request described by `spec` to completion (success,
/// exhausted retries, or deadline). `deadline` bounds the *entire*
/// attempt loop, including backoff sleeps — it is `min(tenant-cap,
/// input-requested)` as computed by the dispatcher.
pub async fn execute(
    spec: &WebhookSpec,
    ctx: &TemplateContext<'_>,
    default_policy: &RetryPolicy,
    user_agent: &str,
    audit_snapshot_bytes: usize,
    output_snapshot_bytes: usize,
    max_response_bytes: usize,
    deadline: Duration,
) -> WebhookOutcome {
    let prepared = prepare(spec, ctx);
    let snapshot = request_snapshot(
        prepared.method.as_str(),
        &prepared.url,
        &prepared.headers,
        prepared.body.as_deref(),
        audit_snapshot_bytes,
    );

    let policy = RetryPolicy {
        max_retries: spec.max_retries.unwrap_or(default_policy.max_retries),
        initial_delay_ms: spec.initial_delay_ms.unwrap_or(default_policy.initial_delay_ms),
        max_delay_ms: spec.max_delay_ms.unwrap_or(default_policy.max_delay_ms),
        multiplier: default_policy.multiplier,
        attempt_timeout_ms: default_policy.attempt_timeout_ms,
    };

    let guard = SsrfGuard::new();
    let start = Instant::now();

    // Validated and pinned once for the whole request, per spec: retries
    // reuse this address set rather than re-resolving DNS on every
    // attempt. Redirect hops inside `run_one_attempt` still validate fresh.
    let initial_url = match guard.validate_and_pin(&prepared.url).await {
        Ok(url) => url,
        Err(e) => {
            return WebhookOutcome {
                success: false,
                status_code: None,
                retries_used: 0,
                error: Some(sanitize_error(&e.to_string())),
                attempts: vec![Attempt {
                    attempt_index: 0,
                    status: ExecutionStatus::Error,
                    status_code: None,
                    duration_ms: 0,
                    error: Some(sanitize_error(&e.to_string())),
                }],
                request_snapshot: snapshot,
                response_snapshot: None,
            };
        }
    };

    let mut attempts = Vec::new();
    let mut retries_used = 0u32;

    loop {
        let elapsed = start.elapsed();
        if elapsed >= deadline {
            return WebhookOutcome {
                success: false,
                status_code: None,
                retries_used,
                error: Some("deadline exceeded before attempt could start".to_string()),
                attempts,
                request_snapshot: snapshot,
                response_snapshot: None,
            };
        }
        let remaining = deadline - elapsed;
        let attempt_timeout = Duration::from_millis(policy.attempt_timeout_ms).min(remaining);

        let attempt_index = attempts.len() as u32;
        let attempt_start = Instant::now();
        let outcome = run_one_attempt(
            &guard,
            initial_url.clone(),
            &prepared,
            user_agent,
            max_response_bytes,
            attempt_timeout,
        )
        .await;
        let duration_ms = attempt_start.elapsed().as_millis() as u64;

        match outcome {
            Ok((status, body)) => {
                let is_success = (200..400).contains(&status);
                attempts.push(Attempt {
                    attempt_index,
                    status: if is_success { ExecutionStatus::Success } else { ExecutionStatus::Error },
                    status_code: Some(status),
                    duration_ms,
                    error: None,
                });

                if is_success {
                    return WebhookOutcome {
                        success: true,
                        status_code: Some(status),
                        retries_used,
                        error: None,
                        attempts,
                        request_snapshot: snapshot,
                        response_snapshot: Some(truncate_bytes(&body, output_snapshot_bytes)),
                    };
                }

                let retryable = spec.retry_on_failure && is_retryable_status(status);
                if !retryable || retries_used >= policy.max_retries {
                    return WebhookOutcome {
                        success: false,
                        status_code: Some(status),
                        retries_used,
                        error: Some(format!("upstream returned status {status}")),
                        attempts,
                        request_snapshot: snapshot,
                        response_snapshot: Some(truncate_bytes(&body, output_snapshot_bytes)),
                    };
                }
            }
            Err(AttemptError::Ssrf(e)) => {
                attempts.push(Attempt {
                    attempt_index,
                    status: ExecutionStatus::Error,
                    status_code: None,
                    duration_ms,
                    error: Some(sanitize_error(&e.to_string())),
                });
                return WebhookOutcome {
                    success: false,
                    status_code: None,
                    retries_used,
                    error: Some(sanitize_error(&e.to_string())),
                    attempts,
                    request_snapshot: snapshot,
                    response_snapshot: None,
                };
            }
            Err(AttemptError::Transport(err)) => {
                let sanitized = sanitize_error(&err.to_string());
                let transport_failure = classify_transport_error(&err);
                attempts.push(Attempt {
                    attempt_index,
                    status: ExecutionStatus::Error,
                    status_code: None,
                    duration_ms,
                    error: Some(sanitized.clone()),
                });

                let retryable = spec.retry_on_failure
                    && transport_failure.map(crate::retry::is_retryable_transport).unwrap_or(false);
                if !retryable || retries_used >= policy.max_retries {
                    return WebhookOutcome {
                        success: false,
                        status_code: None,
                        retries_used,
                        error: Some(sanitized),
                        attempts,
                        request_snapshot: snapshot,
                        response_snapshot: None,
                    };
                }
            }
        }

        let backoff = backoff_delay(&policy, retries_used);
        let elapsed_after_attempt = start.elapsed();
        if elapsed_after_attempt + backoff >= deadline {
            return WebhookOutcome {
                success: false,
                status_code: attempts.last().and_then(|a| a.status_code),
                retries_used,
                error: Some("remaining deadline budget insufficient for next retry".to_string()),
                attempts,
                request_snapshot: snapshot,
                response_snapshot: None,
            };
        }
        tokio::time::sleep(backoff).await;
        retries_used += 1;
    }
}

enum AttemptError {
    Ssrf(SsrfError),
    Transport(reqwest::Error),
}

async fn run_one_attempt(
    guard: &SsrfGuard,
    pinned_url: Url,
    prepared: &PreparedRequest,
    user_agent: &str,
    max_response_bytes: usize,
    timeout: Duration,
) -> Result<(u16, String), AttemptError> {
    // The first hop reuses the pin validated once per top-level request;
    // only redirect hops below re-run the guard against their target.
    let mut validated = pinned_url;
    let mut hop = 0u32;

    loop {
        let client = reqwest::Client::builder()
            .dns_resolver(Arc::new(guard.resolver()))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(AttemptError::Transport)?;

        let mut builder = client.request(prepared.method.as_reqwest(), validated.clone());
        for (name, value) in &prepared.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &prepared.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(AttemptError::Transport)?;
        let status = response.status().as_u16();

        if (300..400).contains(&status) {
            if let Some(location) = response.headers().get(reqwest::header::LOCATION) {
                if hop >= MAX_REDIRECT_HOPS {
                    return Ok((status, String::new()));
                }
                if let Ok(location_str) = location.to_str() {
                    let target = resolve_redirect_target(validated.as_str(), location_str);
                    validated = guard.validate_and_pin(&target).await.map_err(AttemptError::Ssrf)?;
                    hop += 1;
                    continue;
                }
            }
        }

        let body_bytes = read_capped(response, max_response_bytes).await.map_err(AttemptError::Transport)?;
        let body = String::from_utf8_lossy(&body_bytes).to_string();
        return Ok((status, body));
    }
}

fn resolve_redirect_target(base: &str, location: &str) -> String {
    match reqwest::Url::parse(location) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => match reqwest::Url::parse(base).and_then(|b| b.join(location)) {
            Ok(joined) => joined.to_string(),
            Err(_) => location.to_string(),
        },
    }
}

async fn read_capped(response: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, reqwest::Error> {
    use futures_util::StreamExt;
    let mut stream = response.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > max_bytes {
            let remaining = max_bytes.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
