//! Shared HTTP response helpers.
//!
//! Centralizes status-code checks so the endpoint methods stay focused on
//! request construction and response mapping.

use chrono::Utc;
use reqwest::StatusCode;

use crate::error::GitHubError;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
const FALLBACK_RETRY_SECS: u64 = 60;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429**, and **403** with `x-ratelimit-remaining: 0` or a `Retry-After`
///   header (GitHub's secondary limit) → [`GitHubError::RateLimited`].
/// - **Other non-success status** → [`GitHubError::Api`] with the body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && is_rate_limited(&resp))
    {
        return Err(GitHubError::RateLimited {
            retry_after_secs: parse_retry_after(&resp, Utc::now().timestamp()),
        });
    }
    if !status.is_success() {
        return Err(GitHubError::Api {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

fn header_str<'a>(resp: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn is_rate_limited(resp: &reqwest::Response) -> bool {
    header_str(resp, RATE_LIMIT_REMAINING).is_some_and(|v| v.trim() == "0")
        || resp.headers().contains_key(reqwest::header::RETRY_AFTER)
}

/// Seconds to wait: `Retry-After`, else time until `x-ratelimit-reset`,
/// else 60.
fn parse_retry_after(resp: &reqwest::Response, now_epoch: i64) -> u64 {
    if let Some(secs) = header_str(resp, reqwest::header::RETRY_AFTER.as_str())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return secs;
    }
    header_str(resp, RATE_LIMIT_RESET)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map_or(FALLBACK_RETRY_SECS, |reset| {
            u64::try_from(reset.saturating_sub(now_epoch)).unwrap_or(0).max(1)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, headers: &[(&str, &str)]) -> reqwest::Response {
        let mut builder = ::http::Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        reqwest::Response::from(builder.body("").unwrap())
    }

    #[test]
    fn retry_after_header_wins() {
        let resp = mock_response(429, &[("Retry-After", "120"), (RATE_LIMIT_RESET, "999")]);
        assert_eq!(parse_retry_after(&resp, 0), 120);
    }

    #[test]
    fn reset_epoch_is_relative_to_now() {
        let resp = mock_response(403, &[(RATE_LIMIT_REMAINING, "0"), (RATE_LIMIT_RESET, "1045")]);
        assert_eq!(parse_retry_after(&resp, 1000), 45);
    }

    #[test]
    fn reset_in_the_past_waits_one_second() {
        let resp = mock_response(403, &[(RATE_LIMIT_RESET, "900")]);
        assert_eq!(parse_retry_after(&resp, 1000), 1);
    }

    #[test]
    fn missing_headers_fall_back() {
        let resp = mock_response(429, &[]);
        assert_eq!(parse_retry_after(&resp, 0), 60);
    }

    #[tokio::test]
    async fn exhausted_budget_403_is_rate_limited() {
        let resp = mock_response(403, &[(RATE_LIMIT_REMAINING, "0"), ("Retry-After", "30")]);
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(
            err,
            GitHubError::RateLimited {
                retry_after_secs: 30
            }
        ));
    }

    #[tokio::test]
    async fn plain_403_is_api_error() {
        let resp = mock_response(403, &[(RATE_LIMIT_REMAINING, "4999")]);
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(err, GitHubError::Api { status: 403, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let err = check_response(mock_response(429, &[])).await.unwrap_err();
        assert!(matches!(
            err,
            GitHubError::RateLimited {
                retry_after_secs: 60
            }
        ));
    }

    #[tokio::test]
    async fn success_passes_through() {
        assert!(check_response(mock_response(200, &[])).await.is_ok());
    }
}
