//! Best-effort IP geolocation for attendance rows.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("malformed location {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One lookup of the machine's approximate position.
#[allow(async_fn_in_trait)]
pub trait GeoResolver {
    async fn resolve(&self) -> Result<Coordinates, GeoError>;
}

/// How many lookups to try and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(1),
        }
    }
}

/// Try `geo` up to `policy.attempts` times, pausing between failures.
///
/// Every failure is logged; exhausting the attempts yields `None`.
pub async fn resolve_with_retry<G: GeoResolver>(geo: &G, policy: &RetryPolicy) -> Option<Coordinates> {
    for attempt in 1..=policy.attempts {
        match geo.resolve().await {
            Ok(coords) => return Some(coords),
            Err(e) => {
                tracing::warn!(attempt, attempts = policy.attempts, error = %e, "location lookup failed");
            }
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.pause).await;
        }
    }
    None
}

/// ipinfo.io-style lookup: `GET <endpoint>` → `{"loc": "lat,lon", ...}`.
pub struct IpGeolocator {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct IpInfoResponse {
    loc: Option<String>,
    #[serde(default)]
    bogon: bool,
}

impl IpGeolocator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rollcall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl GeoResolver for IpGeolocator {
    async fn resolve(&self) -> Result<Coordinates, GeoError> {
        let body: IpInfoResponse = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.bogon {
            return Err(GeoError::Unavailable("private or reserved address".into()));
        }
        let loc = body
            .loc
            .ok_or_else(|| GeoError::Unavailable("response has no `loc` field".into()))?;
        parse_loc(&loc)
    }
}

/// Parse `"lat,lon"` as returned by ipinfo.
pub fn parse_loc(loc: &str) -> Result<Coordinates, GeoError> {
    let malformed = || GeoError::Malformed(loc.to_string());
    let (lat, lon) = loc.split_once(',').ok_or_else(malformed)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| malformed())?;
    let longitude: f64 = lon.trim().parse().map_err(|_| malformed())?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(malformed());
    }
    Ok(Coordinates { latitude, longitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedGeo;

    fn instant_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            pause: Duration::ZERO,
        }
    }

    #[test]
    fn test_parse_loc() {
        let c = parse_loc("28.6519,77.2315").unwrap();
        assert_eq!(c, Coordinates { latitude: 28.6519, longitude: 77.2315 });
        assert!(parse_loc(" -33.9 , 151.2 ").is_ok());
    }

    #[test]
    fn test_parse_loc_rejects_garbage() {
        assert!(matches!(parse_loc("nowhere"), Err(GeoError::Malformed(_))));
        assert!(matches!(parse_loc("1.0,abc"), Err(GeoError::Malformed(_))));
        assert!(matches!(parse_loc("95.0,10.0"), Err(GeoError::Malformed(_))));
    }

    #[test]
    fn test_ipinfo_body_parses() {
        let body: IpInfoResponse =
            serde_json::from_str(r#"{"ip":"1.2.3.4","city":"Delhi","loc":"28.6,77.2"}"#).unwrap();
        assert_eq!(body.loc.as_deref(), Some("28.6,77.2"));
        assert!(!body.bogon);
    }

    #[tokio::test]
    async fn test_retry_exhausts_all_attempts() {
        let geo = FixedGeo::failing();
        assert_eq!(resolve_with_retry(&geo, &instant_retry(3)).await, None);
        assert_eq!(geo.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_at_first_success() {
        let here = Coordinates { latitude: 1.0, longitude: 2.0 };
        let geo = FixedGeo::succeeding_after(1, here);
        assert_eq!(resolve_with_retry(&geo, &instant_retry(3)).await, Some(here));
        assert_eq!(geo.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_pauses_one_second_between_attempts() {
        let geo = FixedGeo::failing();
        let start = tokio::time::Instant::now();
        assert_eq!(resolve_with_retry(&geo, &RetryPolicy::default()).await, None);
        assert_eq!(geo.calls(), 3);
        // two pauses; none after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failure_waits_one_pause() {
        let here = Coordinates { latitude: 1.0, longitude: 2.0 };
        let geo = FixedGeo::succeeding_after(1, here);
        let start = tokio::time::Instant::now();
        assert_eq!(resolve_with_retry(&geo, &RetryPolicy::default()).await, Some(here));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_attempts_skips_lookup() {
        let geo = FixedGeo::failing();
        assert_eq!(resolve_with_retry(&geo, &instant_retry(0)).await, None);
        assert_eq!(geo.calls(), 0);
    }
}
