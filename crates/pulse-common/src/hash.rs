use crate::error::MetricError;
use crate::types::{Metric, MetricKind, MetricValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &str, id: &str, kind: MetricKind, value: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{id}:{kind}:{value}").as_bytes());
    mac
}

/// HMAC-SHA256 over `"{id}:{kind}:{value}"`, hex-encoded lowercase.
///
/// # Examples
///
/// ```
/// use pulse_common::hash::compute;
/// use pulse_common::MetricKind;
///
/// let digest = compute("secret", "PollCount", MetricKind::Counter, "5");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, digest.to_lowercase());
/// ```
pub fn compute(key: &str, id: &str, kind: MetricKind, value: &str) -> String {
    hex::encode(mac(key, id, kind, value).finalize().into_bytes())
}

/// Signs and verifies metrics with the shared secret.
///
/// An empty key disables integrity entirely: nothing is signed and every
/// submission verifies.
#[derive(Debug, Clone, Default)]
pub struct Signer {
    key: Option<Arc<str>>,
}

impl Signer {
    pub fn new(key: &str) -> Self {
        Self {
            key: (!key.is_empty()).then(|| Arc::from(key)),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Hash for `value` stored under `id`, or `None` when no key is set.
    pub fn sign(&self, id: &str, value: &MetricValue) -> Option<String> {
        let key = self.key.as_deref()?;
        Some(compute(key, id, value.kind(), &value.canonical()))
    }

    /// Returns `metric` with a freshly computed hash (cleared when disabled).
    pub fn signed(&self, mut metric: Metric) -> Metric {
        metric.hash = self.sign(&metric.id, &metric.value);
        metric
    }

    /// Checks a submitted hash against the value the client sent.
    ///
    /// Passes when no key is configured or the metric carries no hash.
    ///
    /// # Errors
    ///
    /// [`MetricError::HashMismatch`] when the hash is not valid hex or does
    /// not match.
    pub fn verify(&self, metric: &Metric) -> Result<(), MetricError> {
        let (Some(key), Some(hash)) = (self.key.as_deref(), metric.hash.as_deref()) else {
            return Ok(());
        };
        let expected = mac(key, &metric.id, metric.kind(), &metric.value.canonical());
        let supplied =
            hex::decode(hash).map_err(|_| MetricError::HashMismatch(metric.id.clone()))?;
        expected
            .verify_slice(&supplied)
            .map_err(|_| MetricError::HashMismatch(metric.id.clone()))
    }
}
