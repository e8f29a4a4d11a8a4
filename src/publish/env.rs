//! Environment read by the publish task.
//!
//! The process environment is read once into a [`PublishEnv`]; everything
//! downstream works from that snapshot.

use crate::error::{ReleaseError, Result};

/// Access key variable.
pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
/// Secret key variable.
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
/// Region variable.
pub const REGION_VAR: &str = "AWS_REGION";
/// Bucket override variable.
pub const BUCKET_VAR: &str = "N1_S3_BUCKET";
/// Endpoint override variable (path-style addressing).
pub const ENDPOINT_VAR: &str = "N1_S3_ENDPOINT";
/// Webhook URL variable.
pub const HOOK_URL_VAR: &str = "NYLAS_INTERNAL_HOOK_URL";

/// Default release bucket.
pub const DEFAULT_BUCKET: &str = "edgehill";
/// Default region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Storage credentials validated as present.
#[derive(Clone)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Snapshot of the variables the publish task reads.
#[derive(Clone, Debug, Default)]
pub struct PublishEnv {
    /// `AWS_ACCESS_KEY_ID`
    pub access_key_id: Option<String>,
    /// `AWS_SECRET_ACCESS_KEY`
    pub secret_access_key: Option<String>,
    /// `AWS_REGION`
    pub region: Option<String>,
    /// `N1_S3_BUCKET`
    pub bucket: Option<String>,
    /// `N1_S3_ENDPOINT`
    pub endpoint: Option<String>,
    /// `NYLAS_INTERNAL_HOOK_URL`
    pub hook_url: Option<String>,
}

impl PublishEnv {
    /// Reads the process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            access_key_id: lookup(ACCESS_KEY_VAR),
            secret_access_key: lookup(SECRET_KEY_VAR),
            region: lookup(REGION_VAR),
            bucket: lookup(BUCKET_VAR),
            endpoint: lookup(ENDPOINT_VAR),
            hook_url: lookup(HOOK_URL_VAR),
        }
    }

    /// Returns the credentials, naming the first missing or empty variable.
    pub fn credentials(&self) -> Result<Credentials> {
        let access_key_id = non_empty(&self.access_key_id).ok_or(ReleaseError::MissingCredential {
            variable: ACCESS_KEY_VAR,
        })?;
        let secret_access_key =
            non_empty(&self.secret_access_key).ok_or(ReleaseError::MissingCredential {
                variable: SECRET_KEY_VAR,
            })?;
        Ok(Credentials {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
        })
    }

    /// Bucket releases are uploaded to.
    pub fn bucket(&self) -> &str {
        non_empty(&self.bucket).unwrap_or(DEFAULT_BUCKET)
    }

    /// Region of the bucket.
    pub fn region(&self) -> &str {
        non_empty(&self.region).unwrap_or(DEFAULT_REGION)
    }

    /// Webhook URL, when notifications are enabled.
    pub fn hook_url(&self) -> Option<&str> {
        non_empty(&self.hook_url)
    }

    /// Storage endpoint override.
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(&self.endpoint)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> PublishEnv {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PublishEnv::from_lookup(|name| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn missing_access_key_is_named_first() {
        let err = env(&[]).credentials().unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::MissingCredential { variable } if variable == ACCESS_KEY_VAR
        ));
    }

    #[test]
    fn empty_secret_is_missing() {
        let err = env(&[(ACCESS_KEY_VAR, "AKIA"), (SECRET_KEY_VAR, "")])
            .credentials()
            .unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::MissingCredential { variable } if variable == SECRET_KEY_VAR
        ));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let env = env(&[(ACCESS_KEY_VAR, "AKIA"), (SECRET_KEY_VAR, "s3cr3t")]);
        assert_eq!(env.bucket(), DEFAULT_BUCKET);
        assert_eq!(env.region(), DEFAULT_REGION);
        assert!(env.hook_url().is_none());
        let creds = env.credentials().unwrap();
        assert!(!format!("{creds:?}").contains("s3cr3t"));
    }
}
