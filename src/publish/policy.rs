//! Decides whether a build is uploaded or only reported (dry-run).

/// Gate between a dry-run and a real upload.
pub trait PublishPolicy {
    /// Returns true when artifacts should actually be uploaded.
    fn should_publish(&self) -> bool;
}

impl<F: Fn() -> bool> PublishPolicy for F {
    fn should_publish(&self) -> bool {
        self()
    }
}

/// Publishes only when `SHOULD_PUBLISH` is set and the build is not for a
/// pull request.
#[derive(Clone, Debug, Default)]
pub struct EnvPublishPolicy {
    should_publish: Option<String>,
    travis_pull_request: Option<String>,
    appveyor_pull_request: Option<String>,
}

impl EnvPublishPolicy {
    /// Reads the policy inputs from the process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the policy inputs through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            should_publish: lookup("SHOULD_PUBLISH"),
            travis_pull_request: lookup("TRAVIS_PULL_REQUEST"),
            appveyor_pull_request: lookup("APPVEYOR_PULL_REQUEST_NUMBER"),
        }
    }
}

impl PublishPolicy for EnvPublishPolicy {
    fn should_publish(&self) -> bool {
        if self.should_publish.as_deref().is_none_or(|v| v.trim().is_empty()) {
            log::info!(">> SHOULD_PUBLISH environment variable not set");
            return false;
        }
        let travis_pr = self
            .travis_pull_request
            .as_deref()
            .is_some_and(|v| v != "false");
        if travis_pr || self.appveyor_pull_request.is_some() {
            log::info!(">> Skipping publish on pull request builds");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(pairs: &[(&str, &str)]) -> EnvPublishPolicy {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvPublishPolicy::from_lookup(|name| {
            pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn requires_should_publish() {
        assert!(!policy(&[]).should_publish());
        assert!(!policy(&[("SHOULD_PUBLISH", " ")]).should_publish());
        assert!(policy(&[("SHOULD_PUBLISH", "1")]).should_publish());
    }

    #[test]
    fn skips_pull_requests() {
        assert!(policy(&[("SHOULD_PUBLISH", "1"), ("TRAVIS_PULL_REQUEST", "false")]).should_publish());
        assert!(!policy(&[("SHOULD_PUBLISH", "1"), ("TRAVIS_PULL_REQUEST", "42")]).should_publish());
        assert!(
            !policy(&[("SHOULD_PUBLISH", "1"), ("APPVEYOR_PULL_REQUEST_NUMBER", "7")])
                .should_publish()
        );
    }

    #[test]
    fn closures_are_policies() {
        let never = || false;
        assert!(!never.should_publish());
    }
}
