//! Release publishing.
//!
//! The [`PublishPipeline`] resolves the release version, selects the
//! platform's artifacts, and either reports them (dry-run) or uploads them
//! all concurrently to the object store:
//!
//! ```text
//! Idle -> ResolvingVersion -> SelectingArtifacts -> DryRunComplete
//!                                                \-> ValidatingCredentials -> UploadingAll -> Completed
//! (any step) -> Failed
//! ```
//!
//! Any single upload failure fails the whole task. Uploads are idempotent
//! overwrites of deterministic keys, so re-running is safe.

pub mod artifacts;
pub mod checksum;
pub mod env;
pub mod policy;
pub mod progress;
pub mod storage;

pub use artifacts::{ArtifactDescriptor, select};
pub use env::{Credentials, PublishEnv};
pub use policy::{EnvPublishPolicy, PublishPolicy};
pub use progress::UploadProgress;
pub use storage::{ObjectStore, PUBLIC_READ, PutObject, S3Store, StoredObject};

use crate::error::Result;
use crate::notify::Notifier;
use crate::platform::{Arch, Platform};
use crate::version::{VersionControl, VersionResolver};
use futures_util::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long a finished publish waits for outstanding announcements.
pub const NOTIFICATION_GRACE: Duration = Duration::from_secs(10);

/// Position of a publish run in its state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PublishState {
    /// Not started
    Idle,
    /// Querying version control
    ResolvingVersion,
    /// Computing the artifact set
    SelectingArtifacts,
    /// Finished without uploading
    DryRunComplete,
    /// Checking storage credentials
    ValidatingCredentials,
    /// Uploads in flight
    UploadingAll,
    /// Every upload succeeded
    Completed,
    /// A step failed
    Failed,
}

/// Successful result of a publish run.
#[derive(Clone, Debug)]
pub enum PublishOutcome {
    /// Policy disallowed uploading; these artifacts would have been uploaded
    DryRun {
        /// Artifacts that were selected
        artifacts: Vec<ArtifactDescriptor>,
    },
    /// Every artifact was uploaded
    Completed {
        /// Stored objects, in artifact order
        uploads: Vec<StoredObject>,
    },
}

/// Connects to S3 using the bucket region and optional endpoint from `env`.
pub fn connect_s3(env: &PublishEnv, credentials: Credentials) -> Result<S3Store> {
    let store = S3Store::new(credentials, env.region());
    match env.endpoint() {
        Some(endpoint) => store.with_endpoint(endpoint),
        None => Ok(store),
    }
}

/// Publishes the artifacts of one platform build.
pub struct PublishPipeline<'a, V> {
    resolver: &'a VersionResolver<V>,
    env: PublishEnv,
    platform: Platform,
    arch: Arch,
    output_dir: PathBuf,
    notifier: Notifier,
    notification_grace: Duration,
    state: PublishState,
}

impl<'a, V: VersionControl> PublishPipeline<'a, V> {
    /// Creates a pipeline publishing `output_dir` for `platform`/`arch`.
    pub fn new(
        resolver: &'a VersionResolver<V>,
        env: PublishEnv,
        platform: Platform,
        arch: Arch,
        output_dir: &Path,
    ) -> Self {
        let notifier = Notifier::new(env.hook_url());
        Self {
            resolver,
            env,
            platform,
            arch,
            output_dir: output_dir.to_path_buf(),
            notifier,
            notification_grace: NOTIFICATION_GRACE,
            state: PublishState::Idle,
        }
    }

    /// Overrides how long announcements may delay completion.
    pub fn with_notification_grace(mut self, grace: Duration) -> Self {
        self.notification_grace = grace;
        self
    }

    /// Current state.
    pub fn state(&self) -> PublishState {
        self.state
    }

    fn transition(&mut self, next: PublishState) {
        log::debug!("publish: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs the pipeline. `connect` builds the storage client once
    /// credentials have been validated; it is never called on a dry-run.
    pub async fn run<P, S, F>(&mut self, policy: &P, connect: F) -> Result<PublishOutcome>
    where
        P: PublishPolicy,
        S: ObjectStore + Sync,
        F: FnOnce(&PublishEnv, Credentials) -> Result<S>,
    {
        match self.execute(policy, connect).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.transition(PublishState::Failed);
                Err(e)
            }
        }
    }

    async fn execute<P, S, F>(&mut self, policy: &P, connect: F) -> Result<PublishOutcome>
    where
        P: PublishPolicy,
        S: ObjectStore + Sync,
        F: FnOnce(&PublishEnv, Credentials) -> Result<S>,
    {
        self.transition(PublishState::ResolvingVersion);
        let version = self.resolver.resolve().await?.clone();

        self.transition(PublishState::SelectingArtifacts);
        let artifacts = select(&self.platform, self.arch, &self.output_dir, &version).await?;

        if !policy.should_publish() {
            log::info!(">> Not publishing builds…");
            log::info!(
                ">> Would have uploaded the following assets: {}",
                serde_json::to_string_pretty(&artifacts)?
            );
            self.transition(PublishState::DryRunComplete);
            return Ok(PublishOutcome::DryRun { artifacts });
        }

        self.transition(PublishState::ValidatingCredentials);
        let credentials = self.env.credentials()?;
        let store = connect(&self.env, credentials)?;

        self.transition(PublishState::UploadingAll);
        let bucket = self.env.bucket().to_string();
        let results = try_join_all(
            artifacts
                .iter()
                .map(|artifact| self.upload(&store, &bucket, artifact)),
        )
        .await?;

        let (uploads, notifications): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        // Uploads are done; announcements only get a bounded chance to finish.
        let pending = futures_util::future::join_all(notifications.into_iter().flatten());
        if tokio::time::timeout(self.notification_grace, pending)
            .await
            .is_err()
        {
            log::warn!(
                "Webhook announcements still pending after {:?}; not waiting",
                self.notification_grace
            );
        }

        self.transition(PublishState::Completed);
        Ok(PublishOutcome::Completed { uploads })
    }

    async fn upload<S: ObjectStore>(
        &self,
        store: &S,
        bucket: &str,
        artifact: &ArtifactDescriptor,
    ) -> Result<(StoredObject, Option<JoinHandle<()>>)> {
        log::info!(
            ">> Uploading {} to {}…",
            artifact.source.display(),
            artifact.key
        );
        let request = PutObject {
            source: artifact.source.clone(),
            bucket: bucket.to_string(),
            key: artifact.key.clone(),
            acl: PUBLIC_READ.to_string(),
            content_type: artifact.content_type.clone(),
        };
        let progress = Arc::new(UploadProgress::new(artifact.key.as_str()));

        let stored = store.put_object(&request, progress).await?;
        log::info!(">> Uploaded {} to {}", stored.key, stored.location);

        let notification = self.notifier.announce(&stored.key, &stored.location);
        Ok((stored, notification))
    }
}
