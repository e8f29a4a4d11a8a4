//! The publish task.

use crate::cli::Args;
use crate::error::{CliError, Result};
use crate::metadata::AppManifest;
use crate::publish::{EnvPublishPolicy, PublishEnv, PublishOutcome, PublishPipeline, connect_s3};
use crate::version::{GitCli, VersionResolver};

/// Publishes this platform's artifacts, or lists them when publishing is off.
pub async fn publish(args: &Args) -> Result<()> {
    let platform = args.platform();
    let arch = args
        .arch()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let manifest = AppManifest::load_from_dir(&args.app_dir)?;

    let resolver = VersionResolver::new(manifest.version, GitCli::new(&args.app_dir));
    let mut pipeline = PublishPipeline::new(
        &resolver,
        PublishEnv::from_process(),
        platform,
        arch,
        &args.output_dir,
    );

    match pipeline
        .run(&EnvPublishPolicy::from_process(), connect_s3)
        .await?
    {
        PublishOutcome::DryRun { artifacts } => {
            log::info!(">> Dry run complete ({} artifacts)", artifacts.len());
        }
        PublishOutcome::Completed { uploads } => {
            for upload in uploads {
                println!("{}", upload.location);
            }
        }
    }
    Ok(())
}
