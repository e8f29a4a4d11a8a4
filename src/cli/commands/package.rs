//! The packaging task.

use crate::cli::Args;
use crate::error::{CliError, ReleaseError, Result};
use crate::metadata::AppManifest;
use crate::packaging::{BuildConfiguration, CommandCompiler, ExternalPackager, PackagingPipeline};

/// Packages the application for the selected platform.
pub async fn package(args: &Args) -> Result<()> {
    let platform = args.platform();
    if !platform.is_supported() {
        return Err(ReleaseError::UnsupportedPlatform {
            platform: platform.to_string(),
        });
    }
    let arch = args
        .arch()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let manifest = AppManifest::load_from_dir(&args.app_dir)?;

    let config = BuildConfiguration::new(&manifest, &args.app_dir, &args.output_dir, platform, arch);
    let pipeline = PackagingPipeline::new(config, CommandCompiler::default(), ExternalPackager::default());
    let outputs = pipeline.run().await?;

    for path in outputs {
        println!("{}", path.display());
    }
    Ok(())
}
