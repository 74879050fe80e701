use std::path::PathBuf;
use std::sync::atomic::Ordering;

use argh::FromArgs;

use orthoflow_georef::CommandOracle;
use orthoflow_pipeline::{Config, Pipeline};

#[derive(FromArgs)]
/// Convert a stream of geotagged drone images into orthophotos.
struct Args {
    /// path to the JSON run configuration
    #[argh(option, short = 'c')]
    config: PathBuf,

    /// override the oracle program named in the configuration
    #[argh(option)]
    oracle: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = argh::from_env();

    let config = Config::from_file(&args.config)?;
    let oracle = match (&args.oracle, &config.oracle) {
        (Some(program), _) => CommandOracle::new(program.clone(), Vec::new()),
        (None, Some(oracle)) => CommandOracle::new(oracle.program.clone(), oracle.args.clone()),
        (None, None) => return Err("no bundle adjustment oracle configured".into()),
    };

    let mut pipeline = Pipeline::new(config, oracle)?;

    let cancel = pipeline.cancel_flag();
    ctrlc::set_handler(move || {
        log::warn!("received interrupt, finishing the current image");
        cancel.store(true, Ordering::SeqCst);
    })?;

    let summary = pipeline.run()?;
    log::info!(
        "{} orthophotos written ({} accepted, {} rejected, {} skipped)",
        summary.processed,
        summary.accepted,
        summary.rejected,
        summary.skipped
    );
    Ok(())
}
