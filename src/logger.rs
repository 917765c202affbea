use anyhow::{anyhow, Result};
use ftail::Ftail;
use log::{info, LevelFilter};
use std::env;
use std::fs;

const LOGS_DIR: &str = ".logs";
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

pub fn init_logger(verbose: bool) -> Result<()> {
    let home_folder = env::home_dir().ok_or_else(|| anyhow!("Could not determine $HOME"))?;

    let logs_path = home_folder.join(LOGS_DIR).join(PKG_NAME);
    let logs_file = logs_path.join(format!("{}.log", PKG_NAME));

    fs::create_dir_all(&logs_path)
        .map_err(|e| anyhow!("Could not create logs dir at {:#?}: {}", &logs_path, e))?;

    // Console stays quiet so it doesn't interleave with rendered results
    let console_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let file_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    Ftail::new()
        .console(console_level)
        .single_file(&logs_file, true, file_level)
        .init()
        .map_err(|e| anyhow!("Could not initialize logger: {}", e))?;

    info!("Logger initialized.");
    Ok(())
}
