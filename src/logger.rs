use anyhow::Result;
use anyhow::anyhow;
use ftail::Ftail;
use log::LevelFilter;
use log::info;
use std::env;
use std::fs;

const LOGS_DIR: &str = ".logs";
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Console gets warnings (info with `verbose`), the log file always gets info.
pub fn init_logger(verbose: bool) -> Result<()> {
    let home_folder = match env::home_dir() {
        Some(h) => h,
        None => return Err(anyhow!("Could not determine $HOME")),
    };

    let logs_path = home_folder.join(LOGS_DIR).join(PKG_NAME);
    let logs_file = logs_path.join(format!("{}.log", PKG_NAME));

    if let Err(e) = fs::create_dir_all(&logs_path) {
        return Err(anyhow!(
            "Could not create logs dir at {:#?}: {}",
            &logs_path,
            e
        ));
    }

    let console_level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    match Ftail::new()
        .console(console_level)
        .single_file(&logs_file, true, LevelFilter::Info)
        .init()
    {
        Ok(_) => {
            info!("Logger initialized.");
            Ok(())
        }
        Err(e) => Err(anyhow!("Could not initialize logger: {}", e)),
    }
}
