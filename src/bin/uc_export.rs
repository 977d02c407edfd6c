use std::io::Write;
use std::process::ExitCode;

use env_logger::Env;
use uc_export::domains::export::CsvPartitionWriter;
use uc_export::domains::units::SessionUnitsExportRepository;
use uc_export::errors::ServiceResult;
use uc_export::{job, Config, MssqlSessionProvider};

async fn run() -> ServiceResult<i64> {
    let config = Config::from_env()?;
    log::info!("Connecting to {}", config.database);
    let provider = MssqlSessionProvider::new(&config.database, &config.schema_name)?;
    let repository = SessionUnitsExportRepository::new(provider);
    job::run(&config, &repository, &CsvPartitionWriter).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Loaded before the logger so RUST_LOG can come from .env.
    let dotenv_path = dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "{} - {} - {}", buf.timestamp_millis(), record.level(), record.args())
        })
        .init();
    if let Some(path) = dotenv_path {
        log::debug!("Loaded environment from {}", path.display());
    }

    match run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("An error occurred: {}", e);
            ExitCode::FAILURE
        }
    }
}
