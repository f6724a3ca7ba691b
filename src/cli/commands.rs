use crate::cli::args::{Cli, Commands, PageArgs};
use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::processors::{IngestionRun, RunOutcome};
use crate::query::{DailyFilter, PageRequest, QueryService, YearlyFilter};
use crate::store::WeatherStore;
use crate::utils::progress::ProgressReporter;
use tracing::debug;

pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(&cli);

    let settings = Settings::load(cli.config.as_deref(), &cli.settings_overrides())?;
    debug!(?settings, "Loaded settings");

    match cli.command {
        Commands::Ingest { json, .. } => {
            let outcome = tokio::task::spawn_blocking(move || ingest(&settings, json)).await??;

            if json {
                println!("{}", serde_json::to_string_pretty(outcome.summary())?);
            } else {
                if let RunOutcome::NothingToDo(_) = outcome {
                    println!("No station files found - nothing to do");
                }
                println!("\n{}", outcome.summary().render());
            }

            if !outcome.is_complete() {
                let summary = outcome.summary();
                return Err(ProcessingError::SkippedFiles {
                    skipped: summary.files_failed.len(),
                    discovered: summary.files_discovered,
                });
            }
        }

        Commands::Weather {
            station_id,
            date,
            page,
        } => {
            let filter = DailyFilter { station_id, date };
            let request = page_request(page);
            let json = tokio::task::spawn_blocking(move || -> Result<String> {
                let store = WeatherStore::open_read_only(settings.database())?;
                let page = QueryService::new(&store).daily(&filter, request)?;
                Ok(serde_json::to_string_pretty(&page)?)
            })
            .await??;
            println!("{}", json);
        }

        Commands::Stats {
            station_id,
            year,
            page,
        } => {
            let filter = YearlyFilter { station_id, year };
            let request = page_request(page);
            let json = tokio::task::spawn_blocking(move || -> Result<String> {
                let store = WeatherStore::open_read_only(settings.database())?;
                let page = QueryService::new(&store).yearly(&filter, request)?;
                Ok(serde_json::to_string_pretty(&page)?)
            })
            .await??;
            println!("{}", json);
        }

        Commands::MaterializeStats => {
            let written = tokio::task::spawn_blocking(move || -> Result<usize> {
                let mut store = WeatherStore::open(settings.database())?;
                store.materialize_yearly_stats()
            })
            .await??;
            println!("Materialized {} yearly statistics rows", written);
        }
    }

    Ok(())
}

/// One blocking ingestion run; the store is opened only if files were found.
fn ingest(settings: &Settings, json: bool) -> Result<RunOutcome> {
    let progress = ProgressReporter::new(0, "Ingesting station files...", json);
    let mut ingestion = IngestionRun::from_settings(settings);
    ingestion.execute(|| WeatherStore::open(settings.database()), Some(&progress))
}

fn page_request(page: PageArgs) -> PageRequest {
    PageRequest::normalize(page.page, page.page_size)
}

/// Set up structured logging on stderr; `RUST_LOG` takes precedence.
fn setup_logging(cli: &Cli) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wx_ingest={}", cli.log_level())));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
