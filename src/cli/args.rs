use crate::config::{FileErrorPolicy, SettingsOverrides};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wx-ingest")]
#[command(about = "Ingest daily weather station files into the warehouse and read them back")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Warehouse database file [env: WX_DATABASE_PATH]")]
    pub database: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one ingestion pass over the configured data directory
    Ingest {
        #[arg(short, long, help = "Directory holding station files [env: WX_DATA_PATH]")]
        data_path: Option<PathBuf>,

        #[arg(short, long, help = "Glob for station files under the data directory [default: *.txt]")]
        pattern: Option<String>,

        #[arg(long, value_enum, help = "What to do with unreadable files [default: skip]")]
        on_file_error: Option<FileErrorPolicy>,

        #[arg(long, default_value = "false", help = "Print the run summary as JSON")]
        json: bool,
    },

    /// Page through daily observations
    Weather {
        #[arg(short, long)]
        station_id: Option<String>,

        #[arg(short, long, help = "Observation date (YYYY-MM-DD)")]
        date: Option<NaiveDate>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Page through yearly statistics
    Stats {
        #[arg(short, long)]
        station_id: Option<String>,

        #[arg(short, long)]
        year: Option<i32>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Rebuild yearly statistics from the daily table
    MaterializeStats,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    #[arg(long, allow_negative_numbers = true, help = "1-based page number [default: 1]")]
    pub page: Option<i64>,

    #[arg(long, allow_negative_numbers = true, help = "Rows per page, 1 to 500 [default: 50]")]
    pub page_size: Option<i64>,
}

impl Cli {
    pub fn settings_overrides(&self) -> SettingsOverrides {
        let mut overrides = SettingsOverrides {
            database_path: self.database.clone(),
            ..Default::default()
        };

        if let Commands::Ingest {
            data_path,
            pattern,
            on_file_error,
            ..
        } = &self.command
        {
            overrides.data_path = data_path.clone();
            overrides.file_pattern = pattern.clone();
            overrides.on_file_error = *on_file_error;
        }

        overrides
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_overrides() {
        let cli = Cli::parse_from([
            "wx-ingest",
            "--database",
            "/tmp/wx.db",
            "ingest",
            "--data-path",
            "/data/wx",
            "--on-file-error",
            "abort",
        ]);

        let overrides = cli.settings_overrides();
        assert_eq!(overrides.data_path, Some(PathBuf::from("/data/wx")));
        assert_eq!(overrides.database_path, Some(PathBuf::from("/tmp/wx.db")));
        assert_eq!(overrides.on_file_error, Some(FileErrorPolicy::Abort));
        assert_eq!(overrides.file_pattern, None);
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_weather_query_args() {
        let cli = Cli::parse_from([
            "wx-ingest",
            "weather",
            "--station-id",
            "ST001",
            "--date",
            "2023-01-02",
            "--page",
            "0",
            "--page-size",
            "10000",
            "-v",
        ]);

        let Commands::Weather {
            station_id,
            date,
            page,
        } = &cli.command
        else {
            panic!("expected weather command");
        };
        assert_eq!(station_id.as_deref(), Some("ST001"));
        assert_eq!(*date, NaiveDate::from_ymd_opt(2023, 1, 2));
        assert_eq!(page.page, Some(0));
        assert_eq!(page.page_size, Some(10_000));
        assert_eq!(cli.log_level(), "debug");
        assert!(cli.settings_overrides().data_path.is_none());
    }

    #[test]
    fn test_negative_page_is_accepted() {
        let cli = Cli::parse_from(["wx-ingest", "stats", "--page", "-2"]);
        let Commands::Stats { page, .. } = cli.command else {
            panic!("expected stats command");
        };
        assert_eq!(page.page, Some(-2));
    }
}
