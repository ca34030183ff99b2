use std::{error::Error, path::PathBuf, process, time::Duration};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use dining::{party, Appetite, DelayRange, PartyConfig, DINERS};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Logging {
    /// Write the table log to a file
    T,
    /// Print the table log on the console
    F,
}

/// Dining philosophers party.
#[derive(Parser, Debug)]
#[command(name = "dining")]
struct Cli {
    /// Length of the party in seconds, 0 keeps it going until interrupted
    seconds: u64,

    /// Log to a file (T) or to the console (F)
    #[arg(value_enum, ignore_case = true)]
    logging: Logging,

    /// Number of philosophers at the table
    #[arg(long, default_value_t = DINERS)]
    diners: usize,

    /// File the table log goes to when logging is T
    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,

    /// Shortest think or eat delay
    #[arg(long, default_value_t = 1000)]
    min_delay_ms: u64,

    /// Longest think or eat delay
    #[arg(long, default_value_t = 5000)]
    max_delay_ms: u64,

    /// Interval between checks that every philosopher is still alive
    #[arg(long, default_value_t = 3)]
    heartbeat_secs: u64,
}

impl Cli {
    fn config(&self) -> PartyConfig {
        let delay = DelayRange::new(self.min_delay_ms, self.max_delay_ms);
        PartyConfig {
            diners: self.diners,
            length: Some(Duration::from_secs(self.seconds)).filter(|l| !l.is_zero()),
            appetite: Appetite {
                think: delay,
                eat: delay,
            },
            log_file: match self.logging {
                Logging::T => Some(self.log_file.clone()),
                Logging::F => None,
            },
            heartbeat: Duration::from_secs(self.heartbeat_secs.max(1)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match party::run(cli.config()).await {
        Ok(meals) => {
            tracing::info!(meals = meals.iter().sum::<u64>(), "everyone went home");
            Ok(())
        }
        Err(e) => {
            println!("{e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_positional_length_and_logging() {
        let cli = Cli::try_parse_from(["dining", "10", "T"]).unwrap();
        let config = cli.config();
        assert_eq!(config.length, Some(Duration::from_secs(10)));
        assert_eq!(config.log_file, Some(PathBuf::from("log.txt")));
        assert_eq!(config.diners, 5);
        assert!(config.validate().is_ok());

        let cli = Cli::try_parse_from(["dining", "0", "f"]).unwrap();
        let config = cli.config();
        assert_eq!(config.length, None);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_logging_forever_rejected() {
        let cli = Cli::try_parse_from(["dining", "0", "T"]).unwrap();
        assert!(cli.config().validate().is_err());
    }

    #[test]
    fn test_bad_arguments() {
        assert!(Cli::try_parse_from(["dining", "10"]).is_err());
        assert!(Cli::try_parse_from(["dining", "-3", "T"]).is_err());
        assert!(Cli::try_parse_from(["dining", "10", "X"]).is_err());
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "dining",
            "5",
            "F",
            "--diners",
            "7",
            "--min-delay-ms",
            "10",
            "--max-delay-ms",
            "20",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.diners, 7);
        assert_eq!(config.appetite.eat, DelayRange::new(10, 20));
    }
}
