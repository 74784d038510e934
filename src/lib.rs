pub mod cli;
pub mod core;
pub mod providers;
pub mod service;

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::service::RateService;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    /// Show the current rate table
    Rates { refresh: bool, json: bool },
    /// Convert an amount between two currencies
    Convert {
        amount: f64,
        from: String,
        to: String,
        json: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Baht rates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = RateService::new(config.sources.clone())?;
    let options = config.rates.fetch_options();

    match command {
        AppCommand::Rates { refresh, json } => {
            let spinner = (!json).then(|| ui::new_spinner("Fetching exchange rates..."));
            let payload = if refresh {
                service.refresh(&options).await
            } else {
                service.fetch_rates(&options).await
            };
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{}",
                    payload.display_as_table(&config.rates.display_currencies)
                );
            }
        }
        AppCommand::Convert {
            amount,
            from,
            to,
            json,
        } => {
            let from = from.trim().to_uppercase();
            let to = to.trim().to_uppercase();
            let result = match service.convert(amount, &from, &to, &options).await {
                Ok(result) => result,
                Err(e) if e.is_caller_error() => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Cannot convert {amount} {from} to {to}")));
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.display());
            }
        }
    }

    Ok(())
}
