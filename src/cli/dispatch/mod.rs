//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::cli::actions::Action;
use anyhow::{anyhow, Context, Result};

fn required_string(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: {name}"))
}

/// Map validated CLI matches to an action.
///
/// # Errors
///
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    match matches.subcommand() {
        Some(("server", sub)) => Ok(Action::Server {
            port: sub.get_one::<u16>("port").copied().unwrap_or(8080),
            dsn,
        }),
        Some(("apikey", sub)) => match sub.subcommand() {
            Some(("add", sub)) => Ok(Action::ApiKeyAdd {
                dsn,
                label: required_string(sub, "label")?,
            }),
            Some(("list", _)) => Ok(Action::ApiKeyList { dsn }),
            Some(("delete", sub)) => Ok(Action::ApiKeyDelete {
                dsn,
                id: sub
                    .get_one::<i64>("id")
                    .copied()
                    .context("missing required argument: id")?,
            }),
            _ => Err(anyhow!("missing apikey subcommand")),
        },
        Some(("device", sub)) => match sub.subcommand() {
            Some(("add", sub)) => Ok(Action::DeviceAdd {
                dsn,
                label: required_string(sub, "label")?,
            }),
            Some(("add-existing", sub)) => Ok(Action::DeviceAddExisting {
                dsn,
                label: required_string(sub, "label")?,
                public_id: required_string(sub, "public-id")?,
                private_id: required_string(sub, "private-id")?,
                key: required_string(sub, "key")?,
            }),
            Some(("list", _)) => Ok(Action::DeviceList { dsn }),
            Some(("delete", sub)) => Ok(Action::DeviceDelete {
                dsn,
                public_id: required_string(sub, "public-id")?,
            }),
            _ => Err(anyhow!("missing device subcommand")),
        },
        _ => Err(anyhow!("missing subcommand")),
    }
}
