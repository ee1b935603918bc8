use clap::{Arg, Command};

#[must_use]
pub fn command() -> Command {
    Command::new("apikey")
        .about("Manages API keys")
        .subcommand_required(true)
        .subcommand(
            Command::new("add").about("Creates an API key").arg(
                Arg::new("label")
                    .help("API key label")
                    .required(true),
            ),
        )
        .subcommand(Command::new("list").about("Lists API keys"))
        .subcommand(
            Command::new("delete").about("Deletes an API key").arg(
                Arg::new("id")
                    .help("API key id")
                    .required(true)
                    .value_parser(clap::value_parser!(i64)),
            ),
        )
}
