use clap::{Arg, Command};

#[must_use]
pub fn command() -> Command {
    Command::new("server")
        .about("Runs the validation API server")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("OTIVAL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
}
