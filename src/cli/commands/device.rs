use clap::{builder::ValueParser, Arg, Command};

use crate::store::models::{
    valid_hex, valid_modhex, AES_KEY_BYTE_LEN, PRIVATE_ID_BYTE_LEN, PUBLIC_ID_BYTE_LEN,
};

fn validator_modhex(len: usize) -> ValueParser {
    ValueParser::from(
        move |value: &str| -> std::result::Result<String, String> {
            if valid_modhex(value, len) {
                Ok(value.to_owned())
            } else {
                Err(format!("must be {len} modhex characters"))
            }
        },
    )
}

fn validator_hex(len: usize) -> ValueParser {
    ValueParser::from(
        move |value: &str| -> std::result::Result<String, String> {
            if valid_hex(value, len) {
                Ok(value.to_owned())
            } else {
                Err(format!("must be {len} hexadecimal characters"))
            }
        },
    )
}

#[must_use]
pub fn command() -> Command {
    Command::new("device")
        .about("Manages YubiKey devices")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Registers a device, autogenerating IDs and an AES key that can be uploaded to a YubiKey")
                .arg(Arg::new("label").help("device label").required(true)),
        )
        .subcommand(
            Command::new("add-existing")
                .about("Registers an already configured device")
                .arg(Arg::new("label").help("device label").required(true))
                .arg(
                    Arg::new("public-id")
                        .help(r#"public ID (12 modhex characters such as "vvungrrdhvtk")"#)
                        .required(true)
                        .value_parser(validator_modhex(2 * PUBLIC_ID_BYTE_LEN)),
                )
                .arg(
                    Arg::new("private-id")
                        .help(r#"private ID (12 hexadecimal characters such as "8792ebfe26cc")"#)
                        .required(true)
                        .value_parser(validator_hex(2 * PRIVATE_ID_BYTE_LEN)),
                )
                .arg(
                    Arg::new("key")
                        .help(r#"AES key (32 hexadecimal characters such as "00112233445566778899aabbccddeeff")"#)
                        .required(true)
                        .value_parser(validator_hex(2 * AES_KEY_BYTE_LEN)),
                ),
        )
        .subcommand(Command::new("list").about("Lists devices"))
        .subcommand(
            Command::new("delete").about("Deletes a device").arg(
                Arg::new("public-id")
                    .help("device public ID")
                    .required(true),
            ),
        )
}
