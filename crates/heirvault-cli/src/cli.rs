//! Argument parsing.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// What the user asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Help,
    Version,
    /// Check the config and exit
    Validate,
    Plan {
        request: PathBuf,
        kit: Option<PathBuf>,
    },
    Verify {
        kit: PathBuf,
    },
    Status {
        address: String,
        locktime: Option<u32>,
    },
    CheckIn {
        locktime: u32,
        confirmations: Option<u32>,
    },
    /// `-` reads the hex from stdin
    Broadcast {
        tx_hex: String,
    },
    Combine {
        shares: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub action: Action,
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

fn parse_number(value: &str, flag: &str) -> Result<u32> {
    value
        .parse()
        .with_context(|| format!("{} expects a whole number, got '{}'", flag, value))
}

/// Parse `args` (without the program name).
pub fn parse(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut global: Option<Action> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut kit = None;
    let mut locktime = None;
    let mut confirmations = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(flag_value(args, &mut i, "--config")?));
            }
            "--help" | "-h" => global = Some(Action::Help),
            "--version" | "-V" => {
                global.get_or_insert(Action::Version);
            }
            "--validate" => {
                global.get_or_insert(Action::Validate);
            }
            "--kit" => kit = Some(PathBuf::from(flag_value(args, &mut i, "--kit")?)),
            "--locktime" => {
                locktime = Some(parse_number(
                    flag_value(args, &mut i, "--locktime")?,
                    "--locktime",
                )?);
            }
            "--confirmations" => {
                confirmations = Some(parse_number(
                    flag_value(args, &mut i, "--confirmations")?,
                    "--confirmations",
                )?);
            }
            "-" => positional.push("-".to_string()),
            other if other.starts_with('-') => bail!("Unknown argument: {}", other),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if let Some(action) = global {
        return Ok(Invocation {
            config_path,
            action,
        });
    }

    let Some((command, rest)) = positional.split_first() else {
        return Ok(Invocation {
            config_path,
            action: Action::Help,
        });
    };

    let one = |what: &str| -> Result<String> {
        match rest {
            [value] => Ok(value.clone()),
            [] => bail!("{} requires {}", command, what),
            _ => bail!("{} takes a single {}", command, what),
        }
    };

    let action = match command.as_str() {
        "plan" => Action::Plan {
            request: PathBuf::from(one("a request file")?),
            kit,
        },
        "verify" => Action::Verify {
            kit: PathBuf::from(one("a kit file")?),
        },
        "status" => Action::Status {
            address: one("an address")?,
            locktime,
        },
        "checkin" => {
            if !rest.is_empty() {
                bail!("checkin takes no positional arguments");
            }
            Action::CheckIn {
                locktime: locktime.context("checkin requires --locktime <blocks>")?,
                confirmations,
            }
        }
        "broadcast" => Action::Broadcast {
            tx_hex: one("transaction hex (or - for stdin)")?,
        },
        "combine" => {
            if rest.is_empty() {
                bail!("combine requires at least one share");
            }
            Action::Combine {
                shares: rest.to_vec(),
            }
        }
        other => bail!("Unknown command: {}", other),
    };

    Ok(Invocation {
        config_path,
        action,
    })
}
