//! Parsing Options.
//! `--fire "t0 t1 t0"` takes a space separated action sequence.

use clap::{Arg, ArgAction, Command};
use std::error::Error;

fn make_options_parser() -> clap::Command {
    let parser = Command::new("pnflow")
        .no_binary_name(true)
        .version("v0.1.0")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Net definition to load, JSON or RON by extension"),
        )
        .arg(
            Arg::new("schema")
                .short('s')
                .long("schema")
                .help("Schema name to register under, defaults to the file stem"),
        )
        .arg(
            Arg::new("fire")
                .short('f')
                .long("fire")
                .value_name("ACTIONS")
                .help("Space separated action sequence to dispatch in order"),
        )
        .arg(
            Arg::new("multiplier")
                .short('m')
                .long("multiplier")
                .default_value("1"), // 每次发射共用的倍数
        )
        .arg(
            Arg::new("random")
                .short('r')
                .long("random")
                .value_name("STEPS")
                .default_value("0")
                .value_parser(clap::value_parser!(usize))
                .help("Random-walk this many extra steps"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Seed for the random walk"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print dispatch events as JSON"),
        )
        .arg(
            Arg::new("dot")
                .short('d')
                .long("dot")
                .value_name("FILE")
                .help("Write the final marking as a Graphviz graph"),
        );
    parser
}

#[derive(Debug)]
pub struct Options {
    pub input: String,
    pub schema: Option<String>,
    pub fire: Vec<String>,
    pub multiplier: u64,
    pub random: usize,
    pub seed: Option<u64>,
    pub json: bool,
    pub dot: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            input: String::new(),
            schema: None,
            fire: Vec::new(),
            multiplier: 1,
            random: 0,
            seed: None,
            json: false,
            dot: None,
        }
    }
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let input = matches
            .get_one::<String>("input")
            .cloned()
            .ok_or("missing required --input")?;
        let schema = matches.get_one::<String>("schema").cloned();
        let fire = match matches.get_one::<String>("fire") {
            Some(sequence) => shellwords::split(sequence)?,
            None => Vec::new(),
        };
        let multiplier = match matches.get_one::<String>("multiplier") {
            Some(raw) => raw.parse::<u64>()?,
            None => 1,
        };
        let random = matches.get_one::<usize>("random").copied().unwrap_or(0);
        let seed = matches.get_one::<u64>("seed").copied();
        let json = matches.get_flag("json");
        let dot = matches.get_one::<String>("dot").cloned();

        Ok(Options {
            input,
            schema,
            fire,
            multiplier,
            random,
            seed,
            json,
            dot,
        })
    }
}
