//! Parsing Options.
//! `pn [-a {analysis}] [-c config.toml] [-p place] [-o out.json] [--dot] <net>`

use anyhow::{Result, bail};
use clap::{Arg, ArgAction, Command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Bounded,
    Coverability,
    Reachability,
    Cycles,
    Deadlocks,
}

fn make_options_parser() -> clap::Command {
    Command::new("pn")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Coverability, boundedness and cycle analysis of Petri nets")
        .arg(
            Arg::new("analysis")
                .short('a')
                .long("analysis")
                .help("The analysis to run")
                .default_value("bounded")
                .value_parser(["bounded", "cover", "reach", "cycles", "deadlocks"]),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML analysis configuration, ignored if missing")
                .default_value("pn.toml"),
        )
        .arg(
            Arg::new("place")
                .short('p')
                .long("place")
                .value_name("PLACE")
                .help("Restrict the boundedness check to one place"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the resulting transition system as a JSON document"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout-ms")
                .value_name("MS")
                .help("Cancel the analysis after this many milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .help("Print the resulting transition system in DOT format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("net")
                .value_name("NET")
                .help("Net document (.json or .ron)")
                .required(true),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub analysis: AnalysisKind,
    pub config: String,
    pub place: Option<String>,
    pub output: Option<String>,
    pub timeout_ms: Option<u64>,
    pub dot: bool,
    pub net: String,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let analysis = match matches.get_one::<String>("analysis").map(String::as_str) {
            Some("bounded") => AnalysisKind::Bounded,
            Some("cover") => AnalysisKind::Coverability,
            Some("reach") => AnalysisKind::Reachability,
            Some("cycles") => AnalysisKind::Cycles,
            Some("deadlocks") => AnalysisKind::Deadlocks,
            other => bail!("unsupported analysis kind {other:?}"),
        };

        Ok(Options {
            analysis,
            config: matches
                .get_one::<String>("config")
                .cloned()
                .unwrap_or_default(),
            place: matches.get_one::<String>("place").cloned(),
            output: matches.get_one::<String>("output").cloned(),
            timeout_ms: matches.get_one::<u64>("timeout").copied(),
            dot: matches.get_flag("dot"),
            net: matches.get_one::<String>("net").cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::parse_from_str("nets/ring.json").unwrap();
        assert_eq!(options.analysis, AnalysisKind::Bounded);
        assert_eq!(options.config, "pn.toml");
        assert_eq!(options.net, "nets/ring.json");
        assert!(!options.dot);
        assert!(options.timeout_ms.is_none());
    }

    #[test]
    fn test_parse_from_str() {
        let options =
            Options::parse_from_str("-a cycles --timeout-ms 250 --dot -o 'out dir/ts.json' net.ron")
                .unwrap();
        assert_eq!(options.analysis, AnalysisKind::Cycles);
        assert_eq!(options.timeout_ms, Some(250));
        assert_eq!(options.output.as_deref(), Some("out dir/ts.json"));
        assert!(options.dot);
    }

    #[test]
    fn test_parse_from_str_err() {
        assert!(Options::parse_from_str("-a liveness net.json").is_err());
        assert!(Options::parse_from_str("-a cover").is_err());
        assert!(Options::parse_from_str("'unterminated").is_err());
    }

    #[test]
    fn test_parse_from_args_err() {
        let options = Options::parse_from_args(&[
            "--timeout-ms".to_owned(),
            "soon".to_owned(),
            "net.json".to_owned(),
        ]);
        assert!(options.is_err());
    }
}
