use std::path::PathBuf;
use std::time::Duration;

use clap::{builder::ValueParser, value_parser, Arg, Command};

pub const DEFAULT_CHUNK_LENGTH: &str = "5ms";
pub const DEFAULT_MAX_SWAP_FAILS: &str = "250";

/// Parse a chunk duration such as `5ms`, `250ms`, or `2s` into a
/// [`Duration`].
///
/// A value is one or more `<number><unit>` components run together
/// (`"1s500ms"`), with units `ms`, `s`, `m`, and `h`. The total must be
/// positive and expressible in whole milliseconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let input = value.trim();
    if input.is_empty() {
        return Err("duration cannot be empty".into());
    }

    let mut total_ms: u128 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(format!("invalid duration '{value}'"));
        }

        let number = rest[..digits]
            .parse::<u128>()
            .map_err(|_| format!("invalid duration '{value}'"))?;
        rest = &rest[digits..];

        let factor = if let Some(tail) = rest.strip_prefix("ms") {
            rest = tail;
            1u128
        } else if let Some(tail) = rest.strip_prefix('s') {
            rest = tail;
            1_000
        } else if let Some(tail) = rest.strip_prefix('m') {
            rest = tail;
            60_000
        } else if let Some(tail) = rest.strip_prefix('h') {
            rest = tail;
            3_600_000
        } else {
            return Err(format!("duration '{value}' needs a unit (ms, s, m, h)"));
        };

        total_ms = number
            .checked_mul(factor)
            .and_then(|component| total_ms.checked_add(component))
            .ok_or_else(|| "duration is too large".to_owned())?;
    }

    if total_ms == 0 {
        return Err("duration must be greater than zero".into());
    }

    u64::try_from(total_ms)
        .map(Duration::from_millis)
        .map_err(|_| "duration is too large".into())
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Rearrange a sound file to match another")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("The sound file to recreate")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("palette")
                .value_name("PALETTE")
                .help("The sound file to recreate it from")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .help("The sound file to output")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("chunk-length")
                .long("chunk-length")
                .value_name("DURATION")
                .help("Length of each chunk the sound files are divided in (e.g. 5ms, 1s)")
                .default_value(DEFAULT_CHUNK_LENGTH)
                .value_parser(ValueParser::new(parse_duration)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed of the random number generator")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("max-swap-fails")
                .long("max-swap-fails")
                .value_name("COUNT")
                .help("Consecutive failed attempts to improve the quality before stopping")
                .default_value(DEFAULT_MAX_SWAP_FAILS)
                .value_parser(value_parser!(u32)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_handles_each_unit() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3_600));
    }

    #[test]
    fn parse_duration_sums_run_together_components() {
        assert_eq!(
            parse_duration("1s500ms").unwrap(),
            Duration::from_millis(1_500)
        );
        assert_eq!(parse_duration("2m5s").unwrap(), Duration::from_secs(125));
    }

    #[test]
    fn parse_duration_rejects_bare_numbers() {
        assert!(parse_duration("100").is_err());
    }

    #[test]
    fn parse_duration_rejects_unknown_units() {
        assert!(parse_duration("10q").is_err());
        assert!(parse_duration("5 ms").is_err());
    }

    #[test]
    fn parse_duration_rejects_zero() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("0s0ms").is_err());
    }

    #[test]
    fn cli_applies_defaults() {
        let matches = build_cli()
            .try_get_matches_from(["audiomosaic", "t.wav", "p.wav", "o.wav"])
            .unwrap();
        assert_eq!(
            *matches.get_one::<Duration>("chunk-length").unwrap(),
            Duration::from_millis(5)
        );
        assert_eq!(*matches.get_one::<u32>("max-swap-fails").unwrap(), 250);
        assert!(matches.get_one::<u64>("seed").is_none());
    }
}
