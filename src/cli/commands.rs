use crate::{
    config::{DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY},
    store::upload::MIN_PART_SIZE,
};
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
    value_parser,
};
use std::path::{Path, PathBuf};

pub fn new(config_path: &Path) -> Command {
    // get config file path (default: ~/.config/s3resize/config.yml)
    let config_file_path = config_path.join("config.yml");

    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("s3resize")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resize an image stored in S3 and print the redirect response")
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("key")
                .help("Request key, <width>x<height>/<original key>, for example 200xAUTO/photos/cat.jpg")
                .long("key")
                .short('k')
                .env("KEY")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("config")
                .help("config.yml")
                .long("config")
                .short('c')
                .default_value(config_file_path.into_os_string())
                .value_name("config.yml")
                .value_parser(value_parser!(PathBuf))
                .num_args(1),
        )
        .arg(
            Arg::new("bucket")
                .help("Bucket holding originals and resized images")
                .long("bucket")
                .env("BUCKET")
                .num_args(1),
        )
        .arg(
            Arg::new("region")
                .help("AWS region, ignored when --endpoint is set")
                .long("region")
                .env("REGION")
                .num_args(1),
        )
        .arg(
            Arg::new("endpoint")
                .help("Custom S3 endpoint, for example http://127.0.0.1:9000")
                .long("endpoint")
                .env("S3_ENDPOINT")
                .num_args(1),
        )
        .arg(
            Arg::new("public-url")
                .help("Base URL of the redirect, derived from the bucket website when missing")
                .long("public-url")
                .env("PUBLIC_URL")
                .num_args(1),
        )
        .arg(
            Arg::new("format")
                .help("Output format")
                .long("format")
                .env("OUTPUT_FORMAT")
                .value_parser(["png", "jpeg", "jpg"])
                .num_args(1),
        )
        .arg(
            Arg::new("quality")
                .help(format!("JPEG quality 1-100 [default: {DEFAULT_QUALITY}]"))
                .long("quality")
                .value_parser(value_parser!(u8).range(1..=100))
                .num_args(1),
        )
        .arg(
            Arg::new("part-size")
                .help(format!(
                    "Bytes buffered per upload part, minimum {MIN_PART_SIZE} [default: {MIN_PART_SIZE}]"
                ))
                .long("part-size")
                .value_parser(value_parser!(usize))
                .num_args(1),
        )
        .arg(
            Arg::new("max-dimension")
                .help(format!(
                    "Largest width or height accepted [default: {DEFAULT_MAX_DIMENSION}]"
                ))
                .long("max-dimension")
                .value_parser(value_parser!(u32).range(1..))
                .num_args(1),
        )
        .arg(
            Arg::new("access-key")
                .long("access-key")
                .env("AWS_ACCESS_KEY_ID")
                .hide(true)
                .hide_env_values(true)
                .num_args(1),
        )
        .arg(
            Arg::new("secret-key")
                .long("secret-key")
                .env("AWS_SECRET_ACCESS_KEY")
                .hide(true)
                .hide_env_values(true)
                .num_args(1),
        )
        .arg(
            Arg::new("verbose")
                .help("Verbosity level, -vv for debug")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        )
}
