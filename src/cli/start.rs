use crate::{
    cli::{Config, commands},
    config::Settings,
    handler::ResizeRequestHandler,
    resize::OutputFormat,
    s3::{Credentials, Region, S3},
    store::{S3Store, upload::MIN_PART_SIZE},
};
use anyhow::{Context, Result, anyhow};
use clap::{ArgMatches, parser::ValueSource};
use secrecy::SecretString;
use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Everything `main` needs: the request key and a ready handler
pub struct Invocation {
    pub key: String,
    pub handler: ResizeRequestHandler,
}

#[must_use]
pub fn get_config_path() -> PathBuf {
    let home_dir = dirs::home_dir().map_or_else(|| PathBuf::from("/tmp"), |h| h);

    Path::new(&home_dir).join(".config").join("s3resize")
}

/// # Errors
///
/// Will return an error if the configuration is incomplete or invalid
pub fn start() -> Result<Invocation> {
    let config_path = get_config_path();

    // start the command line interface
    let matches = commands::new(&config_path).get_matches();

    let verbosity_level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(verbosity_level)
        .init();

    build(&matches)
}

/// Merge `config.yml` with flags and environment, flags win
///
/// # Errors
///
/// Will return an error if the configuration is incomplete or invalid
pub fn build(matches: &ArgMatches) -> Result<Invocation> {
    let config = load_config(matches)?;

    log::debug!("config: {config:#?}");

    let key = matches
        .get_one::<String>("key")
        .cloned()
        .context("missing --key")?;

    // BUCKET
    let bucket = arg_or(matches, "bucket", config.bucket.clone())
        .filter(|b| !b.is_empty())
        .context("no bucket configured, use --bucket, BUCKET or bucket: in config.yml")?;

    // REGION
    let region = get_region(
        arg_or(matches, "region", config.region.clone()),
        arg_or(matches, "endpoint", config.endpoint.clone()),
    )?;

    log::info!("bucket: {bucket}, region: {region}");

    // PUBLIC URL
    let public_url = match arg_or(matches, "public-url", config.public_url.clone()) {
        Some(url) => url,
        None => public_url(&region, &bucket)?,
    };

    // FORMAT
    let format = match matches.get_one::<String>("format") {
        Some(format) => format.parse::<OutputFormat>().map_err(|e| anyhow!(e))?,
        None => config.format.unwrap_or_default(),
    };

    let quality = matches
        .get_one::<u8>("quality")
        .copied()
        .or(config.quality)
        .unwrap_or(crate::config::DEFAULT_QUALITY);

    let max_dimension = matches
        .get_one::<u32>("max-dimension")
        .copied()
        .or(config.max_dimension)
        .unwrap_or(crate::config::DEFAULT_MAX_DIMENSION);

    let mut part_size = matches
        .get_one::<usize>("part-size")
        .copied()
        .or(config.part_size)
        .unwrap_or(MIN_PART_SIZE);

    if part_size < MIN_PART_SIZE {
        log::warn!("part size {part_size} below the S3 minimum, using {MIN_PART_SIZE}");
        part_size = MIN_PART_SIZE;
    }

    // AUTH
    let access_key = arg_or(matches, "access-key", config.access_key.clone()).unwrap_or_default();
    let secret_key = arg_or(matches, "secret-key", config.secret_key).unwrap_or_default();
    let credentials = Credentials::new(&access_key, &SecretString::new(secret_key.into()));

    let settings = Settings::new(&bucket, &public_url)
        .with_format(format)
        .with_quality(quality)
        .with_max_dimension(max_dimension);

    log::debug!("settings: {settings:#?}, part size: {part_size}");

    let s3 = S3::new(&credentials, &region, Some(bucket))?;
    let store = S3Store::new(s3).with_part_size(part_size);

    Ok(Invocation {
        key,
        handler: ResizeRequestHandler::new(settings, Arc::new(store)),
    })
}

/// The default config file is optional, an explicit one must exist
fn load_config(matches: &ArgMatches) -> Result<Config> {
    let Some(config_file) = matches.get_one::<PathBuf>("config") else {
        return Ok(Config::default());
    };

    let explicit = matches.value_source("config") != Some(ValueSource::DefaultValue);

    if explicit || config_file.is_file() {
        log::info!("config file: {}", config_file.display());
        Config::new(config_file)
    } else {
        Ok(Config::default())
    }
}

fn arg_or(matches: &ArgMatches, id: &str, fallback: Option<String>) -> Option<String> {
    matches.get_one::<String>(id).cloned().or(fallback)
}

/// A custom endpoint wins over the AWS region list
fn get_region(region: Option<String>, endpoint: Option<String>) -> Result<Region> {
    if let Some(endpoint) = endpoint {
        return Ok(Region::Custom {
            name: region.unwrap_or_default(),
            endpoint,
        });
    }

    let region = region
        .or_else(|| env::var("AWS_REGION").ok())
        .or_else(|| env::var("AWS_DEFAULT_REGION").ok());

    match region {
        Some(r) => Ok(r.parse::<Region>()?),
        None => Ok(Region::default()),
    }
}

/// Bucket website for AWS, `<endpoint>/<bucket>` otherwise
fn public_url(region: &Region, bucket: &str) -> Result<String> {
    if let Some(url) = region.website_url(bucket) {
        return Ok(url);
    }

    let endpoint = region.url()?;
    Ok(format!(
        "{}/{bucket}",
        endpoint.as_str().trim_end_matches('/')
    ))
}
