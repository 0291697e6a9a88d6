use anyhow::Result;
use s3resize::cli;
use std::process::exit;

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = cli::start()?;

    let response = invocation.handler.handle(&invocation.key).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_redirect() {
        exit(1);
    }

    Ok(())
}
