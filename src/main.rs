use aiscope_lib::services::config_store::{ConfigStore, Settings};
use aiscope_lib::{ContentType, DetectPayload, Detector, MediaFile};
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tracing::info;

const USAGE: &str = "Usage:
  aiscope <text|image|video|audio|web> <input> [--demo] [--file] [--pretty]
  aiscope config set-key <sapling|sightengine_user|sightengine_secret> <value>
  aiscope config delete-key <sapling|sightengine_user|sightengine_secret>
  aiscope config set-url <sapling|sightengine> <url>

Notes:
  - For text, <input> is the text itself, or a path when --file is given.
  - For image, video and audio, <input> is a file path. For web, a URL.
  - --demo returns synthetic results without calling any provider.
  - Credentials may also come from SAPLING_API_KEY, SIGHTENGINE_API_USER and SIGHTENGINE_API_SECRET.";

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .skip(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect()
}

fn config_store() -> Result<ConfigStore> {
    let dir = ConfigStore::default_config_dir()
        .ok_or_else(|| anyhow!("could not determine the user config directory"))?;
    Ok(ConfigStore::new(dir))
}

fn run_config(params: &[&str]) -> Result<()> {
    let store = config_store()?;
    match params {
        ["set-key", name, value] => store.set_api_key(name, value)?,
        ["delete-key", name] => {
            if !store.delete_api_key(name)? {
                println!("No stored value for {}", name);
                return Ok(());
            }
        }
        ["set-url", provider, url] => store.set_provider_url(provider, url)?,
        _ => bail!("{}", USAGE),
    }
    println!("Updated {}", store.config_file().display());
    Ok(())
}

async fn build_payload(content_type: ContentType, input: &str, from_file: bool) -> Result<DetectPayload> {
    let payload = match content_type {
        ContentType::Text if from_file => DetectPayload::Text(
            tokio::fs::read_to_string(input)
                .await
                .with_context(|| format!("read text file failed: {}", input))?,
        ),
        ContentType::Text => DetectPayload::Text(input.to_string()),
        ContentType::Web => DetectPayload::Url(input.to_string()),
        ContentType::Image | ContentType::Video | ContentType::Audio => DetectPayload::File(
            MediaFile::from_path(Path::new(input))
                .await
                .with_context(|| format!("read media file failed: {}", input))?,
        ),
    };
    Ok(payload)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let params = positional(&args);

    let Some((&command, rest)) = params.split_first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    if command == "config" {
        return run_config(rest);
    }

    let content_type: ContentType = command.parse()?;
    let Some(&input) = rest.first() else {
        bail!("missing <input>\n\n{}", USAGE);
    };

    aiscope_lib::init_logging();

    let settings = Settings::load_default()?;
    let detector = Detector::from_settings(&settings)
        .with_demo_mode(settings.demo_mode || has_flag(&args, "--demo"));
    info!(content_type = %content_type, demo = detector.demo_mode(), "cli.detect");

    let payload = build_payload(content_type, input, has_flag(&args, "--file")).await?;
    let result = detector.detect(content_type, payload).await?;

    let json = if has_flag(&args, "--pretty") {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    detector.flush_feedback().await;
    Ok(())
}
