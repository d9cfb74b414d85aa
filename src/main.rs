use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use sublink::models::CustomRule;
use sublink::utils::yaml::{parse_document, yaml_to_json};
use sublink::{build, BuildRequest, HttpFetcher, Lang, RuleSpec, Settings, SublinkError, Target};

/// Convert a proxy subscription into a Clash, sing-box or Surge configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Subscription file, or "-" for standard input
    #[arg(short, long, value_name = "FILE|-", default_value = "-")]
    input: String,

    /// Output dialect: clash, singbox or surge
    #[arg(short, long, default_value = "clash")]
    target: Target,

    /// Rule set: minimal, balanced, comprehensive, or a JSON array of category names
    #[arg(short, long, value_name = "SET|JSON")]
    rules: Option<String>,

    /// JSON array of custom rules
    #[arg(long, value_name = "JSON")]
    custom_rules: Option<String>,

    /// Base configuration (YAML or JSON) used instead of the built-in template
    #[arg(short, long, value_name = "FILE")]
    base: Option<String>,

    /// Add one selection group per detected country
    #[arg(long)]
    group_by_country: bool,

    /// Language of group names and diagnostics (zh-CN or en-US)
    #[arg(long)]
    lang: Option<String>,

    /// Subscription URL advertised in the Surge managed-config header
    #[arg(long, value_name = "URL")]
    subscription_url: Option<String>,

    /// Extra header for remote subscription requests, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,

    /// Settings file (YAML with a `common:` section or TOML with `[common]`)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output file; standard output when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,
}

async fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read subscription from stdin")?;
        return Ok(content);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read subscription file {}", path))
}

async fn load_base(path: &str) -> Result<serde_json::Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read base configuration {}", path))?;
    let document = parse_document(&content)?;
    Ok(yaml_to_json(&document)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from_file(path)
            .await
            .with_context(|| format!("Failed to load settings from {}", path))?,
        None => Settings::default(),
    };

    let input = read_input(&args.input).await?;
    let mut request = BuildRequest::new(input)
        .with_settings(&settings)
        .target(args.target)
        .subscription_url(args.subscription_url.clone());
    if let Some(rules) = &args.rules {
        request = request.rules(RuleSpec::from_param(rules));
    }
    if let Some(custom) = &args.custom_rules {
        let custom: Vec<CustomRule> =
            serde_json::from_str(custom).context("Invalid --custom-rules JSON")?;
        request = request.custom_rules(custom);
    }
    if let Some(path) = &args.base {
        request = request.base_config(load_base(path).await?);
    }
    if args.group_by_country {
        request = request.group_by_country(true);
    }
    if let Some(lang) = &args.lang {
        request = request.lang(Lang::from_tag(lang));
    }
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Invalid --header '{}', expected NAME:VALUE", header))?;
        request = request.fetch_header(name.trim(), value.trim());
    }

    let fetcher = HttpFetcher::new(&settings.user_agent, settings.fetch_timeout_secs)?;
    let result = build(&request, &fetcher).await;
    if let Err(SublinkError::Exhausted { diagnostics, .. }) = &result {
        for diagnostic in diagnostics {
            warn!("{}", diagnostic);
        }
    }
    let output = result?;
    for diagnostic in &output.diagnostics {
        warn!("{}", diagnostic);
    }

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &output.text)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            info!("Wrote {} configuration to {}", request.target, path);
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(output.text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
