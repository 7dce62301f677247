//! geo-complete: 通过弹性客户端发送一次提问并打印结果
//!
//! Usage:
//!   geo-complete [--search] [--json] [--system <text>] <prompt...>
//!   geo-complete store-key <key>

use anyhow::{bail, Context};
use geo_resilient_client::credentials::{resolve_api_key, store_api_key, API_KEY_ENV};
use geo_resilient_client::{RequestPayload, ResilientClientBuilder};
use tracing_subscriber::EnvFilter;

struct Args {
    search: bool,
    json: bool,
    system: Option<String>,
    prompt: String,
}

fn print_usage() {
    println!(
        r#"geo-complete: resilient generateContent call

USAGE:
    geo-complete [OPTIONS] <PROMPT...>
    geo-complete store-key <KEY>

OPTIONS:
    --search            Enable web-search grounding (dropped automatically if every model rejects it)
    --json              Request application/json output
    --system <TEXT>     System instruction
    -h, --help          Show this help message

ENVIRONMENT:
    GEMINI_API_KEY          API key (used when the OS keyring has none)
    GEO_BASE_URL            Backend base URL
    GEO_HTTP_TIMEOUT_SECS   Per-request timeout
    RUST_LOG                Log filter (e.g. geo_resilient_client=debug)"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut search = false;
    let mut json = false;
    let mut system = None;
    let mut words = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--search" => search = true,
            "--json" => json = true,
            "--system" => {
                i += 1;
                let text = args.get(i).context("--system needs a value")?;
                system = Some(text.clone());
            }
            other => words.push(other.to_string()),
        }
        i += 1;
    }

    if words.is_empty() {
        bail!("missing prompt");
    }

    Ok(Args {
        search,
        json,
        system,
        prompt: words.join(" "),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    match argv.first().map(|s| s.as_str()) {
        None | Some("-h") | Some("--help") | Some("help") => {
            print_usage();
            return Ok(());
        }
        Some("store-key") => {
            let key = argv.get(1).context("store-key needs a key")?;
            store_api_key(key)?;
            println!("API key stored in the OS keyring.");
            return Ok(());
        }
        _ => {}
    }

    let args = parse_args(&argv)?;
    let api_key = resolve_api_key()
        .with_context(|| format!("no API key: run `geo-complete store-key <key>` or set {API_KEY_ENV}"))?;

    let mut payload = RequestPayload::user_text(args.prompt);
    if let Some(system) = args.system {
        payload = payload.with_system_instruction(system);
    }
    if args.search {
        payload = payload.with_google_search();
    }
    if args.json {
        payload = payload.with_json_output();
    }

    let client = ResilientClientBuilder::new().build()?;
    let (resp, stats) = match client.call_with_stats(&api_key, &payload).await {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("error [{}]: {}", e.kind.code(), e);
            std::process::exit(2);
        }
    };

    println!("{}", resp.text().unwrap_or_default());
    println!();
    println!(
        "-- model: {}{} ({} backend call(s), {} ms)",
        resp.used_model,
        if resp.tools_stripped { ", grounding disabled" } else { "" },
        stats.backend_calls,
        stats.duration_ms
    );
    for source in resp.grounding_sources() {
        println!(
            "   source: {} {}",
            source.title.as_deref().unwrap_or("-"),
            source.uri.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
