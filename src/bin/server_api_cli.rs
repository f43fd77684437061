//! server-api CLI: query and drive a local interception server.
//!
//! Usage:
//!   server-api-cli version                          Server version
//!   server-api-cli config <port>                    Server config for a proxy port
//!   server-api-cli activate <id> <port> [options]   Activate an interceptor

use anyhow::{anyhow, bail, Context};
use server_api::{ExecutionContext, ServerApi, ServerApiConfig};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => print_usage(),
        "--version" | "-V" => println!("server-api-cli {}", env!("CARGO_PKG_VERSION")),
        command => {
            if let Err(e) = run(command, &args[2..]).await {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"server-api-cli — interception server client

USAGE:
    server-api-cli <COMMAND> [ARGS]

COMMANDS:
    version                         Show the server version
    config <port>                   Show server config for a proxy port
    interfaces                      List the server host's network interfaces
    interceptors <port>             List interceptors and their state
    metadata <id>                   Show detailed metadata for an interceptor
    activate <id> <port> [json]     Activate an interceptor, with optional JSON options
    update                          Ask the server to update itself
    protocol                        Show which API protocol the server speaks
    help                            Show this help message

ENVIRONMENT:
    SERVER_API_ORIGIN               Server origin (default http://127.0.0.1:45457)
    SERVER_API_LOCATION             Location URL carrying an authToken query parameter
    SERVER_API_TOKEN                Auth token, if no location is given
    SERVER_API_CONTEXT              foreground (default) or worker; a worker reads the
                                    shared token from the OS keychain first
    SERVER_API_KEYRING_SERVICE      Keychain service name for worker mode (default server-api)
    RUST_LOG                        Log filter (default info)"#
    );
}

fn execution_context(config: &ServerApiConfig) -> anyhow::Result<ExecutionContext> {
    let mut location = match std::env::var("SERVER_API_LOCATION") {
        Ok(raw) => Url::parse(&raw).context("SERVER_API_LOCATION is not a valid URL")?,
        Err(_) => Url::parse("http://localhost/")?,
    };
    if let Ok(token) = std::env::var("SERVER_API_TOKEN") {
        location
            .query_pairs_mut()
            .append_pair(server_api::auth::AUTH_TOKEN_QUERY_PARAM, &token);
    }
    match std::env::var("SERVER_API_CONTEXT").as_deref() {
        Ok("worker") => Ok(ExecutionContext::keyring_worker(location, config)),
        Ok("foreground") | Err(_) => Ok(ExecutionContext::foreground(location)),
        Ok(other) => bail!("SERVER_API_CONTEXT must be 'foreground' or 'worker', got '{other}'"),
    }
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument <{name}>"))
}

fn port(args: &[String], index: usize) -> anyhow::Result<u16> {
    let raw = arg(args, index, "port")?;
    raw.parse()
        .with_context(|| format!("invalid port: {raw}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: &str, args: &[String]) -> anyhow::Result<()> {
    let config = ServerApiConfig::from_env();
    let api = ServerApi::builder(execution_context(&config)?)
        .config(config)
        .build()?;
    // The CLI does not launch the server, so it is assumed to be up already.
    api.announce_server_ready();

    match command {
        "version" => println!("{}", api.get_server_version().await?),
        "config" => print_json(&api.get_config(port(args, 0)?).await?)?,
        "interfaces" => print_json(&api.get_network_interfaces().await?)?,
        "interceptors" => {
            for interceptor in api.get_interceptors(port(args, 0)?).await? {
                println!(
                    "{:<24} {:<10} activable={:<5} active={}",
                    interceptor.id,
                    interceptor.version,
                    interceptor.is_activable,
                    interceptor.is_active
                );
            }
        }
        "metadata" => match api
            .get_detailed_interceptor_metadata(arg(args, 0, "id")?)
            .await?
        {
            Some(metadata) => print_json(&metadata)?,
            None => println!("(no detailed metadata)"),
        },
        "activate" => {
            let id = arg(args, 0, "id")?;
            let proxy_port = port(args, 1)?;
            let options = match args.get(2) {
                Some(raw) => Some(serde_json::from_str(raw).context("options must be JSON")?),
                None => None,
            };
            match api.activate_interceptor(id, proxy_port, options).await {
                Ok(metadata) => print_json(&metadata)?,
                Err(e) => match e.as_activation() {
                    Some(failure) => {
                        eprintln!("{} [{}]", failure.message, failure.id);
                        print_json(&failure.fields)?;
                        std::process::exit(2);
                    }
                    None => return Err(e.into()),
                },
            }
        }
        "update" => {
            api.trigger_server_update().await;
            println!("Update requested");
        }
        "protocol" => println!("{}", api.initialize().await?),
        other => bail!("unknown command: {other} (see `server-api-cli help`)"),
    }

    Ok(())
}
