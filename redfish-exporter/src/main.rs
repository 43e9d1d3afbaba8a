use clap::{Arg, ArgMatches, Command};
use redfish_exporter_core::{
    config::parse_duration, resolve, CliOverrides, FileConfig, RedfishClient, RedfishCollector,
    ResolvedConfig,
};
use std::{path::PathBuf, process, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("redfish-exporter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Prometheus exporter for Redfish chassis power telemetry")
        .arg(
            Arg::new("config.file")
                .long("config.file")
                .value_name("PATH")
                .help("Path to YAML configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("web.listen-address")
                .long("web.listen-address")
                .value_name("ADDR")
                .help("Address to listen on for HTTP requests [default: :9102]"),
        )
        .arg(
            Arg::new("redfish.host")
                .long("redfish.host")
                .env("REDFISH_HOST")
                .value_name("URL")
                .help("Redfish host base URL, e.g. https://<ip or host>"),
        )
        .arg(
            Arg::new("redfish.username")
                .long("redfish.username")
                .env("REDFISH_USERNAME")
                .value_name("USER")
                .help("Redfish username"),
        )
        .arg(
            Arg::new("redfish.password")
                .long("redfish.password")
                .env("REDFISH_PASSWORD")
                .hide_env_values(true)
                .value_name("PASSWORD")
                .help("Redfish password"),
        )
        .arg(
            Arg::new("redfish.insecure")
                .long("redfish.insecure")
                .help("Skip TLS certificate verification")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scrape.timeout")
                .long("scrape.timeout")
                .value_name("DURATION")
                .help("Deadline for all Redfish requests of one scrape, e.g. 10s [default: 10s]")
                .value_parser(parse_duration),
        )
        .arg(
            Arg::new("redfish.chassis-id")
                .long("redfish.chassis-id")
                .env("REDFISH_CHASSIS_ID")
                .value_name("ID")
                .help("Optional chassis ID to restrict scraping; if empty, scrape all"),
        )
}

fn cli_overrides(matches: &ArgMatches) -> CliOverrides {
    CliOverrides {
        listen_address: matches.get_one::<String>("web.listen-address").cloned(),
        host: matches.get_one::<String>("redfish.host").cloned(),
        username: matches.get_one::<String>("redfish.username").cloned(),
        password: matches.get_one::<String>("redfish.password").cloned(),
        insecure_tls: matches.get_flag("redfish.insecure"),
        scrape_timeout: matches.get_one::<Duration>("scrape.timeout").copied(),
        chassis_id: matches.get_one::<String>("redfish.chassis-id").cloned(),
    }
}

fn run() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let file_config = FileConfig::discover(matches.get_one::<PathBuf>("config.file").map(PathBuf::as_path))?;
    let config = resolve(file_config.as_ref(), &cli_overrides(&matches))?;

    tracing::info!(
        host = %config.endpoint.base_url,
        insecure_tls = config.endpoint.insecure_tls,
        timeout_ms = config.collector.scrape_timeout.as_millis() as u64,
        chassis = config.collector.chassis_id.as_deref().unwrap_or("<all>"),
        "configuration resolved"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve_exporter(config))
}

async fn serve_exporter(config: ResolvedConfig) -> anyhow::Result<()> {
    let client = RedfishClient::from_config(&config.endpoint)?;
    let collector = Arc::new(RedfishCollector::new(client, config.collector));
    let app = redfish_exporter_web::router(collector);

    redfish_exporter_web::serve(config.listen_address, app, redfish_exporter_web::shutdown_signal()).await
}
