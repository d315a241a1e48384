use clap::{Arg, Command};
use hooked::config::HookedConfig;
use hooked::content::ContentRecord;
use hooked::highlight::HighlightPattern;
use hooked::orchestrator::{
    CallerId, ContentNotification, LocalContentTarget, ScanEvent, ScanOrchestrator,
    StaticContentHost,
};
use hooked::preferences::{load_in_background, FilePreferenceStore, PreferenceStore};
use hooked::presentation::render;
use hooked::remote::{AnalyzeClient, AssessmentService, RemoteScorer};
use hooked::watcher::MailWatcher;
use hooked::ContentScanner;
use log::LevelFilter;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let matches = Command::new("hooked")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing risk scanner for emails and web pages")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("hooked.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and print a summary")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("serve")
                .long("serve")
                .help("Run the /analyze backend")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scan")
                .long("scan")
                .value_name("FILE")
                .help("Scan a JSON content record through the full pipeline")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("local")
                .long("local")
                .help("Assess in-process instead of calling the configured backend")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("watch")
                .long("watch")
                .help("Read mail-client URLs from stdin and report opened messages")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("hooked.yaml");
    let config = match HookedConfig::load(config_path).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        print_config_summary(&config);
        return;
    }

    if matches.get_flag("serve") {
        if let Err(e) = hooked::server::run(&config).await {
            eprintln!("Backend failed: {e:#}");
            process::exit(1);
        }
        return;
    }

    if let Some(file) = matches.get_one::<String>("scan") {
        if let Err(e) = scan_file(&config, file, matches.get_flag("local")).await {
            eprintln!("Scan failed: {e:#}");
            process::exit(1);
        }
        return;
    }

    if matches.get_flag("watch") {
        if let Err(e) = watch_stdin(&config).await {
            eprintln!("Watcher failed: {e:#}");
            process::exit(1);
        }
        return;
    }

    eprintln!("Nothing to do. Try --serve, --scan FILE or --help.");
    process::exit(2);
}

fn generate_default_config(path: &str) {
    match HookedConfig::default().to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("API keys are read from the environment, not this file.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}

fn print_config_summary(config: &HookedConfig) {
    let scanner = &config.scanner;
    println!("Configuration is valid.");
    println!();
    println!("Scanner:");
    println!("  Urgency keywords: {}", scanner.urgency_keywords.len());
    println!("  Financial keywords: {}", scanner.financial_keywords.len());
    println!("  Known brands: {}", scanner.known_brands.len());
    println!("  Major domains: {}", scanner.major_domains.len());
    println!(
        "  Thresholds: suspicious >= {}, phishing >= {}",
        scanner.thresholds.suspicious, scanner.thresholds.phishing
    );
    println!("Remote:");
    println!("  Mode: {:?}", config.remote.mode);
    println!("  Model: {}", config.remote.model);
    println!("  Backend: {}", config.remote.endpoint);
    println!("  Timeout: {}s", config.remote.timeout_seconds);
    println!(
        "Speech: {}",
        if config.speech.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "Server: {}:{}",
        config.server.bind_address, config.server.port
    );
}

fn remote_scorer(config: &HookedConfig, local: bool) -> anyhow::Result<Arc<dyn RemoteScorer>> {
    if local {
        Ok(Arc::new(AssessmentService::from_config(config)?))
    } else {
        Ok(Arc::new(AnalyzeClient::new(
            &config.remote.endpoint,
            config.remote.timeout_seconds,
        )?))
    }
}

async fn scan_file(config: &HookedConfig, file: &str, local: bool) -> anyhow::Result<()> {
    use anyhow::Context;

    let json = std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?;
    let record: ContentRecord =
        serde_json::from_str(&json).with_context(|| format!("Invalid content record in {file}"))?;

    let scanner = Arc::new(ContentScanner::from_config(&config.scanner));
    let (target, mut notifications) = LocalContentTarget::new(record.clone(), scanner);
    let host = Arc::new(StaticContentHost::new());
    let caller = CallerId::new("cli");
    host.register(caller.clone(), Arc::new(target));

    let orchestrator = ScanOrchestrator::spawn(
        host,
        remote_scorer(config, local)?,
        Arc::new(FilePreferenceStore::new(&config.preferences_path)),
    );
    let response = orchestrator.scan(caller).await?;
    print!("{}", render(&response));

    print_highlights(&record, &mut notifications).await;
    Ok(())
}

/// Show the text with fishy phrases marked, if a highlight push arrives.
async fn print_highlights(
    record: &ContentRecord,
    notifications: &mut mpsc::UnboundedReceiver<ContentNotification>,
) {
    while let Ok(Some(notification)) =
        tokio::time::timeout(Duration::from_millis(250), notifications.recv()).await
    {
        if let ContentNotification::Highlight { phrases } = notification {
            if let Some(pattern) = HighlightPattern::new(&phrases) {
                println!();
                println!("Highlighted:");
                println!("{}", pattern.mark(record.main_text(), "[[", "]]"));
            }
        }
    }
}

async fn watch_stdin(config: &HookedConfig) -> anyhow::Result<()> {
    let preferences: Arc<dyn PreferenceStore> =
        Arc::new(FilePreferenceStore::new(&config.preferences_path));
    log::info!(
        "Auto-popup is {}",
        if load_in_background(Arc::clone(&preferences)).await.auto_popup_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let orchestrator = ScanOrchestrator::spawn(
        Arc::new(StaticContentHost::new()),
        remote_scorer(config, false)?,
        preferences,
    );
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ScanEvent::AutoPopup { url, .. } = event {
                println!("Opened message, showing scanner: {url}");
            }
        }
    });

    let caller = CallerId::new("mail");
    let mut watcher = MailWatcher::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(opened) = watcher.observe(line.trim()) {
            orchestrator.email_opened(caller.clone(), opened)?;
        }
    }
    // Let the last events drain
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
