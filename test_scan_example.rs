#![allow(clippy::uninlined_format_args)]

use hooked::features::link_analyzer::LinkAnalyzer;
use hooked::orchestrator::{CallerId, LocalContentTarget, ScanOrchestrator, StaticContentHost};
use hooked::preferences::MemoryPreferenceStore;
use hooked::presentation::render;
use hooked::remote::{AssessmentService, SampleModel};
use hooked::{ContentRecord, ContentScanner};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Scanning a canned PayPal lookalike phish...");

    let html = r#"
<p>Dear customer,</p>
<p>Unauthorized access was detected on your account. Your account has been
suspended. Verify your account and confirm your password immediately or it
will be closed.</p>
<p><a href="http://paypa1-secure.example/login">www.paypal.com</a></p>
<p><a href="http://paypa1-secure.example/help">Click here</a> for help.</p>
"#;

    let links = LinkAnalyzer::new().extract_links(html);
    println!("Links found: {}", links.len());
    for link in &links {
        println!("  {} -> {}", link.display_text, link.destination_url);
    }

    let record = ContentRecord::email(
        "service@paypa1.com",
        "Urgent: account suspended - act now",
        html,
        links,
    )?;

    let scanner = Arc::new(ContentScanner::default());
    let local = scanner.scan(&record);
    println!();
    println!("Signals:");
    println!("  Urgency: {:?}", local.signals.urgency_hits.phrases);
    println!("  Financial: {:?}", local.signals.financial_hits.phrases);
    println!("  Link mismatches: {}", local.signals.link_mismatches);
    println!("  Brand impersonation: {}", local.signals.brand_flagged());
    println!();

    let (target, _notifications) = LocalContentTarget::new(record, scanner);
    let host = Arc::new(StaticContentHost::new());
    let caller = CallerId::new("example");
    host.register(caller.clone(), Arc::new(target));

    let remote = AssessmentService::new(
        Some(Arc::new(SampleModel::with_delay(Duration::from_millis(50)))),
        None,
        2000,
    );
    let orchestrator = ScanOrchestrator::spawn(
        host,
        Arc::new(remote),
        Arc::new(MemoryPreferenceStore::default()),
    );

    let response = orchestrator.scan(caller).await?;
    print!("{}", render(&response));

    Ok(())
}
