use colored::Colorize;
use events::{Event, EventEnvelope};
use mission_core::{PlanResult, Receipt, Role, SimulationResult, StatusResult, TranscriptEntry};
use tokio::sync::broadcast;

/// Print transcript and error events until every sender is dropped.
pub async fn print_events(mut rx: broadcast::Receiver<EventEnvelope>) {
    loop {
        match rx.recv().await {
            Ok(envelope) => print_event(&envelope.event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event printer lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::TranscriptAppended { entry, .. } | Event::TranscriptReplaced { entry, .. } => {
            print_entry(entry)
        }
        Event::StageChanged { from, to, .. } => {
            tracing::debug!("stage {} -> {}", from, to);
        }
        Event::ReceiptStored { .. } | Event::MissionError { .. } => {}
    }
}

fn print_entry(entry: &TranscriptEntry) {
    match entry {
        // The user already sees what they typed.
        TranscriptEntry::Text {
            role: Role::User, ..
        } => {}
        TranscriptEntry::Text {
            role: Role::Assistant,
            content,
        } => println!("{} {}", "›".cyan(), content),
        TranscriptEntry::Plan { plan } => print_plan(plan),
        TranscriptEntry::Simulation { simulation } => print_simulation(simulation),
        TranscriptEntry::Status { status } => print_status(status),
    }
}

fn print_plan(plan: &PlanResult) {
    println!();
    println!("{}", "Plan".bold());
    if !plan.preview.is_empty() {
        println!("  {}", plan.preview);
    }
    for warning in &plan.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    if !plan.missing_fields.is_empty() {
        println!("  missing: {}", plan.missing_fields.join(", ").yellow());
    }
}

fn print_simulation(simulation: &SimulationResult) {
    println!();
    println!("{}", "Simulation".bold());
    let figures = [
        ("budget", &simulation.budget),
        ("fees", &simulation.fees),
        ("burn", &simulation.burn),
    ];
    for (label, value) in figures {
        if let Some(value) = value {
            println!("  {:<8}{}", label, value);
        }
    }
    for risk in &simulation.risks {
        println!("  {} {}", "risk".yellow(), risk);
    }
    for blocker in &simulation.blockers {
        println!("  {} {}", "blocked".red(), blocker);
    }
    for confirmation in &simulation.confirmations {
        println!("  {} {}", "✓".green(), confirmation);
    }
}

fn print_status(status: &StatusResult) {
    let state = status.state.as_str();
    let state = match status.state {
        mission_core::RunState::Succeeded => state.green(),
        mission_core::RunState::Failed => state.red(),
        _ => state.yellow(),
    };
    match &status.current_step {
        Some(step) => println!("  [{}] {}", state, step),
        None => println!("  [{}]", state),
    }
    if let Some(line) = status.logs.last() {
        println!("    {}", line.dimmed());
    }
}

pub fn print_receipt(receipt: &Receipt) {
    println!(
        "{} {}  {}",
        "●".green(),
        receipt.id.bold(),
        receipt.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(job_id) = &receipt.job_id {
        println!("    job      {}", job_id);
    }
    if let Some(reward) = &receipt.reward {
        let token = receipt.reward_token.as_deref().unwrap_or("");
        println!("    reward   {} {}", reward, token);
    }
    if let Some(payout) = &receipt.net_payout {
        println!("    payout   {}", payout);
    }
    match (&receipt.explorer_url, &receipt.tx_hash) {
        (Some(url), _) => println!("    tx       {}", url),
        (None, Some(hash)) => println!("    tx       {}", hash),
        (None, None) => {}
    }
    let artifacts = if receipt.cid_urls.is_empty() {
        &receipt.cids
    } else {
        &receipt.cid_urls
    };
    for artifact in artifacts {
        println!("    artifact {}", artifact);
    }
}
