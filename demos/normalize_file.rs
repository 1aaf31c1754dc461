use anyhow::{Context, Result};
use dotenv::dotenv;
use sales_normalizer::{
    export_to_dir, sorted_by_date, ChartTheme, HttpSalesClient, NormalizationOrchestrator,
    ServiceConfig, Severity, UploadCoordinator, UploadFile, WorkflowEvent, WorkflowPhase,
    WorkflowState,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn print_notifications(state: &mut WorkflowState) {
    for note in state.take_notifications() {
        let marker = match note.severity {
            Severity::Success => "✅",
            Severity::Error => "❌",
        };
        println!("   {} {}: {}", marker, note.summary, note.detail);
    }
}

fn ask_confirmation() -> io::Result<bool> {
    print!("   Normalize all amounts to USD? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: normalize_file <ventas.csv> [output-dir]")?;
    let out_dir = std::env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = ServiceConfig::from_env().context("Invalid SALES_* configuration")?;
    println!("🚀 Sales normalization against {}", config.base_url);

    let client = HttpSalesClient::new(config.clone())?;
    let (tx, mut rx) = tokio::sync::mpsc::channel::<WorkflowEvent>(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("   ⏳ {:?}", event);
        }
    });

    let uploader = UploadCoordinator::new(client.clone()).with_progress(tx.clone());
    let orchestrator = NormalizationOrchestrator::new(client.clone(), client).with_progress(tx);

    let file = UploadFile::from_path(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut state = WorkflowState::new();
    uploader.upload(&mut state, &file).await?;
    print_notifications(&mut state);

    match state.phase {
        WorkflowPhase::Idle => {
            println!("⚠️  Upload failed, see the log for details.");
            return Ok(());
        }
        WorkflowPhase::Rejected => return Ok(()),
        WorkflowPhase::AwaitingCurrencyConfirmation => {
            println!("💱 The file mixes currencies.");
            let accepted = ask_confirmation()?;
            uploader.resolve_confirmation(&mut state, accepted)?;
            if state.pending_confirmation {
                println!("   Leaving the upload unnormalized.");
                return Ok(());
            }
        }
        _ => {}
    }

    orchestrator.run(&mut state).await?;
    print_notifications(&mut state);

    let charts = state.charts(&ChartTheme::default());
    println!("\n📊 Totals by country");
    for (country, total) in charts
        .bar
        .data
        .labels
        .iter()
        .zip(&charts.bar.data.datasets[0].data)
    {
        println!("   {:<12} {:>14.2}", country, total);
    }

    println!("\n📈 Daily normalized amounts");
    for record in sorted_by_date(state.normalized_records()) {
        println!("   {:<12} {:>14.2}", record.sale.date, record.normalized_amount);
    }

    if !state.normalized_records().is_empty() {
        let written = export_to_dir(&mut state, &out_dir)
            .with_context(|| format!("Failed to export into {}", out_dir.display()))?;
        print_notifications(&mut state);
        println!("\n💾 {}", written.display());
    }

    drop(uploader);
    drop(orchestrator);
    printer.await?;
    Ok(())
}
