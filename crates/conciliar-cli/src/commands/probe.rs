//! Probe commands - exercise the extractors on ad-hoc inputs.

use std::path::PathBuf;

use clap::Args;
use console::style;

use conciliar_core::{CorreosPdfProcessor, FacturaExtractor, PlacaExtractor};

/// Arguments for the placa probe.
#[derive(Args)]
pub struct PlacaArgs {
    /// Free-text field content to scan
    text: String,
}

pub async fn placa(args: PlacaArgs) -> anyhow::Result<()> {
    match PlacaExtractor::new().process(&args.text) {
        Some(result) => println!("{} {result}", style("✓").green()),
        None => println!(
            "{} no plate code found; detail lines would be used",
            style("✗").red()
        ),
    }

    Ok(())
}

/// Arguments for the pdf probe.
#[derive(Args)]
pub struct PdfArgs {
    /// Correos invoice PDF to analyze
    input: PathBuf,
}

pub async fn pdf(args: PdfArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let processor = CorreosPdfProcessor::new();
    let pdf_text = processor
        .extract_pdf_text(&args.input)
        .map_err(|e| anyhow::anyhow!("text extraction failed: {e}"))?;

    println!(
        "{} {} chars from {} pages ({} empty)",
        style("ℹ").blue(),
        pdf_text.text.len(),
        pdf_text.pages_total,
        pdf_text.pages_empty
    );

    let extractor = FacturaExtractor::new();
    match extractor.extract(&pdf_text.text) {
        Ok(extraction) => {
            println!("Invoice number: {}", extraction.invoice_number);
            println!("Guide codes:");
            for (i, code) in extraction.guide_codes.iter().enumerate() {
                println!("  {}. {code}", i + 1);
            }
            println!();
            println!("{} {}", style("✓").green(), extraction.formatted());
        }
        Err(e) => anyhow::bail!("extraction failed: {e}"),
    }

    Ok(())
}
