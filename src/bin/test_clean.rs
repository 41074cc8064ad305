/// Debug binary for text cleaning: dumps the dilated removal mask next to the cleaned page
///
/// Usage: cargo run --release --bin test_clean -- input.png [--output dir]

use anyhow::{Context, Result};
use std::path::Path;

use comic_workflow::core::{Cleaning, Config};
use comic_workflow::orchestration::PageOrchestrator;
use comic_workflow::services::cleaning::lit_pixels;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image.png> [--output dir]", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let mut output_dir = ".".to_string();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" if i + 1 < args.len() => {
                output_dir = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }

    std::fs::create_dir_all(&output_dir)?;

    println!("Loading: {}", input_path);
    let img = image::open(input_path).context("Failed to load image")?;
    println!("Image size: {}x{}", img.width(), img.height());

    let config = Config::new().context("Failed to load config")?;
    let orchestrator = PageOrchestrator::from_config(&config);
    println!("OCR backend: {}", orchestrator.detector().backend_name());

    println!("Detecting text...");
    let detection = orchestrator.detector().detect(&img).await?;
    for (i, block) in detection.blocks.iter().enumerate() {
        println!(
            "  [{}] {:?} conf={:.1} at ({}, {}) {}x{}",
            i, block.text, block.confidence, block.bbox.x, block.bbox.y, block.bbox.w, block.bbox.h
        );
    }

    let input_stem = Path::new(input_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let mask = orchestrator
        .remover()
        .removal_mask(img.width(), img.height(), &detection.blocks)?;
    let mask_path = format!("{}/{}_mask.png", output_dir, input_stem);
    mask.save(&mask_path)?;
    println!("Saved mask: {}", mask_path);

    match orchestrator.remover().remove_text(&img, &detection.blocks).await? {
        Cleaning::NoText => println!("{}", Cleaning::NO_TEXT_WARNING),
        Cleaning::Cleaned { image, blocks_removed } => {
            let cleaned_path = format!("{}/{}_cleaned.png", output_dir, input_stem);
            image.save(&cleaned_path)?;
            println!("Saved cleaned: {} ({} blocks removed)", cleaned_path, blocks_removed);
        }
    }

    // Stats
    let lit = lit_pixels(&mask);
    let total = (mask.width() * mask.height()).max(1) as usize;
    println!("\nStats:");
    println!("  Mask coverage: {:.1}%", lit as f64 / total as f64 * 100.0);
    println!("  Mask pixels: {} / {}", lit, total);

    Ok(())
}
