//! Terminal capture-and-analyze flow: drive a camera session to a confirmed
//! still, submit it, and render the interpreted summary.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::analysis::{self, HealthRating};
use crate::models::{ImageBlob, ParsedSummary};
use crate::services::{AnalyzeClient, GeminiClient, SettingsStore, VisionService};

/// Capture a photo from the camera, analyze it and print the summary.
pub async fn run() -> Result<()> {
    let settings = SettingsStore::load_default()?;
    let vision = pick_vision_service(&settings).await?;

    let image = capture_image()?;
    log::info!("🖼️ Confirmed capture {} ({} bytes)", image.filename(), image.len());

    analyze_and_render(vision, &image).await
}

/// Analyze an existing image file (the upload path) and print the summary.
pub async fn run_file(path: &str) -> Result<()> {
    let settings = SettingsStore::load_default()?;
    let vision = pick_vision_service(&settings).await?;

    let image = ImageBlob::from_path(path)
        .with_context(|| format!("Failed to read image file: {}", path))?;

    analyze_and_render(vision, &image).await
}

async fn analyze_and_render(vision: Arc<dyn VisionService>, image: &ImageBlob) -> Result<()> {
    println!("\n⏳ Analyzing {} ...", image.filename());

    let analysis_text = vision.analyze_food_image(image).await?;
    let summary = analysis::parse(&analysis_text);
    let rating = analysis::rate_items(&summary.food_items);

    println!("{}", format_summary(&summary, &rating));
    Ok(())
}

/// Remote when an analysis server URL is configured, direct Gemini otherwise.
async fn pick_vision_service(settings: &SettingsStore) -> Result<Arc<dyn VisionService>> {
    if let Some(url) = std::env::var("CALORIES_ADVISOR_URL")
        .ok()
        .filter(|u| !u.is_empty())
    {
        log::info!("🌐 Using analysis server at {}", url);
        let client =
            AnalyzeClient::new(url).with_credentials(settings.api_key(), Some(settings.model()));
        // Fail before opening the camera, not after.
        client.check_health().await?;
        Ok(Arc::new(client))
    } else {
        let api_key = settings.api_key().context(
            "No API key configured. Run `calories-advisor settings set-key <KEY>` \
             or set GEMINI_API_KEY.",
        )?;
        Ok(Arc::new(GeminiClient::new(api_key, settings.model())))
    }
}

#[cfg(feature = "camera")]
fn capture_image() -> Result<ImageBlob> {
    use crate::capture::backend::NokhwaBackend;
    use crate::capture::CaptureController;

    let mut session = CaptureController::new(Box::new(NokhwaBackend::new()));

    for device in session.list_devices() {
        log::debug!("📷 Device {}: {}", device.index, device.label);
    }

    while let Err(e) = session.open() {
        eprintln!("❌ {}", e.user_message());
        if prompt("Try again? [y/N]: ")? != "y" {
            anyhow::bail!("{}", e.user_message());
        }
    }
    log::debug!(
        "Capture session {:?} (stream active: {})",
        session.state(),
        session.stream_active()
    );

    loop {
        let choice = if session.can_switch() {
            prompt("📷 Camera live. [c]apture / [s]witch camera / [q]uit: ")?
        } else {
            prompt("📷 Camera live. [c]apture / [q]uit: ")?
        };

        match choice.as_str() {
            "c" => {
                session.capture()?;
                if let Some(still) = session.still() {
                    println!("✅ Captured {}x{}", still.width, still.height);
                }

                match prompt("[u]se this image / [r]etake / [q]uit: ")?.as_str() {
                    "u" => {
                        let blob = session.confirm()?;
                        return Ok(blob);
                    }
                    "r" => {
                        if let Err(e) = session.retake() {
                            eprintln!("❌ {}", e.user_message());
                            session.close();
                            anyhow::bail!("{}", e.user_message());
                        }
                    }
                    _ => {
                        session.close();
                        anyhow::bail!("Capture cancelled");
                    }
                }
            }
            "s" => {
                if let Err(e) = session.switch_camera() {
                    eprintln!("❌ {}", e.user_message());
                }
            }
            "q" => {
                session.close();
                anyhow::bail!("Capture cancelled");
            }
            _ => {}
        }
    }
}

#[cfg(not(feature = "camera"))]
fn capture_image() -> Result<ImageBlob> {
    anyhow::bail!("This build has no camera support; rebuild with the `camera` feature enabled")
}

#[cfg(feature = "camera")]
fn prompt(text: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", text);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_lowercase())
}

/// Render a parsed summary for the terminal.
fn format_summary(summary: &ParsedSummary, rating: &HealthRating) -> String {
    let mut out = String::from("\n📊 *Analysis Complete*\n\n");

    out.push_str(&format!("🍽️ Food Items: {}\n", summary.food_items.len()));
    for (i, item) in summary.food_items.iter().enumerate() {
        out.push_str(&format!("   {}. {} • {} cal\n", i + 1, item.name, item.calories));
    }

    let total = if summary.total_calories.is_empty() {
        "N/A"
    } else {
        summary.total_calories.as_str()
    };
    out.push_str(&format!("\n🔥 Total Calories: {}\n", total));

    out.push_str(&format!("{} {}", rating.stars(), rating.label));
    if let Some(note) = rating.note {
        out.push_str(&format!(" ({})", note));
    }
    out.push('\n');

    if !summary.health_note.is_empty() {
        out.push_str(&format!("\n❤️ {}\n", summary.health_note));
    }
    if !summary.macronutrients.is_empty() {
        out.push_str(&format!("🥗 {}\n", summary.macronutrients));
    }
    if !summary.recommendation.is_empty() {
        out.push_str(&format!("💡 {}\n", summary.recommendation));
    }

    out.push_str(&format!("\n--- Full analysis ---\n{}\n", summary.raw_analysis));
    out
}
