mod analysis;
mod capture;
mod models;
mod prompts;
mod server;
mod services;
mod snap;

use anyhow::Result;
use dotenv::dotenv;
use std::env;

use services::{GeminiClient, SettingsStore, DEFAULT_MODEL, MODEL_CATALOG};
use services::settings::{API_KEY_SETTING, MODEL_SETTING};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve().await,
        Some("snap") => snap::run().await,
        Some("analyze") => match args.get(2) {
            Some(path) => snap::run_file(path).await,
            None => {
                eprintln!("Usage: calories-advisor analyze <image-path>");
                Ok(())
            }
        },
        Some("settings") => settings_command(&args[2..]).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

#[cfg(feature = "api-server")]
async fn serve() -> Result<()> {
    use std::sync::Arc;

    log::info!("🚀 Starting Calories Advisor API...");

    let fallback_api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
    if fallback_api_key.is_none() {
        log::warn!("⚠️ GEMINI_API_KEY not set; requests must carry their own api_key field");
    }

    let state = Arc::new(server::http::AppState {
        http: reqwest::Client::new(),
        fallback_api_key,
    });
    let app = server::http::create_router(state);

    let addr = "0.0.0.0:8000";
    log::info!("🌐 Analysis server starting on {}", addr);

    println!("\n🍽️ Calories Advisor API running on http://localhost:8000");
    println!("   POST /analyze-calories - multipart food image analysis");
    println!("   GET  /health           - liveness check");
    println!("\n🛑 Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "api-server"))]
async fn serve() -> Result<()> {
    anyhow::bail!("This build has no server support; rebuild with the `api-server` feature enabled")
}

async fn settings_command(args: &[String]) -> Result<()> {
    let mut settings = SettingsStore::load_default()?;

    match args.first().map(String::as_str) {
        None | Some("show") => {
            println!("⚙️ Settings ({})\n", settings.path().display());
            match settings.api_key() {
                Some(key) => println!("   API key: set ({})", mask_key(&key)),
                None => println!("   API key: not set"),
            }
            println!("   Model:   {}\n", settings.model());
            println!("   Available models:");
            for model in MODEL_CATALOG {
                println!("   • {} - {} ({})", model.id, model.name, model.description);
            }
        }
        Some("set-key") => {
            let key = args
                .get(1)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Usage: calories-advisor settings set-key <KEY>"))?;

            print!("🔑 Validating API key... ");
            let client = reqwest::Client::new();
            if GeminiClient::validate_key(&client, key).await? {
                println!("valid!");
                settings.set(API_KEY_SETTING, key)?;
                println!("✅ API key is valid and working! Settings saved.");
            } else {
                println!("invalid.");
                anyhow::bail!("Invalid API key. Please check and try again.");
            }
        }
        Some("set-model") => {
            let model = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("Usage: calories-advisor settings set-model <MODEL-ID>"))?;

            if MODEL_CATALOG.iter().any(|m| m.id == model.as_str()) {
                settings.set(MODEL_SETTING, model)?;
                println!("✅ Model updated to {}", model);
            } else {
                println!("❌ Unknown model: {}\n\nAvailable models:", model);
                for option in MODEL_CATALOG {
                    println!("   • {} - {}", option.id, option.name);
                }
            }
        }
        Some("clear-key") => {
            settings.remove(API_KEY_SETTING)?;
            println!("✅ API key cleared.");
        }
        Some(other) => {
            println!("❌ Unknown settings command: {}", other);
            println!("   Use: show | set-key <KEY> | set-model <MODEL-ID> | clear-key");
        }
    }

    Ok(())
}

fn mask_key(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", tail)
    }
}

fn print_usage() {
    println!("🍽️ Calories Advisor\n");
    println!("Usage: calories-advisor [COMMAND]\n");
    println!("Commands:");
    println!("   serve              Run the analysis HTTP server (default)");
    println!("   snap               Capture a food photo from the camera and analyze it");
    println!("   analyze <path>     Analyze an existing food image file");
    println!("   settings           Show or update the stored API key and model");
    println!("\nThe default model is {}.", DEFAULT_MODEL);
    println!("Set CALORIES_ADVISOR_URL to analyze through a running server instead of Gemini.");
}
