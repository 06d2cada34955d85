use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use photo_run::media::ImageData;
use photo_run::prompt::catalog::{default_enhancements, AspectRatio, FoodCategory};
use photo_run::prompt::composer::Selections;
use photo_run::services::{ImageGenerationClient, PaymentVerifier};
use photo_run::{Config, GeminiClient, PromptComposer};

#[derive(Parser, Debug)]
#[command(name = "photoctl", about = "CLI for the Photo Run service", version)]
struct Cli {
    /// Override GEMINI_BASE_URL
    #[arg(global = true, long)]
    gemini_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List categories, aspect ratios and enhancements
    Catalog,
    /// Print the prompt that would be sent for the given choices
    Prompt {
        #[command(flatten)]
        choices: Choices,
    },
    /// Ask the verification model whether a receipt shows the expected payment
    Verify {
        /// Receipt image
        #[arg(long, value_name = "PATH")]
        receipt: PathBuf,
    },
    /// Enhance a dish photo (no payment step)
    Enhance {
        /// Source photo
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        #[command(flatten)]
        choices: Choices,
        /// Output path (extension follows the returned image type when omitted)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Print the composed prompt before sending
        #[arg(short, long)]
        verbose: bool,
    },
    /// Apply a follow-up edit to a previously enhanced photo
    Refine {
        /// Previously generated image
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// What to change
        #[arg(long, value_name = "TEXT")]
        instruction: String,
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct Choices {
    /// Food category, by label ("Pizza") or slug ("hot-dish")
    #[arg(long)]
    category: FoodCategory,
    /// Aspect ratio: 1:1, 4:5, 9:16 or 16:9
    #[arg(long, default_value = "9:16")]
    ratio: AspectRatio,
    /// Enhancement ids to turn off (repeatable)
    #[arg(long = "without", value_name = "ID")]
    without: Vec<String>,
    /// Extra free-text instructions
    #[arg(long, value_name = "TEXT", default_value = "")]
    instructions: String,
}

impl Choices {
    fn compose(&self) -> Result<String, Box<dyn std::error::Error>> {
        let mut enhancements = default_enhancements();
        for id in &self.without {
            let option = enhancements
                .iter_mut()
                .find(|o| &o.id == id)
                .ok_or_else(|| format!("Unknown enhancement '{}'", id))?;
            option.selected = false;
        }
        let selections = Selections {
            category: Some(self.category),
            aspect_ratio: self.ratio,
            enhancements: &enhancements,
            instructions: &self.instructions,
        };
        Ok(PromptComposer::new().compose(&selections))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::new();
    if let Some(url) = cli.gemini_url {
        conf.gemini_base_url = url;
    }

    match cli.command {
        Commands::Catalog => {
            println!("Categories:");
            for c in FoodCategory::ALL {
                println!("  {:<10} {}", c.slug(), c.label());
            }
            println!("Aspect ratios:");
            for r in AspectRatio::ALL {
                println!("  {:<10} {}", r.label(), r.usage());
            }
            println!("Enhancements (all on by default):");
            for e in default_enhancements() {
                println!("  {:<10} {}", e.id, e.label);
            }
            println!("Payment: {} via Pix key {}", conf.price_label(), conf.pix_key);
            Ok(())
        }
        Commands::Prompt { choices } => {
            println!("{}", choices.compose()?);
            Ok(())
        }
        Commands::Verify { receipt } => {
            let client = Arc::new(GeminiClient::from_config(&conf)?);
            let verifier = PaymentVerifier::new(client, &conf.payment_amount);
            let image = ImageData::from_path(&receipt).await?;
            let verdict = verifier.verify(&image).await;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            if !verdict.is_valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Enhance { image, choices, out, verbose } => {
            let prompt = choices.compose()?;
            if verbose {
                eprintln!("[verbose] Prompt:\n{}", prompt);
            }
            let client = ImageGenerationClient::new(Arc::new(GeminiClient::from_config(&conf)?));
            let source = ImageData::from_path(&image).await?;
            match client.generate(&source, &prompt).await {
                Ok(url) => save_result(&url, out.as_deref(), &image).await,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Refine { image, instruction, out } => {
            let client = ImageGenerationClient::new(Arc::new(GeminiClient::from_config(&conf)?));
            let previous = ImageData::from_path(&image).await?;
            match client.refine(&previous.to_data_url(), &instruction).await {
                Ok(url) => save_result(&url, out.as_deref(), &image).await,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Write a result next to its source as `<stem>-photorun.<ext>` unless `out` is given.
async fn save_result(url: &str, out: Option<&Path>, source: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = ImageData::from_data_url(url)?;
    let path = match out {
        Some(p) => p.to_path_buf(),
        None => {
            let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
            source.with_file_name(format!("{}-photorun.{}", stem, image.file_extension()))
        }
    };
    tokio::fs::write(&path, &image.bytes).await?;
    println!("Saved {} ({} bytes)", path.display(), image.bytes.len());
    Ok(())
}
