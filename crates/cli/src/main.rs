mod console;
mod repl;

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::{Console, TerminalKeyHost};
use lumina_core::image_processing::default_download_dir;
use lumina_core::{
    AspectRatio, Config, Credentials, ErrorKind, KeyGate, ModelTier, Studio, SubmitOutcome, init,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prompt to send to Gemini. Omit to start an interactive session.
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Model tier: flash or pro
    #[arg(short, long)]
    model: Option<ModelTier>,

    /// Aspect ratio: 1:1, 3:4, 4:3, 16:9 or 9:16
    #[arg(short, long)]
    aspect_ratio: Option<AspectRatio>,

    /// Reference image to edit (max 5MB)
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Directory to save generated images to
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Start an interactive session even when a prompt is given
    #[arg(short, long, default_value_t = false)]
    interactive: bool,

    /// List available models and aspect ratios and exit
    #[arg(long)]
    list_options: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    init_tracing();
    let args = Args::parse();

    // Handle --list-options
    if args.list_options {
        repl::print_options();
        return Ok(());
    }

    let config = match Config::load() {
        Err(e) if e.kind() == ErrorKind::Credential => {
            bail!("{}\nSet GEMINI_API_KEY in the environment or in a .env file.", e)
        }
        loaded => loaded.context("Failed to load configuration")?,
    };
    let credentials = Credentials::from_config(&config);
    let console = Console::new();
    let gate = KeyGate::new(Arc::new(TerminalKeyHost::new(
        console.clone(),
        credentials.clone(),
    )));

    let mut studio = Studio::gemini(&config, credentials, gate)
        .context("Failed to initialize Gemini client")?;

    // CLI flags override configured defaults
    if let Some(model) = args.model {
        studio.set_model(model);
    }
    if let Some(ratio) = args.aspect_ratio {
        studio.set_aspect_ratio(ratio);
    }
    if let Some(path) = &args.reference {
        studio
            .attach_reference(path)
            .await
            .with_context(|| format!("Failed to load reference image {}", path.display()))?;
    }

    let prompt = args.prompt.join(" ");
    if args.interactive || prompt.trim().is_empty() {
        if !prompt.trim().is_empty() {
            studio.set_prompt(prompt);
        }
        return repl::run(&mut studio, &console, args.out).await;
    }

    // One-shot generation
    studio.set_prompt(prompt);
    let save_dir = args.out.unwrap_or_else(default_download_dir);
    let mut outcome = repl::submit_and_report(&mut studio, &console, Some(&save_dir)).await?;

    // After the key prompt the user decides whether to submit again.
    if outcome == SubmitOutcome::AwaitingKey && console.confirm("Submit again? [y/N] ").await? {
        outcome = repl::submit_and_report(&mut studio, &console, Some(&save_dir)).await?;
    }

    match outcome {
        SubmitOutcome::Generated(_) => Ok(()),
        _ => bail!("No image was generated"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
