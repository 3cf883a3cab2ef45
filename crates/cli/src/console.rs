//! Terminal I/O shared by the REPL and the key prompt.

use futures::FutureExt;
use futures::future::BoxFuture;
use indicatif::{ProgressBar, ProgressStyle};
use lumina_core::error::AppError;
use lumina_core::key_gate::KeyHost;
use lumina_core::{Credentials, GeneratedImage, Session};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

const BILLING_DOCS: &str = "https://ai.google.dev/gemini-api/docs/billing";

/// Line-based stdin, shared so the key prompt and the REPL read from one buffer.
#[derive(Clone)]
pub struct Console {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }

    /// Prints `prompt` and reads one line. `None` on end of input.
    pub async fn ask(&self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut lines = self.lines.lock().await;
        Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
    }

    /// Asks a yes/no question; anything but `y`/`yes` is no.
    pub async fn confirm(&self, prompt: &str) -> io::Result<bool> {
        let answer = self.ask(prompt).await?.unwrap_or_default();
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Key host that asks the user to paste a billing-enabled key.
pub struct TerminalKeyHost {
    console: Console,
    credentials: Credentials,
}

impl TerminalKeyHost {
    pub fn new(console: Console, credentials: Credentials) -> Self {
        Self {
            console,
            credentials,
        }
    }
}

impl KeyHost for TerminalKeyHost {
    fn has_selected_api_key(&self) -> Option<BoxFuture<'_, bool>> {
        Some(futures::future::ready(self.credentials.has_paid_key()).boxed())
    }

    fn open_select_key(&self) -> Option<BoxFuture<'_, lumina_core::Result<()>>> {
        Some(
            async move {
                let key = self
                    .console
                    .ask("Paste a billing-enabled Gemini API key (blank to cancel): ")
                    .await?
                    .unwrap_or_default();
                if self.credentials.select_paid_key(key) {
                    println!("Key selected.");
                    Ok(())
                } else {
                    Err(AppError::validation("No key entered."))
                }
            }
            .boxed(),
        )
    }
}

/// Prints the explanation shown when the paid tier has no key.
pub fn print_key_required() {
    println!();
    println!("API Key Required");
    println!("To use the Pro model you must select a valid API key from a paid Google Cloud Project.");
    println!("See {} for more details.", BILLING_DOCS);
}

pub fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

pub fn describe_image(image: &GeneratedImage) -> String {
    let ratio = image
        .aspect_ratio()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{}  [{}, {}]  {}  \"{}\"",
        image.id(),
        image.model().short_name(),
        ratio,
        image.timestamp().format("%H:%M:%S"),
        image.prompt()
    )
}

pub fn print_history(session: &Session) {
    let history = session.history();
    if history.is_empty() {
        println!("No images generated yet.");
        return;
    }
    let current = session.current_image().map(|c| c.id());
    for (index, image) in history.iter().enumerate() {
        let marker = if Some(image.id()) == current { '*' } else { ' ' };
        println!("{}{:>3}. {}", marker, index + 1, describe_image(image));
    }
}

pub fn print_status(session: &Session) {
    println!("mode:         {}", session.mode());
    println!("model:        {}", session.model());
    println!("aspect ratio: {}", session.aspect_ratio().label());
    match session.reference() {
        Some(reference) => println!(
            "reference:    {} (~{} KB)",
            reference.mime_type,
            reference.decoded_len() / 1024
        ),
        None => println!("reference:    none"),
    }
    if !session.prompt().is_empty() {
        println!("prompt:       {}", session.prompt());
    }
    if let Some(image) = session.current_image() {
        println!("current:      {}", describe_image(image));
    }
    if let Some(error) = session.last_error() {
        println!("last error:   {}", error);
    }
}
