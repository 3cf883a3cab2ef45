//! Interactive session loop.

use crate::console::{self, Console};
use anyhow::Result;
use lumina_core::image_processing::default_download_dir;
use lumina_core::{
    AspectRatio, GeneratedImage, History, ImageModel, Mode, ModelTier, Studio, SubmitOutcome, Uuid,
};
use std::path::PathBuf;

const HELP: &str = "\
Type a prompt and press Enter to generate. Commands:
  /model <flash|pro>      switch model tier
  /ratio <1:1|3:4|4:3|16:9|9:16>
  /mode <generate|edit>
  /ref <path>             attach a reference image (switches to edit)
  /clear-ref              drop the reference image
  /use-current            edit the current image
  /go                     submit the current prompt again
  /history                list images from this session
  /select <n|id>          show a history entry and restore its settings
  /delete <n|id>          remove a history entry
  /save [dir]             save the current image
  /status                 show current settings
  /options                list models and aspect ratios
  /help, /quit";

#[derive(Debug, PartialEq)]
pub enum Command {
    Prompt(String),
    Go,
    Model(ModelTier),
    Ratio(AspectRatio),
    Mode(Mode),
    Reference(PathBuf),
    ClearReference,
    UseCurrent,
    History,
    Select(String),
    Delete(String),
    Save(Option<PathBuf>),
    Status,
    Options,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Prompt(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |what: &str| {
        if arg.is_empty() {
            Err(format!("/{} needs {}", name, what))
        } else {
            Ok(arg.to_string())
        }
    };

    let command = match name {
        "go" => Command::Go,
        "model" => Command::Model(
            required("a model")?
                .parse::<ModelTier>()
                .map_err(|e| e.to_string())?,
        ),
        "ratio" => Command::Ratio(
            required("an aspect ratio")?
                .parse::<AspectRatio>()
                .map_err(|e| e.to_string())?,
        ),
        "mode" => Command::Mode(required("a mode")?.parse::<Mode>().map_err(|e| e.to_string())?),
        "ref" => Command::Reference(PathBuf::from(required("a file path")?)),
        "clear-ref" => Command::ClearReference,
        "use-current" => Command::UseCurrent,
        "history" => Command::History,
        "select" => Command::Select(required("an entry number or id")?),
        "delete" => Command::Delete(required("an entry number or id")?),
        "save" => Command::Save((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "status" => Command::Status,
        "options" => Command::Options,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("Unknown command '/{}'. Try /help", other)),
    };
    Ok(Some(command))
}

pub fn print_options() {
    println!("Models:");
    for tier in ModelTier::ALL {
        println!("  {:<6} {:<20} {}", tier.short_name(), tier.label(), tier.description());
    }
    println!("Aspect ratios:");
    for ratio in AspectRatio::ALL {
        println!("  {:<6} {}", ratio.as_str(), ratio.label());
    }
}

/// Runs one submission and reports the outcome, including the key prompt.
///
/// A failed save is reported but does not fail the call, so the session and
/// its history survive.
pub async fn submit_and_report<M: ImageModel>(
    studio: &mut Studio<M>,
    console: &Console,
    save_dir: Option<&PathBuf>,
) -> Result<SubmitOutcome> {
    let in_edit = studio.session().mode() == Mode::Edit;
    let spinner = console::spinner(format!(
        "{} with {}...",
        if in_edit { "Editing" } else { "Generating" },
        studio.session().model().label()
    ))?;
    let outcome = studio.submit().await;
    spinner.finish_and_clear();

    match &outcome {
        SubmitOutcome::Generated(image) => {
            println!("Generated {}", console::describe_image(image));
            if let Some(dir) = save_dir {
                match studio.download_current(dir).await {
                    Ok(path) => println!("Saved to {}", path.display()),
                    Err(e) => eprintln!("Could not save image to {}: {}", dir.display(), e),
                }
            }
        }
        SubmitOutcome::Failed(message) => eprintln!("Generation failed: {}", message),
        SubmitOutcome::Invalid(message) => eprintln!("{}", message),
        SubmitOutcome::Busy => eprintln!("A generation is already running."),
        SubmitOutcome::AwaitingKey => {
            console::print_key_required();
            if console.confirm("Select a key now? [y/N] ").await? {
                studio.select_key().await;
            } else {
                studio.dismiss_key_prompt();
            }
        }
    }
    Ok(outcome)
}

pub async fn run<M: ImageModel>(
    studio: &mut Studio<M>,
    console: &Console,
    save_dir: Option<PathBuf>,
) -> Result<()> {
    println!("Lumina Studio. Type /help for commands.");

    loop {
        let marker = match studio.session().mode() {
            Mode::Generate => "generate",
            Mode::Edit => "edit",
        };
        let Some(line) = console
            .ask(&format!("{} [{}]> ", marker, studio.session().model().short_name()))
            .await?
        else {
            println!();
            return Ok(());
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        match command {
            Command::Prompt(prompt) => {
                studio.set_prompt(prompt);
                submit_and_report(studio, console, save_dir.as_ref()).await?;
            }
            Command::Go => {
                submit_and_report(studio, console, save_dir.as_ref()).await?;
            }
            Command::Model(model) => {
                studio.set_model(model);
                if model.requires_paid_key() {
                    println!("Note: Pro model requires a paid API key selection.");
                }
            }
            Command::Ratio(ratio) => studio.set_aspect_ratio(ratio),
            Command::Mode(mode) => studio.set_mode(mode),
            Command::Reference(path) => match studio.attach_reference(&path).await {
                Ok(()) => println!("Reference image attached; now in edit mode."),
                Err(e) => eprintln!("{}", e),
            },
            Command::ClearReference => studio.clear_reference(),
            Command::UseCurrent => match studio.reference_current_image() {
                Ok(()) => println!("Current image attached as reference; now in edit mode."),
                Err(e) => eprintln!("{}", e),
            },
            Command::History => console::print_history(studio.session()),
            Command::Select(token) => match resolve_entry(studio.session().history(), &token) {
                Some(id) => {
                    studio.select_history(id);
                    console::print_status(studio.session());
                }
                None => eprintln!("No history entry '{}'", token),
            },
            Command::Delete(token) => match resolve_entry(studio.session().history(), &token) {
                Some(id) => {
                    studio.delete_history(id);
                    println!("Deleted {}", id);
                }
                None => eprintln!("No history entry '{}'", token),
            },
            Command::Save(dir) => {
                let dir = dir
                    .or_else(|| save_dir.clone())
                    .unwrap_or_else(default_download_dir);
                match studio.download_current(&dir).await {
                    Ok(path) => println!("Saved to {}", path.display()),
                    Err(e) => eprintln!("{}", e),
                }
            }
            Command::Status => console::print_status(studio.session()),
            Command::Options => print_options(),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(()),
        }
    }
}

/// Finds a history entry by 1-based position or by unambiguous id prefix.
fn resolve_entry(history: &History, token: &str) -> Option<Uuid> {
    if let Ok(position) = token.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| history.nth(index))
            .map(GeneratedImage::id);
    }
    let token = token.to_ascii_lowercase();
    let mut matches = history
        .iter()
        .filter(|image| image.id().to_string().starts_with(&token));
    match (matches.next(), matches.next()) {
        (Some(image), None) => Some(image.id()),
        _ => None,
    }
}
