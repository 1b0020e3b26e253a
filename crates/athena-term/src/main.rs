mod commands;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use athena_core::chat::models::Message;
use athena_core::config::{APP_NAME, APP_VERSION, default_workspace};
use athena_core::logging::init_logging;
use athena_core::{ChatOrchestrator, ChatView, Settings};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{error, info, warn};

use crate::commands::{Command, HELP};

/// Prints core notifications straight to the terminal
struct TerminalView;

impl ChatView for TerminalView {
    fn display_message(&self, message: &Message) {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.sender.display_name(),
            message.content
        );
    }

    fn set_model_list(&self, models: &[String]) {
        if models.is_empty() {
            println!("No models installed on the server");
        } else {
            println!("Models: {}", models.join(", "));
        }
    }

    fn show_status(&self, text: &str) {
        println!("-- {text}");
    }

    fn clear_messages(&self) {
        println!("-- New conversation");
    }
}

fn apply_setting(mut settings: Settings, key: &str, value: &str) -> Result<Settings> {
    match key {
        "server_url" => settings.server_url = value.to_string(),
        "working_directory" => settings.working_directory = value.into(),
        "max_tokens" => settings.max_tokens = value.parse().context("max_tokens must be a number")?,
        "temperature" => {
            settings.temperature = value.parse().context("temperature must be a number")?
        }
        "auto_save" => settings.auto_save = value.parse().context("auto_save must be true or false")?,
        "theme" => settings.theme = value.to_string(),
        "font_size" => settings.font_size = value.parse().context("font_size must be a number")?,
        other => bail!("Unknown setting {other}"),
    }
    Ok(settings)
}

/// What the prompt produced
#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    Interrupted,
    Finished,
}

/// Ctrl-C keeps the session alive; Ctrl-D and read failures end it so shutdown can run
fn classify(result: rustyline::Result<String>) -> Input {
    match result {
        Ok(line) => Input::Line(line),
        Err(ReadlineError::Interrupted) => Input::Interrupted,
        Err(ReadlineError::Eof) => Input::Finished,
        Err(e) => {
            error!(error = ?e, "Failed to read input");
            Input::Finished
        }
    }
}

/// Run one command; `false` ends the session
async fn dispatch(chat: &Arc<ChatOrchestrator>, command: Command) -> Result<bool> {
    match command {
        Command::Send(text) => {
            // Runs in the background so /new can cancel it
            let chat = chat.clone();
            tokio::spawn(async move {
                if let Err(e) = chat.send_message(&text, None).await {
                    warn!(error = %e, "Message was not answered");
                }
            });
        }
        Command::NewChat => chat.new_chat(),
        Command::Upload(path) => chat.upload_document(&path).await?,
        Command::Model(name) => {
            chat.change_model(&name);
            println!("-- Using {name}");
        }
        Command::Models => {
            chat.load_models().await?;
        }
        Command::Export(path) => chat.export_chat(&path).await?,
        Command::Save(name) => chat.save_session(&name).await?,
        Command::Load(name) => {
            chat.load_session(&name).await?;
        }
        Command::List => {
            let sessions = chat.list_sessions().await?;
            if sessions.is_empty() {
                println!("-- No saved chats");
            }
            for name in sessions {
                println!("  {name}");
            }
        }
        Command::Delete(name) => {
            chat.delete_session(&name).await?;
            println!("-- Deleted {name}");
        }
        Command::Rename { from, to } => {
            chat.rename_session(&from, &to).await?;
            println!("-- Renamed {from} to {to}");
        }
        Command::Set { key, value } => {
            let settings = apply_setting(chat.settings(), &key, &value)?;
            chat.apply_settings(settings).await?;
        }
        Command::Settings => {
            let settings = chat.settings();
            println!("  server_url        {}", settings.server_url);
            println!("  working_directory {}", settings.working_directory.display());
            println!("  max_tokens        {}", settings.max_tokens);
            println!("  temperature       {}", settings.temperature);
            println!("  auto_save         {}", settings.auto_save);
            println!(
                "  model             {}",
                chat.selected_model().unwrap_or_else(|| "(none)".to_string())
            );
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let logging = init_logging(&default_workspace()).context("Failed to initialise logging")?;
    info!(log = %logging.log_path().display(), "Starting {APP_NAME} {APP_VERSION}");

    let chat = Arc::new(
        ChatOrchestrator::start(Arc::new(TerminalView))
            .await
            .context("Failed to start chat")?,
    );

    println!("{APP_NAME} {APP_VERSION}. Type /help for commands.");
    if chat.load_models().await.is_ok()
        && let Some(model) = chat.selected_model()
    {
        println!("-- Using {model}");
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match classify(tokio::task::block_in_place(|| rl.readline("> "))) {
            Input::Line(line) => line,
            Input::Interrupted => {
                println!("-- Ctrl-C detected. Type /quit to exit.");
                continue;
            }
            Input::Finished => break,
        };

        let command = match commands::parse(&line) {
            Some(Ok(command)) => command,
            Some(Err(usage)) => {
                println!("{usage}");
                continue;
            }
            None => continue,
        };
        let _ = rl.add_history_entry(line.trim());

        match dispatch(&chat, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Command failed");
                println!("Error: {e}");
            }
        }
    }

    chat.shutdown().await.context("Failed to save settings")?;
    info!("Goodbye");
    Ok(())
}
