use std::path::PathBuf;

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(String),
    NewChat,
    Upload(PathBuf),
    Model(String),
    Models,
    Export(PathBuf),
    Save(String),
    Load(String),
    List,
    Delete(String),
    Rename { from: String, to: String },
    Set { key: String, value: String },
    Settings,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  /new                    start a new chat
  /upload <path>          attach a .pdf or .docx document
  /model <name>           select the model
  /models                 list the server's models
  /export <path>          write the transcript as text
  /save <name>            save the chat (auto-saved afterwards)
  /load <name>            load a saved chat
  /list                   list saved chats
  /delete <name>          delete a saved chat
  /rename <old> <new>     rename a saved chat
  /set <key> <value>      change a setting (server_url, working_directory,
                          max_tokens, temperature, auto_save)
  /settings               show current settings
  /quit                   exit
Anything else is sent to the model.";

/// Parse a line; `None` for blank input
pub fn parse(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Some(Ok(Command::Send(line.to_string())));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    let required = |usage: &str| -> Result<String, String> {
        if argument.is_empty() {
            Err(format!("Usage: /{name} {usage}"))
        } else {
            Ok(argument.to_string())
        }
    };

    let command = match name {
        "new" => Ok(Command::NewChat),
        "upload" => required("<path>").map(|p| Command::Upload(PathBuf::from(p))),
        "model" => required("<name>").map(Command::Model),
        "models" => Ok(Command::Models),
        "export" => required("<path>").map(|p| Command::Export(PathBuf::from(p))),
        "save" => required("<name>").map(Command::Save),
        "load" => required("<name>").map(Command::Load),
        "list" => Ok(Command::List),
        "delete" => required("<name>").map(Command::Delete),
        "rename" => match argument.split_once(char::is_whitespace) {
            Some((from, to)) if !to.trim().is_empty() => Ok(Command::Rename {
                from: from.to_string(),
                to: to.trim().to_string(),
            }),
            _ => Err("Usage: /rename <old> <new>".to_string()),
        },
        "set" => match argument.split_once(char::is_whitespace) {
            Some((key, value)) if !value.trim().is_empty() => Ok(Command::Set {
                key: key.to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err("Usage: /set <key> <value>".to_string()),
        },
        "settings" => Ok(Command::Settings),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command /{other}, try /help")),
    };

    Some(command)
}
