use std::future::Future;
use std::path::{Component, Path};
use std::pin::Pin;

use super::error::{SessionError, SessionResult};
use crate::chat::models::Message;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Repository trait for named chat transcripts
pub trait SessionRepository: Send + Sync + 'static {
    /// Store `messages` under `name`, replacing any existing record
    fn save(&self, name: &str, messages: Vec<Message>) -> BoxFuture<'static, SessionResult<()>>;

    /// Load the transcript stored under `name`, in its original order
    fn load(&self, name: &str) -> BoxFuture<'static, SessionResult<Vec<Message>>>;

    /// Names of all stored sessions
    fn list(&self) -> BoxFuture<'static, SessionResult<Vec<String>>>;

    /// Remove the record stored under `name`
    fn delete(&self, name: &str) -> BoxFuture<'static, SessionResult<()>>;

    /// Move the record stored under `old_name` to `new_name`, replacing any record already there
    fn rename(&self, old_name: &str, new_name: &str) -> BoxFuture<'static, SessionResult<()>>;

    /// Point subsequent operations at the sessions folder of another workspace
    fn set_working_directory(&self, directory: &Path);
}

/// Session names double as file stems, so they must be a single plain path component.
pub fn validate_session_name(name: &str) -> SessionResult<()> {
    let invalid = || SessionError::InvalidName {
        name: name.to_string(),
    };

    if name.trim().is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(invalid()),
    }
}
