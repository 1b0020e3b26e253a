use crate::chat::models::Message;

/// Notifications the core sends to the presentation layer.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// task that ran the request.
pub trait ChatView: Send + Sync + 'static {
    /// Show a message in the transcript (sender, content and content type are on `message`)
    fn display_message(&self, message: &Message);

    /// Replace the list of selectable models
    fn set_model_list(&self, models: &[String]);

    /// Show a transient status line
    fn show_status(&self, text: &str);

    /// Drop every displayed message (new chat or session switch)
    fn clear_messages(&self) {}
}
