use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::chat::exporters::write_transcript;
use crate::chat::models::{ContentType, DocumentContext, GenerationSlot, Message, Sender};
use crate::chat::repositories::{SessionError, SessionJsonRepository, SessionRepository};
use crate::chat::services::{
    CompletionClient, CompletionError, DocumentError, DocumentService, GenerationOptions,
};
use crate::chat::views::ChatView;
use crate::settings::{Settings, SettingsError, SettingsJsonRepository, SettingsRepository};

pub const GENERATION_FAILED_TEXT: &str =
    "Sorry, I encountered an error while processing your request.";
pub const DOCUMENT_READY_TEXT: &str = "Document uploaded and processed successfully.";
pub const DOCUMENT_EMPTY_TEXT: &str = "Failed to process the document.";
pub const DOCUMENT_FAILED_TEXT: &str = "An error occurred while processing the document.";
pub const MODELS_UNAVAILABLE_TEXT: &str =
    "Failed to load available models. Please check your connection to Ollama.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("A response is still being generated")]
    GenerationInProgress,

    #[error("No model selected")]
    NoModelSelected,

    #[error("No text could be extracted from {}", path.display())]
    EmptyDocument { path: PathBuf },

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to export chat to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Mutable conversation state. Only ever locked briefly, never across an await.
#[derive(Default)]
struct ChatState {
    messages: Vec<Message>,
    document: Option<Arc<DocumentContext>>,
    selected_model: Option<String>,
    session_name: Option<String>,
    /// Bumped whenever the transcript is replaced, so late results from the
    /// previous conversation can be recognised and dropped.
    epoch: u64,
}

/// Composes completion, ingestion and persistence for one conversation at a time.
///
/// Requests come in as async method calls; results go out through the
/// [`ChatView`]. State changes are committed only after the underlying
/// operation has fully succeeded.
pub struct ChatOrchestrator {
    view: Arc<dyn ChatView>,
    completion_client: CompletionClient,
    document_service: DocumentService,
    sessions: Arc<dyn SessionRepository>,
    settings_repository: Arc<dyn SettingsRepository>,
    settings: Mutex<Settings>,
    state: Mutex<ChatState>,
    generation: GenerationSlot,
}

impl ChatOrchestrator {
    /// Load settings from the default workspace and wire up JSON storage
    pub async fn start(view: Arc<dyn ChatView>) -> Result<Self, ChatError> {
        let settings_repository = Arc::new(SettingsJsonRepository::new());
        let settings = settings_repository.load().await;
        let sessions = Arc::new(SessionJsonRepository::in_working_directory(
            &settings.working_directory,
        ));

        Self::with_repositories(settings, view, settings_repository, sessions)
    }

    pub fn with_repositories(
        settings: Settings,
        view: Arc<dyn ChatView>,
        settings_repository: Arc<dyn SettingsRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Result<Self, ChatError> {
        std::fs::create_dir_all(&settings.working_directory)?;
        let document_service = DocumentService::new(&settings.working_directory)?;
        let completion_client = CompletionClient::new(&settings.server_url);

        info!(
            server_url = %settings.server_url,
            working_directory = %settings.working_directory.display(),
            "Chat orchestrator initialized"
        );

        Ok(Self {
            view,
            completion_client,
            document_service,
            sessions,
            settings_repository,
            settings: Mutex::new(settings),
            state: Mutex::new(ChatState::default()),
            generation: GenerationSlot::new(),
        })
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn document_context(&self) -> Option<Arc<DocumentContext>> {
        self.state.lock().document.clone()
    }

    pub fn selected_model(&self) -> Option<String> {
        self.state.lock().selected_model.clone()
    }

    pub fn session_name(&self) -> Option<String> {
        self.state.lock().session_name.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_busy()
    }

    pub fn completion_client(&self) -> &CompletionClient {
        &self.completion_client
    }

    /// Append and display a message that belongs to the current conversation
    fn emit(&self, message: Message) {
        self.state.lock().messages.push(message.clone());
        self.view.display_message(&message);
    }

    /// Like [`emit`](Self::emit), but only while the conversation started at
    /// `epoch` is still the current one. Returns whether it was emitted.
    fn emit_in_epoch(&self, epoch: u64, message: Message) -> bool {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return false;
            }
            state.messages.push(message.clone());
        }
        self.view.display_message(&message);
        true
    }

    /// Send `text` to `model` (or the selected model), prefixed with the active document.
    ///
    /// Returns the assistant message, or `None` if the request was cancelled by
    /// a new chat or session switch. On a model-server failure a generic
    /// apology is displayed and the typed error is returned for the caller's
    /// records; its details never reach the transcript.
    pub async fn send_message(
        &self,
        text: &str,
        model: Option<&str>,
    ) -> Result<Option<Message>, ChatError> {
        let model = match model.filter(|m| !m.is_empty()) {
            Some(model) => model.to_string(),
            None => match self.selected_model() {
                Some(model) => model,
                None => {
                    self.view.show_status("Please select a model first");
                    return Err(ChatError::NoModelSelected);
                }
            },
        };

        let Some(guard) = self.generation.try_begin() else {
            warn!("Message rejected, a response is still being generated");
            self.view
                .show_status("Please wait for the current response to finish");
            return Err(ChatError::GenerationInProgress);
        };

        info!(model = %model, "Handling message sent");
        self.emit(Message::user(text));

        let document = self.document_context();
        let options = GenerationOptions::from(&*self.settings.lock());
        let prompt = match &document {
            Some(context) => context.wrap_prompt(text),
            None => text.to_string(),
        };

        let result = tokio::select! {
            biased;
            _ = guard.cancel_token().cancelled() => None,
            result = self.completion_client.generate(&prompt, &model, options) => Some(result),
        };

        let Some(result) = result else {
            info!(model = %model, "Generation cancelled");
            return Ok(None);
        };

        let reply = match &result {
            Ok(answer) => Message::assistant(answer.as_str()),
            Err(e) => {
                error!(model = %model, error = ?e, "Error generating response");
                Message::system(GENERATION_FAILED_TEXT)
            }
        };

        {
            let mut state = self.state.lock();
            if guard.is_cancelled() {
                debug!("Dropping response for a conversation that was replaced");
                return Ok(None);
            }
            state.messages.push(reply.clone());
        }
        self.view.display_message(&reply);
        drop(guard);

        match result {
            Ok(_) => {
                self.auto_save().await;
                Ok(Some(reply))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ingest `path` and make its text the active document context.
    ///
    /// On failure a system notice is displayed and the previous context stays active.
    pub async fn upload_document(&self, path: &Path) -> Result<(), ChatError> {
        info!(path = %path.display(), "Handling document upload");
        let epoch = self.state.lock().epoch;

        match self.document_service.ingest(path).await {
            Ok(text) if text.is_empty() => {
                warn!(path = %path.display(), "Document produced no text");
                self.emit_in_epoch(epoch, Message::system(DOCUMENT_EMPTY_TEXT));
                Err(ChatError::EmptyDocument {
                    path: path.to_path_buf(),
                })
            }
            Ok(text) => {
                let context = Arc::new(DocumentContext::new(path, text));
                let notice = Message::new(Sender::System, DOCUMENT_READY_TEXT, ContentType::Document);
                {
                    let mut state = self.state.lock();
                    if state.epoch != epoch {
                        info!(path = %path.display(), "Chat was reset during upload, discarding document");
                        return Ok(());
                    }
                    state.document = Some(context);
                    state.messages.push(notice.clone());
                }
                self.view.display_message(&notice);
                Ok(())
            }
            Err(e) => {
                error!(path = %path.display(), error = ?e, "Error processing document");
                self.emit_in_epoch(epoch, Message::system(DOCUMENT_FAILED_TEXT));
                Err(e.into())
            }
        }
    }

    /// Start over: no messages, no document, no session name.
    pub fn new_chat(&self) {
        info!("Starting a new chat");
        self.generation.cancel();
        {
            let mut state = self.state.lock();
            state.messages.clear();
            state.document = None;
            state.session_name = None;
            state.epoch += 1;
        }
        self.view.clear_messages();
    }

    pub fn change_model(&self, model: &str) {
        info!(model = %model, "Model changed");
        self.state.lock().selected_model = Some(model.to_string());
    }

    /// Fetch the server's models and hand them to the view.
    ///
    /// The first model becomes the selection if none was chosen yet.
    pub async fn load_models(&self) -> Result<Vec<String>, ChatError> {
        info!("Loading available models");
        match self.completion_client.list_models().await {
            Ok(models) => {
                {
                    let mut state = self.state.lock();
                    if state.selected_model.is_none() {
                        state.selected_model = models.first().cloned();
                    }
                }
                self.view.set_model_list(&models);
                Ok(models)
            }
            Err(e) => {
                error!(error = ?e, "Failed to load models");
                self.view.show_status(MODELS_UNAVAILABLE_TEXT);
                Err(e.into())
            }
        }
    }

    /// Write the current transcript as plain text
    pub async fn export_chat(&self, path: &Path) -> Result<(), ChatError> {
        let messages = self.messages();
        let target = path.to_path_buf();

        let result = tokio::task::spawn_blocking(move || write_transcript(&target, &messages))
            .await
            .map_err(std::io::Error::other)
            .and_then(|r| r);

        match result {
            Ok(()) => {
                info!(path = %path.display(), "Chat exported");
                self.view
                    .show_status("Chat history has been exported successfully.");
                Ok(())
            }
            Err(source) => {
                error!(path = %path.display(), error = ?source, "Error exporting chat");
                self.view.show_status("Failed to export chat.");
                Err(ChatError::Export {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Persist the current transcript under `name`; later auto-saves go there too
    pub async fn save_session(&self, name: &str) -> Result<(), ChatError> {
        let messages = self.messages();
        self.sessions.save(name, messages).await?;

        self.state.lock().session_name = Some(name.to_string());
        self.view.show_status(&format!("Chat saved: {name}"));
        Ok(())
    }

    /// Replace the transcript with the stored session `name`.
    ///
    /// Any in-flight generation belongs to the old transcript and is cancelled.
    /// The document context is kept.
    pub async fn load_session(&self, name: &str) -> Result<Vec<Message>, ChatError> {
        let messages = self.sessions.load(name).await?;

        self.generation.cancel();
        {
            let mut state = self.state.lock();
            state.messages = messages.clone();
            state.session_name = Some(name.to_string());
            state.epoch += 1;
        }

        self.view.clear_messages();
        for message in &messages {
            self.view.display_message(message);
        }
        info!(session = %name, messages = messages.len(), "Chat loaded");
        Ok(messages)
    }

    pub async fn list_sessions(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.sessions.list().await?)
    }

    pub async fn delete_session(&self, name: &str) -> Result<(), ChatError> {
        self.sessions.delete(name).await?;

        let mut state = self.state.lock();
        if state.session_name.as_deref() == Some(name) {
            state.session_name = None;
        }
        Ok(())
    }

    pub async fn rename_session(&self, old_name: &str, new_name: &str) -> Result<(), ChatError> {
        self.sessions.rename(old_name, new_name).await?;

        let mut state = self.state.lock();
        if state.session_name.as_deref() == Some(old_name) {
            state.session_name = Some(new_name.to_string());
        }
        Ok(())
    }

    /// Prepare the new workspace, persist `settings`, then repoint the services.
    ///
    /// Folders are created before anything is written, so a workspace that
    /// cannot be used is rejected while the stored settings still point at the
    /// old one. The settings file itself stays where it was loaded from.
    pub async fn apply_settings(&self, settings: Settings) -> Result<(), ChatError> {
        if let Err(e) = std::fs::create_dir_all(settings.documents_dir()) {
            error!(
                path = %settings.working_directory.display(),
                error = ?e,
                "Working directory is not usable, settings not applied"
            );
            self.view.show_status("Failed to update settings");
            return Err(e.into());
        }

        self.settings_repository.save(settings.clone()).await?;

        self.document_service
            .set_working_directory(&settings.working_directory)?;
        self.sessions
            .set_working_directory(&settings.working_directory);
        self.completion_client.set_base_url(&settings.server_url);

        *self.settings.lock() = settings;
        self.view.show_status("Settings updated successfully");
        Ok(())
    }

    /// Cancel outstanding work and flush settings
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        info!("Shutting down the chat orchestrator");
        self.generation.cancel();
        let settings = self.settings();
        self.settings_repository.save(settings).await?;
        Ok(())
    }

    async fn auto_save(&self) {
        if !self.settings.lock().auto_save {
            return;
        }

        let (name, messages) = {
            let state = self.state.lock();
            match &state.session_name {
                Some(name) => (name.clone(), state.messages.clone()),
                None => return,
            }
        };

        if let Err(e) = self.sessions.save(&name, messages).await {
            warn!(session = %name, error = ?e, "Auto-save failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::chat::services::docx_extractor::test_support::{paragraphs, write_docx};

    #[derive(Default)]
    struct RecordingView {
        displayed: Mutex<Vec<Message>>,
        models: Mutex<Vec<String>>,
        statuses: Mutex<Vec<String>>,
        clears: Mutex<usize>,
    }

    impl ChatView for RecordingView {
        fn display_message(&self, message: &Message) {
            self.displayed.lock().push(message.clone());
        }

        fn set_model_list(&self, models: &[String]) {
            *self.models.lock() = models.to_vec();
        }

        fn show_status(&self, text: &str) {
            self.statuses.lock().push(text.to_string());
        }

        fn clear_messages(&self) {
            *self.clears.lock() += 1;
            self.displayed.lock().clear();
        }
    }

    struct Harness {
        tmp: tempfile::TempDir,
        view: Arc<RecordingView>,
        chat: Arc<ChatOrchestrator>,
    }

    fn harness(server_url: &str) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = tmp.path().join("workspace");
        let settings = Settings {
            server_url: server_url.to_string(),
            working_directory: workspace.clone(),
            ..Settings::default()
        };
        let view = Arc::new(RecordingView::default());
        let chat = ChatOrchestrator::with_repositories(
            settings,
            view.clone(),
            Arc::new(SettingsJsonRepository::in_directory(&workspace)),
            Arc::new(SessionJsonRepository::in_working_directory(&workspace)),
        )
        .unwrap();

        Harness {
            tmp,
            view,
            chat: Arc::new(chat),
        }
    }

    async fn answering_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_answer_becomes_assistant_message() {
        let server = answering_server("{\"response\":\"Hi\"}\n{\"response\":\" there\"}\n").await;
        let h = harness(&server.uri());

        let reply = h.chat.send_message("hello", Some("llama3")).await.unwrap().unwrap();

        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.content, "Hi there");
        let messages = h.chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(*h.view.displayed.lock(), messages);
    }

    #[tokio::test]
    async fn test_document_question_answered_from_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("Paris is the capital of France."))
            .and(body_string_contains("What is the capital?"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"response\":\"Paris.\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n",
            ))
            .expect(1)
            .mount(&server)
            .await;
        let h = harness(&server.uri());
        let doc = h.tmp.path().join("france.docx");
        write_docx(&doc, &paragraphs(&["Paris is the capital of France."]));

        h.chat.new_chat();
        h.chat.upload_document(&doc).await.unwrap();
        let reply = h
            .chat
            .send_message("What is the capital?", Some("llama3"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.content, "Paris.");
        assert_eq!(h.chat.messages().last(), Some(&reply));
        assert!(h.chat.settings().working_directory.join("documents/france.docx").exists());
    }

    #[tokio::test]
    async fn test_generation_failure_shows_generic_message_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model 'x' not found"))
            .mount(&server)
            .await;
        let h = harness(&server.uri());

        let err = h.chat.send_message("hello", Some("x")).await.unwrap_err();

        assert!(matches!(err, ChatError::Completion(CompletionError::GenerationFailed(_))));
        let displayed = h.view.displayed.lock().clone();
        let last = displayed.last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.content, GENERATION_FAILED_TEXT);
        assert!(!displayed.iter().any(|m| m.content.contains("not found")));
        assert!(!h.chat.is_generating());
    }

    #[tokio::test]
    async fn test_missing_model_is_rejected() {
        let h = harness("http://127.0.0.1:1");

        let err = h.chat.send_message("hello", None).await.unwrap_err();

        assert!(matches!(err, ChatError::NoModelSelected));
        assert!(h.chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_selected_model_is_used_when_none_given() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(wiremock::matchers::body_partial_json(
                serde_json::json!({ "model": "phi3" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\":\"ok\"}"))
            .expect(1)
            .mount(&server)
            .await;
        let h = harness(&server.uri());

        h.chat.change_model("phi3");
        let reply = h.chat.send_message("hi", None).await.unwrap().unwrap();

        assert_eq!(reply.content, "ok");
    }

    #[tokio::test]
    async fn test_second_send_while_generating_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"response\":\"slow\"}")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        let h = harness(&server.uri());

        let chat = h.chat.clone();
        let first = tokio::spawn(async move { chat.send_message("one", Some("m")).await });
        while !h.chat.is_generating() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let err = h.chat.send_message("two", Some("m")).await.unwrap_err();
        assert!(matches!(err, ChatError::GenerationInProgress));

        let reply = first.await.unwrap().unwrap().unwrap();
        assert_eq!(reply.content, "slow");
        let contents: Vec<String> = h.chat.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "slow"]);
    }

    #[tokio::test]
    async fn test_new_chat_cancels_generation_and_clears_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"response\":\"late\"}")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let h = harness(&server.uri());

        let chat = h.chat.clone();
        let pending = tokio::spawn(async move { chat.send_message("question", Some("m")).await });
        while !h.chat.is_generating() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        h.chat.new_chat();

        assert!(pending.await.unwrap().unwrap().is_none());
        assert!(h.chat.messages().is_empty());
        assert!(h.chat.document_context().is_none());
        assert!(h.view.displayed.lock().is_empty());
        assert_eq!(*h.view.clears.lock(), 1);
        assert!(!h.chat.is_generating());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_document() {
        let h = harness("http://127.0.0.1:1");
        let good = h.tmp.path().join("facts.docx");
        write_docx(&good, &paragraphs(&["The sky is blue."]));
        let bad = h.tmp.path().join("notes.txt");
        std::fs::write(&bad, "plain").unwrap();

        h.chat.upload_document(&good).await.unwrap();
        let err = h.chat.upload_document(&bad).await.unwrap_err();

        assert!(matches!(
            err,
            ChatError::Document(DocumentError::UnsupportedFormat { .. })
        ));
        let context = h.chat.document_context().unwrap();
        assert_eq!(context.text(), "The sky is blue.");
        assert_eq!(context.source(), good.as_path());

        let notices: Vec<String> = h.view.displayed.lock().iter().map(|m| m.content.clone()).collect();
        assert_eq!(notices, vec![DOCUMENT_READY_TEXT, DOCUMENT_FAILED_TEXT]);
    }

    #[tokio::test]
    async fn test_new_chat_clears_document() {
        let h = harness("http://127.0.0.1:1");
        let doc = h.tmp.path().join("facts.docx");
        write_docx(&doc, &paragraphs(&["x"]));
        h.chat.upload_document(&doc).await.unwrap();

        h.chat.new_chat();

        assert!(h.chat.document_context().is_none());
        assert!(h.chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_load_models_selects_first_and_notifies_view() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{ "name": "b-model" }, { "name": "a-model" }]
            })))
            .mount(&server)
            .await;
        let h = harness(&server.uri());

        let models = h.chat.load_models().await.unwrap();

        assert_eq!(models, vec!["b-model", "a-model"]);
        assert_eq!(*h.view.models.lock(), models);
        assert_eq!(h.chat.selected_model().as_deref(), Some("b-model"));
    }

    #[tokio::test]
    async fn test_load_models_failure_reports_status() {
        let h = harness("http://127.0.0.1:1");

        assert!(h.chat.load_models().await.is_err());
        assert_eq!(
            h.view.statuses.lock().last().map(String::as_str),
            Some(MODELS_UNAVAILABLE_TEXT)
        );
        assert!(h.view.models.lock().is_empty());
    }

    #[tokio::test]
    async fn test_export_chat_writes_transcript() {
        let server = answering_server("{\"response\":\"Paris.\"}\n").await;
        let h = harness(&server.uri());
        h.chat.send_message("Capital of France?", Some("m")).await.unwrap();
        let target = h.tmp.path().join("export.txt");

        h.chat.export_chat(&target).await.unwrap();

        let transcript = std::fs::read_to_string(&target).unwrap();
        assert!(transcript.starts_with("--- You ("));
        assert!(transcript.contains("Capital of France?\n\n--- Athena ("));
        assert!(transcript.ends_with("Paris.\n\n"));
    }

    #[tokio::test]
    async fn test_export_to_directory_fails() {
        let h = harness("http://127.0.0.1:1");

        let err = h.chat.export_chat(h.tmp.path()).await.unwrap_err();

        assert!(matches!(err, ChatError::Export { .. }));
        assert_eq!(
            h.view.statuses.lock().last().map(String::as_str),
            Some("Failed to export chat.")
        );
    }

    #[tokio::test]
    async fn test_session_save_load_roundtrip_and_auto_save() {
        let server = answering_server("{\"response\":\"first\"}\n").await;
        let h = harness(&server.uri());
        h.chat.send_message("q1", Some("m")).await.unwrap();
        h.chat.save_session("trip").await.unwrap();

        // auto_save defaults to on, so the next exchange lands in "trip" too
        h.chat.send_message("q2", Some("m")).await.unwrap();
        let saved = h.chat.messages();

        h.chat.new_chat();
        assert!(h.chat.session_name().is_none());

        let loaded = h.chat.load_session("trip").await.unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.len(), 4);
        assert_eq!(h.chat.messages(), saved);
        assert_eq!(*h.view.displayed.lock(), saved);
        assert_eq!(h.chat.session_name().as_deref(), Some("trip"));
    }

    #[tokio::test]
    async fn test_session_management_passthrough() {
        let h = harness("http://127.0.0.1:1");
        h.chat.save_session("one").await.unwrap();
        h.chat.save_session("two").await.unwrap();

        h.chat.rename_session("two", "deux").await.unwrap();
        assert_eq!(h.chat.session_name().as_deref(), Some("deux"));

        h.chat.delete_session("deux").await.unwrap();
        assert!(h.chat.session_name().is_none());
        assert_eq!(h.chat.list_sessions().await.unwrap(), vec!["one".to_string()]);

        let err = h.chat.delete_session("deux").await.unwrap_err();
        assert!(matches!(err, ChatError::Session(SessionError::NotFound { .. })));
        let err = h.chat.load_session("missing").await.unwrap_err();
        assert!(matches!(err, ChatError::Session(SessionError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unusable_working_directory_leaves_stored_settings_alone() {
        let h = harness("http://127.0.0.1:1");
        let original = h.chat.settings();
        h.chat.apply_settings(original.clone()).await.unwrap();
        let blocker = h.tmp.path().join("blocker");
        std::fs::write(&blocker, "not a folder").unwrap();

        let unusable = Settings {
            working_directory: blocker.join("sub"),
            ..original.clone()
        };
        let err = h.chat.apply_settings(unusable).await.unwrap_err();

        assert!(matches!(err, ChatError::IoError(_)));
        assert_eq!(h.chat.settings(), original);
        assert_eq!(
            h.view.statuses.lock().last().map(String::as_str),
            Some("Failed to update settings")
        );

        let settings_repository = Arc::new(SettingsJsonRepository::in_directory(
            &original.working_directory,
        ));
        let stored = settings_repository.load().await;
        assert_eq!(stored, original);

        let restarted = ChatOrchestrator::with_repositories(
            stored.clone(),
            Arc::new(RecordingView::default()),
            settings_repository,
            Arc::new(SessionJsonRepository::in_working_directory(
                &stored.working_directory,
            )),
        );
        assert!(restarted.is_ok());
    }

    #[tokio::test]
    async fn test_notice_from_replaced_conversation_is_dropped() {
        let h = harness("http://127.0.0.1:1");
        let upload_epoch = h.chat.state.lock().epoch;

        h.chat.new_chat();

        assert!(!h.chat.emit_in_epoch(upload_epoch, Message::system(DOCUMENT_FAILED_TEXT)));
        assert!(h.chat.messages().is_empty());
        assert!(h.view.displayed.lock().is_empty());

        let current = h.chat.state.lock().epoch;
        assert!(h.chat.emit_in_epoch(current, Message::system(DOCUMENT_EMPTY_TEXT)));
        assert_eq!(h.chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_settings_persists_and_repoints() {
        let old_server = MockServer::start().await;
        let new_server = answering_server("{\"response\":\"from new\"}\n").await;
        let h = harness(&old_server.uri());
        let new_workspace = h.tmp.path().join("elsewhere");

        let updated = Settings {
            server_url: new_server.uri(),
            working_directory: new_workspace.clone(),
            max_tokens: 99,
            ..h.chat.settings()
        };
        h.chat.apply_settings(updated.clone()).await.unwrap();

        assert_eq!(h.chat.settings(), updated);
        assert!(new_workspace.join("documents").is_dir());
        let stored = SettingsJsonRepository::in_directory(&h.tmp.path().join("workspace"))
            .load()
            .await;
        assert_eq!(stored, updated);

        let reply = h.chat.send_message("hi", Some("m")).await.unwrap().unwrap();
        assert_eq!(reply.content, "from new");

        h.chat.save_session("moved").await.unwrap();
        assert!(new_workspace.join("chats").join("moved.json").exists());
        assert_eq!(
            h.view.statuses.lock().first().map(String::as_str),
            Some("Settings updated successfully")
        );
    }
}
