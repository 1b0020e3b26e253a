pub mod error;
pub mod session_json_repository;
pub mod session_repository;

pub use error::{SessionError, SessionResult};
pub use session_json_repository::SessionJsonRepository;
pub use session_repository::{SessionRepository, validate_session_name};
