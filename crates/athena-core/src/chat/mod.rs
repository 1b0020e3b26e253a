pub mod controllers;
pub mod exporters;
pub mod models;
pub mod repositories;
pub mod services;
pub mod views;

pub use controllers::{ChatError, ChatOrchestrator};
pub use views::ChatView;
