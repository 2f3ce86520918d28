pub mod alerts;
pub mod exclusions;
pub mod health;
pub mod library;
pub mod logs;
pub mod mover;
pub mod operations;
pub mod settings;
pub mod webhooks;
