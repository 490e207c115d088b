pub mod cache;
pub mod cli;
pub mod compiler;
pub mod debounce;
pub mod documents;
pub mod helpers;
pub mod hints;
pub mod report;
pub mod server;
pub mod settings;
pub mod telemetry;
