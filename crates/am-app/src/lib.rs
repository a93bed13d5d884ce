//! ascii-mation : application terminal et export sans interface.
pub mod app;
pub mod batch;
pub mod cli;
pub mod generative;
pub mod hotreload;
