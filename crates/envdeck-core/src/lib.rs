pub mod config;
pub mod error;
pub mod notes;

pub use config::Config;
pub use error::{Error, Result};
pub use notes::NoteStore;
