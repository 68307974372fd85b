// REST service tying together the profile-manager client, browser handles,
// the note store and the hosted models.

mod error;
pub mod registry;
pub mod routes;
mod server;
pub mod state;

pub use error::{Error, Result};
pub use registry::{EnvironmentEntry, EnvironmentRegistry};
pub use server::{build_router, serve};
pub use state::AppState;
