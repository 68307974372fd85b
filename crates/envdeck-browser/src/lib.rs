// CDP attachment to browsers launched by the profile manager.

pub mod elements;
mod error;
mod handle;

pub use elements::{prioritize_elements, ElementRect, PageElement, MAX_ELEMENTS};
pub use error::{Error, Result};
pub use handle::{BrowserHandle, TabInfo};
