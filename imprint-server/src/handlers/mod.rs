//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod add;
pub mod admin;
pub mod check;
pub mod entries;
pub mod health;
pub mod watermark;

pub use crate::state::AppState;
pub use add::{add_handler, AddRequest, AddResponse};
pub use admin::{
    clear_entries_handler, delete_entry_handler, list_entries_handler, ClearResponse,
    DeleteResponse, ListEntriesResponse,
};
pub use check::{check_handler, check_image_handler, CheckRequest, CheckResponse};
pub use entries::{update_entry_handler, EntryResponse, MetadataPatch};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use watermark::{embed_handler, extract_handler, EmbedResponse, ExtractResponse};
