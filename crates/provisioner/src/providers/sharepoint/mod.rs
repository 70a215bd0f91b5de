//! SharePoint tracking list backed by Microsoft Graph.
//!
//! API Documentation: <https://learn.microsoft.com/graph/api/resources/listitem>

mod client;
mod models;

pub use client::SharePointList;
pub use models::*;
