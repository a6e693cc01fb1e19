//! Route handlers.

pub mod health;
pub mod logs;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;

use serde::{Deserialize, Serialize};
use store::PageRequest;

/// Pagination query parameters shared by all list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page, params.per_page)
    }
}

/// Plain confirmation body for delete endpoints.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
