//! Query and path helpers.

pub mod pagination;
pub mod path;

pub use pagination::PaginationParams;
pub use path::parse_id;
