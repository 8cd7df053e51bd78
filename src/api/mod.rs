pub mod catalog;
pub mod error;
pub mod fallback;
pub mod loan;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::{create_catalog_router, create_gateway_router, create_loan_router};
pub use types::ErrorResponse;
