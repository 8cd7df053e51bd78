pub mod handlers;
pub mod types;

pub use handlers::LoanState;
