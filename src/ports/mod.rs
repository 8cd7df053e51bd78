pub mod availability_oracle;
pub mod book_repository;
pub mod loan_repository;

pub use availability_oracle::*;
pub use book_repository::{
    BookRepository, CopyCountUpdate, InsertOutcome, UpdateOutcome,
};
pub use loan_repository::LoanRepository;
