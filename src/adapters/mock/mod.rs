pub mod availability_oracle;
pub mod book_repository;
pub mod loan_repository;

pub use availability_oracle::{AvailabilityOracle as StubAvailabilityOracle, OracleCall};
pub use book_repository::BookRepository as InMemoryBookRepository;
pub use loan_repository::LoanRepository as InMemoryLoanRepository;
