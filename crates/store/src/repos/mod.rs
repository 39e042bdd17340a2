//! Repositories
//!
//! One repository per table, borrowing the database handle per operation.

mod aggregates;
mod events;
mod transactions;
mod users;
mod videos;
mod windows;

pub use aggregates::AggregateRepo;
pub use events::EventRepo;
pub use transactions::TransactionRepo;
pub use users::UserRepo;
pub use videos::VideoRepo;
pub use windows::WindowRepo;
