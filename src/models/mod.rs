pub mod audit;
pub mod department;
pub mod employee;
pub mod page;

/// Id carried by an entity that has not been written to the store yet.
pub const UNASSIGNED_ID: i64 = 0;
