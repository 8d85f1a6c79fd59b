//! Row filtering and grouped aggregation

pub mod aggregate;
pub mod filter;

pub use aggregate::{aggregate, AggregatedTable, Aggregation};
pub use filter::{filter, Criteria, Criterion, FilteredTable};
