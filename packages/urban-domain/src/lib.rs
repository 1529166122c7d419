pub mod capture;
pub mod decision;
pub mod object;
pub mod predicate;
pub mod time_serde;
