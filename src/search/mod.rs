//! Building server-side search queries.

pub mod criteria;

pub use criteria::{SearchCriteria, SearchKey};
