pub mod completions;
pub mod email;
pub mod page;
pub mod search;
pub mod tags;
