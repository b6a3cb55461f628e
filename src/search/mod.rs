pub mod fusion;
pub mod hybrid;
pub mod store;
pub mod tokenize;
