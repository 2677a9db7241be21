pub mod matching;
pub mod posting;
pub mod store;
