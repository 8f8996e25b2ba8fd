pub mod classifier;
pub mod history;
