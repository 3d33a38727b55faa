pub mod add;
pub mod complete;
pub mod due;
pub mod history;
pub mod stats;
pub mod train;
