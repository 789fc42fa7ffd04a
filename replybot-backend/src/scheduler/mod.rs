pub mod runner;

pub use runner::{IntervalTrigger, Scheduler};
