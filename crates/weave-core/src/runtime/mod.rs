//! The evaluator.
//!
//! Evaluation is synchronous and single-threaded per term graph. Cache writes
//! go through [`OnceLock`](std::sync::OnceLock), so a term graph may still be
//! moved between threads.

mod eval;

pub use eval::{collect_list, evaluate, evaluate_as, evaluate_deep, evaluate_value, split_list};
