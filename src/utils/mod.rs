pub mod files;

pub use files::{WorkDirs, collect_input_files, relocate, write_trace_log};
