//! Service implementations
//!
//! Production implementations of the supervisor's seams: the file-backed
//! command channel, `nix` process control and the console presenter.

pub mod channel;
pub mod presenter;
pub mod process_control;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use channel::FileChannel;
pub use presenter::{TablePresenter, render_table};
pub use process_control::{NixProcessControl, set_process_title};
