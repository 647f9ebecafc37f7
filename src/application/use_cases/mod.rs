pub mod load_history;
pub mod project_overlays;

pub use load_history::*;
pub use project_overlays::*;
