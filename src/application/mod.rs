pub mod context;
pub mod coordinator;
pub mod dashboard;
pub mod live_feed;
pub mod signal_desk;
pub mod use_cases;

pub use context::SyncDeps;
pub use coordinator::ChartSyncCoordinator;
pub use dashboard::{Dashboard, LAYOUT};
pub use live_feed::{FeedObserver, FeedState, FeedStats, FeedTransport, LiveFeedController};
pub use signal_desk::{DeskListener, DeskSnapshot, SignalDesk};
pub use use_cases::{HistoryLoader, OverlayProjector, project_report};
