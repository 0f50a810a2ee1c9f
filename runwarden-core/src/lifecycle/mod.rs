pub mod composer;
pub mod orchestrator;
pub mod purge;
pub mod scanner;
pub mod transport;

pub use composer::{ComposedNotice, Notice, NotificationComposer};
pub use orchestrator::{
    LifecycleOrchestrator, PassFailure, PassReport, PassStage,
};
pub use purge::{PurgeExecutor, PurgeOutcome};
pub use scanner::{ExpirationScanner, ScanOutcome};
pub use transport::{LogTransport, NoticeTransport};
