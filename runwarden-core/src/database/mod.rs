pub mod infrastructure;
pub mod ports;

pub use infrastructure::memory::InMemoryRunStore;
pub use infrastructure::mysql::{DEFAULT_RUN_TABLE, MySqlRunStore, MySqlStoreOptions};
pub use ports::databases::{DatabaseAdmin, DropOutcome};
pub use ports::runs::RunRegistry;
