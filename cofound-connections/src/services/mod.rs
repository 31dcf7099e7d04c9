pub mod discovery;
pub mod exclusion;
pub mod lifecycle;
pub mod retry;

pub use discovery::DiscoverySelector;
pub use exclusion::{build_exclusion_set, ExclusionSet};
pub use lifecycle::LifecycleManager;
pub use retry::RetryPolicy;
