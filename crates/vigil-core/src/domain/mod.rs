//! Domain model (ids, task lifecycle, delete policy, settings key).

pub mod ids;
pub mod key;
pub mod policy;
pub mod state;

pub use ids::TaskId;
pub use key::{KEY_SIZE, SettingsKey};
pub use policy::DeletePolicy;
pub use state::TaskState;
