//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **TaskScheduler**: single-flight FIFO with deletion sweeps and a run-now lane
//! - **TaskHandle**: per-task completion handle (`TaskOutcome`)

pub mod handle;
pub mod scheduler;

// 主要な型を再エクスポート
pub use self::handle::{TaskHandle, TaskOutcome};
pub use self::scheduler::TaskScheduler;
