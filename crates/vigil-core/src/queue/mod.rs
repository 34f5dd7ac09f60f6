//! Queue module: task records and the pending FIFO with deletion sweeps.

mod record;
mod run_queue;

pub use record::TaskRecord;
pub use run_queue::RunQueue;
