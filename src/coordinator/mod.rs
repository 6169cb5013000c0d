pub mod batch;
pub mod pool;
pub mod recovery;
pub mod transfer_coordinator;

pub use batch::BatchDispatcher;
pub use pool::WorkerPool;
pub use recovery::RecoverySweep;
pub use transfer_coordinator::{CreateTransferOutcome, TransferCoordinator};
