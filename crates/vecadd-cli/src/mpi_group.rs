//! `ProcessGroup` over `MPI_COMM_WORLD`.

use mpi::collective::SystemOperation;
use mpi::datatype::Equivalence;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use tracing::debug;

use vecadd_core::error::{GroupError, GroupResult};
use vecadd_core::group::{GroupContext, ProcessGroup, COORDINATOR_RANK};

/// The MPI world communicator. MPI is finalized on drop.
pub struct MpiGroup {
    world: SimpleCommunicator,
    context: GroupContext,
    // Dropped last: finalizes MPI.
    _universe: Universe,
}

impl MpiGroup {
    /// Initialize MPI and join the world communicator.
    pub fn init() -> GroupResult<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| GroupError::Transport("MPI is already initialized".to_string()))?;
        let world = universe.world();
        let context = GroupContext {
            rank: world.rank() as usize,
            size: world.size() as usize,
        };
        let host = mpi::environment::processor_name().unwrap_or_default();
        debug!(rank = context.rank, size = context.size, host = %host, "joined MPI world");

        Ok(Self {
            world,
            context,
            _universe: universe,
        })
    }

    /// Terminate every process in the world with `code`.
    pub fn abort(&self, code: u8) -> ! {
        self.world.abort(i32::from(code))
    }

    fn reduce_max<T: Equivalence + Default>(&self, value: T) -> Option<T> {
        let root = self.world.process_at_rank(COORDINATOR_RANK as i32);
        if self.context.is_coordinator() {
            let mut max = T::default();
            root.reduce_into_root(&value, &mut max, SystemOperation::max());
            Some(max)
        } else {
            root.reduce_into(&value, SystemOperation::max());
            None
        }
    }
}

impl ProcessGroup for MpiGroup {
    fn context(&self) -> GroupContext {
        self.context
    }

    fn reduce_max_f32(&self, value: f32) -> GroupResult<Option<f32>> {
        Ok(self.reduce_max(value))
    }

    fn reduce_max_f64(&self, value: f64) -> GroupResult<Option<f64>> {
        Ok(self.reduce_max(value))
    }
}
