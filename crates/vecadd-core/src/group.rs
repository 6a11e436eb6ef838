//! Process groups and MAX reductions to the coordinator.
//!
//! Every participant calls the same collectives in the same order. Only the
//! coordinator (rank 0) receives the reduced value; other ranks get `None`.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::error::{GroupError, GroupResult};

/// Rank that receives reduced values.
pub const COORDINATOR_RANK: usize = 0;

/// This participant's place in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupContext {
    /// Zero-based rank.
    pub rank: usize,
    /// Number of participants.
    pub size: usize,
}

impl GroupContext {
    /// Single-participant context.
    pub const SOLO: GroupContext = GroupContext { rank: 0, size: 1 };

    /// Whether this participant receives reduced values.
    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }
}

/// Collective operations supplied by the process transport.
pub trait ProcessGroup {
    /// Rank and size of this participant.
    fn context(&self) -> GroupContext;

    /// MAX-reduce a single-precision value to the coordinator.
    fn reduce_max_f32(&self, value: f32) -> GroupResult<Option<f32>>;

    /// MAX-reduce a double-precision value to the coordinator.
    fn reduce_max_f64(&self, value: f64) -> GroupResult<Option<f64>>;
}

/// A group of one. Reductions return the local value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloGroup;

impl ProcessGroup for SoloGroup {
    fn context(&self) -> GroupContext {
        GroupContext::SOLO
    }

    fn reduce_max_f32(&self, value: f32) -> GroupResult<Option<f32>> {
        Ok(Some(value))
    }

    fn reduce_max_f64(&self, value: f64) -> GroupResult<Option<f64>> {
        Ok(Some(value))
    }
}

struct Rendezvous {
    /// Collectives completed by the whole group.
    round: u64,
    /// Contributions to the current round.
    values: Vec<Option<f64>>,
    /// Collectives each member has entered.
    entered: Vec<u64>,
    /// Members that have been dropped.
    departed: Vec<bool>,
    /// Result of the last completed round.
    result: f64,
}

impl Rendezvous {
    /// A departed member that never entered the current round.
    fn missing_peer(&self) -> Option<usize> {
        (0..self.departed.len()).find(|&r| self.departed[r] && self.entered[r] <= self.round)
    }
}

struct Shared {
    state: Mutex<Rendezvous>,
    turn: Condvar,
}

/// In-process group whose members run on separate threads.
///
/// Behaves like a blocking collective transport: a reduction returns once
/// every member has contributed. If a member is dropped before entering a
/// collective its peers are blocked in, the peers fail with
/// [`GroupError::PeerDeparted`] instead of waiting forever.
pub struct ThreadGroup;

impl ThreadGroup {
    /// Create `size` members, one per rank.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn members(size: usize) -> Vec<ThreadMember> {
        assert!(size > 0, "a group needs at least one member");
        let shared = Arc::new(Shared {
            state: Mutex::new(Rendezvous {
                round: 0,
                values: vec![None; size],
                entered: vec![0; size],
                departed: vec![false; size],
                result: f64::NEG_INFINITY,
            }),
            turn: Condvar::new(),
        });
        (0..size)
            .map(|rank| ThreadMember {
                context: GroupContext { rank, size },
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

/// One rank of a [`ThreadGroup`].
pub struct ThreadMember {
    context: GroupContext,
    shared: Arc<Shared>,
}

impl ThreadMember {
    fn reduce_max(&self, value: f64) -> GroupResult<Option<f64>> {
        let rank = self.context.rank;
        let mut state = self.shared.state.lock();

        if let Some(peer) = state.missing_peer() {
            return Err(GroupError::PeerDeparted { rank: peer });
        }

        let round = state.round;
        state.values[rank] = Some(value);
        state.entered[rank] += 1;

        if state.values.iter().all(Option::is_some) {
            state.result = state
                .values
                .iter_mut()
                .filter_map(Option::take)
                .fold(f64::NEG_INFINITY, f64::max);
            state.round += 1;
            trace!(round, result = state.result, "reduction complete");
            self.shared.turn.notify_all();
        } else {
            while state.round == round {
                if let Some(peer) = state.missing_peer() {
                    return Err(GroupError::PeerDeparted { rank: peer });
                }
                self.shared.turn.wait(&mut state);
            }
        }

        // The next round cannot complete without this member, so `result`
        // still belongs to the round we took part in.
        Ok(self.context.is_coordinator().then_some(state.result))
    }
}

impl ProcessGroup for ThreadMember {
    fn context(&self) -> GroupContext {
        self.context
    }

    fn reduce_max_f32(&self, value: f32) -> GroupResult<Option<f32>> {
        Ok(self.reduce_max(value as f64)?.map(|v| v as f32))
    }

    fn reduce_max_f64(&self, value: f64) -> GroupResult<Option<f64>> {
        self.reduce_max(value)
    }
}

impl Drop for ThreadMember {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.departed[self.context.rank] = true;
        self.shared.turn.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_solo_group() {
        let group = SoloGroup;
        assert!(group.context().is_coordinator());
        assert_eq!(group.context().size, 1);
        assert_eq!(group.reduce_max_f32(3.5).unwrap(), Some(3.5));
        assert_eq!(group.reduce_max_f64(-1.0).unwrap(), Some(-1.0));
    }

    #[test]
    fn test_single_thread_member() {
        let mut members = ThreadGroup::members(1);
        let member = members.pop().unwrap();
        assert_eq!(member.reduce_max_f64(2.0).unwrap(), Some(2.0));
        assert_eq!(member.reduce_max_f32(1.0).unwrap(), Some(1.0));
    }

    #[test]
    fn test_max_reaches_coordinator_only() {
        let members = ThreadGroup::members(4);
        let handles: Vec<_> = members
            .into_iter()
            .map(|member| {
                thread::spawn(move || {
                    let rank = member.context().rank;
                    let first = member.reduce_max_f32(rank as f32 * 1.5).unwrap();
                    let second = member.reduce_max_f64(10.0 - rank as f64).unwrap();
                    (rank, first, second)
                })
            })
            .collect();

        for handle in handles {
            let (rank, first, second) = handle.join().unwrap();
            if rank == COORDINATOR_RANK {
                assert_eq!(first, Some(4.5));
                assert_eq!(second, Some(10.0));
            } else {
                assert_eq!(first, None);
                assert_eq!(second, None);
            }
        }
    }

    #[test]
    fn test_departed_peer_unblocks_coordinator() {
        let mut members = ThreadGroup::members(2);
        let quitter = members.pop().unwrap();
        let coordinator = members.pop().unwrap();

        let waiter = thread::spawn(move || coordinator.reduce_max_f32(1.0));
        drop(quitter);

        assert_eq!(
            waiter.join().unwrap(),
            Err(GroupError::PeerDeparted { rank: 1 })
        );
    }

    #[test]
    fn test_departure_after_completion_is_harmless() {
        let members = ThreadGroup::members(2);
        let handles: Vec<_> = members
            .into_iter()
            .map(|member| {
                thread::spawn(move || {
                    let value = member.reduce_max_f64(member.context().rank as f64)?;
                    if member.context().rank == 1 {
                        drop(member);
                        return Ok(value);
                    }
                    // Rank 0 reads its result after rank 1 may already be gone.
                    thread::yield_now();
                    Ok::<_, GroupError>(value)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], Ok(Some(1.0)));
        assert_eq!(results[1], Ok(None));
    }
}
