//! Process-group abstraction for the distributed reduction.
//!
//! The coordinator never talks to a message-passing library directly; it is
//! written against [`Communicator`], which exposes exactly the four
//! capabilities the reduction needs: a rank, a group size, and blocking
//! point-to-point byte exchange. Any reliable transport can sit behind the
//! trait. [`LoopbackGroup`] is the in-process implementation used by tests
//! and by single-machine callers: every rank runs on its own thread with a
//! full mesh of channels, which exercises the identical coordinator code
//! path as a real process group.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use thiserror::Error;

/// A transport failure. Always fatal for the whole computation: the
/// reduction never retries, and a missing peer cannot be compensated for.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The destination rank is not a member of the group.
    #[error("rank {rank} is outside the group of size {size}")]
    NoSuchRank {
        /// The requested peer rank.
        rank: usize,
        /// The group size.
        size: usize,
    },

    /// The peer hung up before the message could be delivered or received.
    #[error("peer rank {rank} disconnected")]
    Disconnected {
        /// The peer that went away.
        rank: usize,
    },
}

/// Point-to-point byte transport between `size()` equally ranked peers.
///
/// `send` and `recv` are the only suspension points of the whole system;
/// everything around them is synchronous computation. Messages between a
/// pair of ranks are delivered reliably and in order. There is no broadcast
/// and no barrier: the reduction tree encodes all ordering it needs.
pub trait Communicator {
    /// This process's rank, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Delivers `payload` to `dst`.
    ///
    /// # Errors
    ///
    /// Fails if `dst` is out of range or has disconnected.
    fn send(&mut self, dst: usize, payload: &[u8]) -> Result<(), TransportError>;

    /// Blocks until a message from `src` arrives.
    ///
    /// # Errors
    ///
    /// Fails if `src` is out of range or disconnected without sending.
    fn recv(&mut self, src: usize) -> Result<Vec<u8>, TransportError>;
}

/// One rank's endpoint of an in-process group: a slot per peer in both
/// directions. The slot at this rank's own index is unused.
pub struct LoopbackComm {
    rank: usize,
    to_peer: Vec<Option<Sender<Vec<u8>>>>,
    from_peer: Vec<Option<Receiver<Vec<u8>>>>,
}

impl Communicator for LoopbackComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.to_peer.len()
    }

    fn send(&mut self, dst: usize, payload: &[u8]) -> Result<(), TransportError> {
        let tx = self
            .to_peer
            .get(dst)
            .ok_or(TransportError::NoSuchRank {
                rank: dst,
                size: self.size(),
            })?
            .as_ref()
            .ok_or(TransportError::Disconnected { rank: dst })?;
        tx.send(payload.to_vec())
            .map_err(|_| TransportError::Disconnected { rank: dst })
    }

    fn recv(&mut self, src: usize) -> Result<Vec<u8>, TransportError> {
        let rx = self
            .from_peer
            .get(src)
            .ok_or(TransportError::NoSuchRank {
                rank: src,
                size: self.size(),
            })?
            .as_ref()
            .ok_or(TransportError::Disconnected { rank: src })?;
        rx.recv().map_err(|_| TransportError::Disconnected { rank: src })
    }
}

/// An in-process group of `size` ranks over a full channel mesh.
pub struct LoopbackGroup;

impl LoopbackGroup {
    /// Builds the endpoints of a `size`-rank group.
    ///
    /// Mostly useful when the caller wants to drive ranks on its own
    /// threads; [`LoopbackGroup::run`] covers the common case.
    #[must_use]
    pub fn endpoints(size: usize) -> Vec<LoopbackComm> {
        assert!(size >= 1, "a group needs at least one rank");
        let mut to_peer: Vec<Vec<Option<Sender<Vec<u8>>>>> = (0..size)
            .map(|_| (0..size).map(|_| None).collect())
            .collect();
        let mut from_peer: Vec<Vec<Option<Receiver<Vec<u8>>>>> = (0..size)
            .map(|_| (0..size).map(|_| None).collect())
            .collect();
        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = channel();
                to_peer[src][dst] = Some(tx);
                from_peer[dst][src] = Some(rx);
            }
        }
        to_peer
            .into_iter()
            .zip(from_peer)
            .enumerate()
            .map(|(rank, (to_peer, from_peer))| LoopbackComm {
                rank,
                to_peer,
                from_peer,
            })
            .collect()
    }

    /// Runs `worker` once per rank on scoped threads and returns the
    /// per-rank results in rank order.
    ///
    /// # Panics
    ///
    /// Propagates a panic from any worker thread.
    pub fn run<T, F>(size: usize, worker: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&mut LoopbackComm) -> T + Send + Sync,
    {
        let endpoints = Self::endpoints(size);
        thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|mut comm| {
                    let worker = &worker;
                    scope.spawn(move || worker(&mut comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(value) => value,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_delivers_in_both_directions() {
        let results = LoopbackGroup::run(2, |comm| {
            if comm.rank() == 0 {
                comm.send(1, b"ping").unwrap();
                comm.recv(1).unwrap()
            } else {
                let msg = comm.recv(0).unwrap();
                assert_eq!(msg, b"ping");
                comm.send(0, b"pong").unwrap();
                msg
            }
        });
        assert_eq!(results[0], b"pong");
        assert_eq!(results[1], b"ping");
    }

    #[test]
    fn messages_between_a_pair_stay_ordered() {
        let results = LoopbackGroup::run(2, |comm| {
            if comm.rank() == 0 {
                for i in 0u8..10 {
                    comm.send(1, &[i]).unwrap();
                }
                Vec::new()
            } else {
                (0u8..10).map(|_| comm.recv(0).unwrap()[0]).collect()
            }
        });
        assert_eq!(results[1], (0u8..10).collect::<Vec<_>>());
    }

    #[test]
    fn out_of_range_ranks_are_rejected() {
        let mut endpoints = LoopbackGroup::endpoints(2);
        let comm = &mut endpoints[0];
        assert_eq!(
            comm.send(5, b"x"),
            Err(TransportError::NoSuchRank { rank: 5, size: 2 })
        );
        assert!(matches!(
            comm.recv(9),
            Err(TransportError::NoSuchRank { rank: 9, size: 2 })
        ));
    }

    #[test]
    fn dropped_peer_surfaces_as_disconnected() {
        let mut endpoints = LoopbackGroup::endpoints(2);
        let peer = endpoints.pop().unwrap();
        drop(peer);
        let comm = &mut endpoints[0];
        assert_eq!(
            comm.send(1, b"x"),
            Err(TransportError::Disconnected { rank: 1 })
        );
        assert_eq!(comm.recv(1), Err(TransportError::Disconnected { rank: 1 }));
    }
}
