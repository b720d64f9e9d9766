//! The message-passing port consumed by the connectivity and SFC engines.
//!
//! `meshtopo` never depends on a concrete messaging library: callers hand
//! in any `Box<dyn Comm>` implementation (an MPI wrapper, a thread-channel
//! stand-in for tests, ...).

/// Abstract communicator: rank/size plus the two collectives the core
/// actually needs.
pub trait Comm: Send + Sync {
    /// This rank's index in `0..size()`.
    fn rank(&self) -> i32;
    /// Number of ranks participating in the collective.
    fn size(&self) -> i32;
    /// Variable-sized all-to-all exchange: `send[j]` is the payload destined
    /// for rank `j` (including possibly this rank). Returns, at index `j`,
    /// the payload this rank received from rank `j`.
    fn all_to_all_v(&self, send: &[Vec<u8>]) -> Vec<Vec<u8>>;
    /// Collective barrier; all ranks must call it for any to proceed.
    fn barrier(&self);
}

/// Single-rank test doubles and an in-process multi-rank channel
/// communicator, used by this crate's own test suite in place of a real
/// message-passing library.
pub mod testing {
    use super::Comm;
    use std::sync::mpsc::{Receiver, Sender, channel};
    use std::sync::{Arc, Barrier, Mutex};

    /// A communicator for the trivial one-rank-of-one case: every exchange
    /// is the identity and `barrier` is a no-op.
    pub struct SingleRankComm;

    impl Comm for SingleRankComm {
        fn rank(&self) -> i32 {
            0
        }
        fn size(&self) -> i32 {
            1
        }
        fn all_to_all_v(&self, send: &[Vec<u8>]) -> Vec<Vec<u8>> {
            assert_eq!(send.len(), 1, "SingleRankComm only has one rank");
            send.to_vec()
        }
        fn barrier(&self) {}
    }

    /// An in-process communicator for `n` cooperating ranks, wired together
    /// with `std::sync::mpsc` channels. Each rank must run on its own
    /// thread (see [`ChannelComm::spawn_group`]); `all_to_all_v` and
    /// `barrier` genuinely block on the other ranks' participation, the way
    /// a real collective would.
    pub struct ChannelComm {
        rank: i32,
        size: i32,
        senders: Vec<Sender<(i32, Vec<u8>)>>,
        receiver: Mutex<Receiver<(i32, Vec<u8>)>>,
        barrier: Arc<Barrier>,
    }

    impl ChannelComm {
        /// Builds `n` communicators, one per rank, ready to be moved into
        /// `n` worker threads (e.g. via `std::thread::scope`).
        pub fn new_group(n: usize) -> Vec<ChannelComm> {
            let (senders, receivers): (Vec<_>, Vec<_>) =
                (0..n).map(|_| channel::<(i32, Vec<u8>)>()).unzip();
            let barrier = Arc::new(Barrier::new(n));
            receivers
                .into_iter()
                .enumerate()
                .map(|(rank, receiver)| ChannelComm {
                    rank: rank as i32,
                    size: n as i32,
                    senders: senders.clone(),
                    receiver: Mutex::new(receiver),
                    barrier: Arc::clone(&barrier),
                })
                .collect()
        }
    }

    impl Comm for ChannelComm {
        fn rank(&self) -> i32 {
            self.rank
        }
        fn size(&self) -> i32 {
            self.size
        }
        fn all_to_all_v(&self, send: &[Vec<u8>]) -> Vec<Vec<u8>> {
            assert_eq!(send.len(), self.size as usize);
            for (dest, payload) in send.iter().enumerate() {
                self.senders[dest]
                    .send((self.rank, payload.clone()))
                    .expect("peer rank's receiver dropped");
            }
            let mut out = vec![Vec::new(); self.size as usize];
            let receiver = self.receiver.lock().unwrap();
            for _ in 0..self.size {
                let (src, payload) = receiver.recv().expect("peer rank hung up");
                out[src as usize] = payload;
            }
            out
        }
        fn barrier(&self) {
            self.barrier.wait();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn single_rank_identity() {
            let comm = SingleRankComm;
            let out = comm.all_to_all_v(&[vec![1, 2, 3]]);
            assert_eq!(out, vec![vec![1, 2, 3]]);
        }

        #[test]
        fn channel_group_exchanges_payloads() {
            let comms = ChannelComm::new_group(3);
            std::thread::scope(|s| {
                for comm in comms {
                    s.spawn(move || {
                        let my_rank = comm.rank();
                        let send: Vec<Vec<u8>> =
                            (0..comm.size()).map(|j| vec![my_rank as u8, j as u8]).collect();
                        let recv = comm.all_to_all_v(&send);
                        for (src, payload) in recv.iter().enumerate() {
                            assert_eq!(payload, &vec![src as u8, my_rank as u8]);
                        }
                        comm.barrier();
                    });
                }
            });
        }
    }
}
