//! Property-based tests for the memory and routing primitives.

use proptest::prelude::*;

use caudal_core::{Block, BlockPool, BlockQueue};
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Any interleaving of retains and releases balances out: once every
    /// handle is gone the pool is back at its starting occupancy.
    #[test]
    fn refcount_balance_for_any_clone_order(ops in prop::collection::vec(any::<bool>(), 0..32)) {
        let pool = BlockPool::new();
        let block = pool.acquire().unwrap();
        let mut handles: Vec<Block> = vec![block];

        for grow in ops {
            if grow {
                let copy = handles[0].clone();
                handles.push(copy);
            } else if handles.len() > 1 {
                handles.swap_remove(handles.len() / 2);
            }
            prop_assert_eq!(handles[0].refcount() as usize, handles.len());
            // One descriptor serves every handle.
            prop_assert_eq!(pool.in_use(), 1);
        }

        handles.clear();
        prop_assert_eq!(pool.in_use(), 0);
    }

    /// Queues deliver every block exactly once and in order.
    #[test]
    fn queue_preserves_any_sequence(values in prop::collection::vec(any::<i16>(), 1..24)) {
        let pool = BlockPool::with_capacity(24);
        let queue = BlockQueue::unbounded();

        for &v in &values {
            let mut block = pool.acquire().unwrap();
            block.samples_mut().unwrap()[0] = v;
            queue.put(block);
        }

        for &v in &values {
            let block = queue.take(Duration::from_millis(100)).unwrap();
            prop_assert_eq!(block.samples()[0], v);
        }
        prop_assert!(queue.is_empty());
        prop_assert_eq!(pool.in_use(), 0);
    }

    /// Copy-on-write always leaves both sides with private, equal data.
    #[test]
    fn cow_preserves_data_for_any_contents(values in prop::collection::vec(any::<i16>(), 1..128)) {
        let pool = BlockPool::new();
        let mut block = pool.acquire().unwrap();
        {
            let samples = block.samples_mut().unwrap();
            for (dst, &v) in samples.iter_mut().zip(values.iter().cycle()) {
                *dst = v;
            }
        }

        let original = block.clone();
        block.make_writable().unwrap();

        prop_assert_eq!(block.refcount(), 1);
        prop_assert_eq!(original.refcount(), 1);
        prop_assert_eq!(block.samples(), original.samples());
    }
}
