#![cfg(not(loom))]
//! The same suite runs on every buffer implementation.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use drain_buffer::{
    AnyBuffer, Buffer, ConcurrentBuffer, GuardedSwapBuffer, MutexBuffer, SpinLockBuffer, Strategy,
    SwapBuffer,
};
use quickcheck_macros::quickcheck;
use rand::Rng;

const MAX_WAIT: Duration = Duration::from_millis(100);
const DEADLOCK_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort_unstable();
    items
}

async fn random_delay() {
    let delay = rand::thread_rng().gen_range(Duration::ZERO..MAX_WAIT);
    tokio::time::sleep(delay).await;
}

async fn concurrent_adds<B>(buffer: Arc<B>, values: Vec<u32>)
where
    B: ConcurrentBuffer<u32> + 'static,
{
    let tasks: Vec<_> = values
        .into_iter()
        .map(|v| {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.add(v) })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
}

/// Adds `0..count` in chunks of 10, item by item or by range, while `flushes` tasks flush the
/// buffer concurrently; returns the result of every flush, the final one included.
async fn flush_while_adding<B>(buffer: Arc<B>, count: u32, flushes: usize) -> Vec<Vec<u32>>
where
    B: ConcurrentBuffer<u32> + 'static,
{
    let flushed = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    let values: Vec<_> = (0..count).collect();
    for chunk in values.chunks(10) {
        let buffer = buffer.clone();
        let chunk = chunk.to_vec();
        tasks.push(tokio::spawn(async move {
            random_delay().await;
            if rand::random() {
                for v in chunk {
                    buffer.add(v);
                }
            } else {
                buffer.add_range(chunk);
            }
        }));
    }
    for _ in 0..flushes {
        let buffer = buffer.clone();
        let flushed = flushed.clone();
        tasks.push(tokio::spawn(async move {
            random_delay().await;
            let items = buffer.flush();
            flushed.lock().unwrap().push(items);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let mut flushed = Arc::try_unwrap(flushed).unwrap().into_inner().unwrap();
    flushed.push(buffer.flush());
    flushed
}

macro_rules! conformance {
    ($module:ident, $buffer:ident, lossless = $lossless:expr) => {
        mod $module {
            use super::*;

            fn buffer<T>() -> $buffer<T> {
                Default::default()
            }

            #[test]
            fn flush_after_add_returns_added_item() {
                let buffer = buffer();
                for expected in [1, 2, 3, 4, 10] {
                    buffer.add(expected);
                    assert_eq!(buffer.flush(), vec![expected]);
                }
            }

            #[quickcheck]
            fn add_then_flush_returns_item(item: String) -> bool {
                let buffer = buffer();
                buffer.add(item.clone());
                buffer.flush() == vec![item]
            }

            #[quickcheck]
            fn add_range_then_flush_returns_all_items(items: Vec<i32>) -> bool {
                let buffer = buffer();
                buffer.add_range(items.clone());
                sorted(buffer.flush()) == sorted(items)
            }

            #[quickcheck]
            fn flush_after_flush_is_empty(items: Vec<i32>) -> bool {
                let buffer = buffer();
                buffer.add_range(items);
                buffer.flush();
                buffer.flush().is_empty()
            }

            #[test]
            fn empty_add_range() {
                let buffer = buffer::<u8>();
                buffer.add_range([]);
                assert!(buffer.is_empty());
                assert!(buffer.flush().is_empty());
            }

            #[test]
            fn len_tracks_current_epoch() {
                let buffer = buffer();
                buffer.add_range(0..3);
                buffer.add(3);
                assert_eq!(buffer.len(), 4);
                buffer.flush();
                assert_eq!(buffer.len(), 0);
            }

            #[test]
            fn disjoint_producers_then_single_flush() {
                let buffer = Arc::new(buffer());
                let producers: Vec<_> = (0..10)
                    .map(|i| {
                        let buffer = buffer.clone();
                        std::thread::spawn(move || {
                            for v in i * 100 + 1..=(i + 1) * 100 {
                                buffer.add(v);
                            }
                        })
                    })
                    .collect();
                for producer in producers {
                    producer.join().unwrap();
                }
                assert_eq!(sorted(buffer.flush()), (1..=1000).collect::<Vec<_>>());
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_adds_are_all_flushed() {
                init_tracing();
                for count in [1, 2, 5, 10, 50] {
                    let buffer = Arc::new(buffer());
                    concurrent_adds(buffer.clone(), (0..count).collect()).await;
                    assert_eq!(sorted(buffer.flush()), (0..count).collect::<Vec<_>>());
                }
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_add_ranges_are_all_flushed() {
                init_tracing();
                for count in [100u32, 1000, 5000] {
                    let buffer = Arc::new(buffer());
                    let tasks: Vec<_> = (0..count)
                        .step_by(5)
                        .map(|start| {
                            let buffer = buffer.clone();
                            tokio::spawn(async move { buffer.add_range(start..start + 5) })
                        })
                        .collect();
                    for task in tasks {
                        task.await.unwrap();
                    }
                    assert_eq!(sorted(buffer.flush()), (0..count).collect::<Vec<_>>());
                }
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn flush_while_adding_conserves_items() {
                init_tracing();
                for (count, flushes) in [(100, 2), (1000, 10), (1500, 50), (5000, 120)] {
                    let buffer = Arc::new(buffer());
                    let flushed = tokio::time::timeout(
                        DEADLOCK_TIMEOUT,
                        flush_while_adding(buffer, count, flushes),
                    )
                    .await
                    .expect("deadlock");
                    let mut seen = HashSet::new();
                    for item in flushed.into_iter().flatten() {
                        assert!(item < count, "unknown item {item}");
                        assert!(seen.insert(item), "item {item} flushed twice");
                    }
                    if $lossless {
                        assert_eq!(seen.len(), count as usize);
                    } else {
                        tracing::info!(lost = count as usize - seen.len(), "items lost");
                    }
                }
            }
        }
    };
}

conformance!(mutex, MutexBuffer, lossless = true);
conformance!(spin_lock, SpinLockBuffer, lossless = true);
conformance!(swap, SwapBuffer, lossless = false);
conformance!(guarded_swap, GuardedSwapBuffer, lossless = true);

#[test]
fn any_buffer_conforms() {
    for strategy in Strategy::ALL {
        let buffer: AnyBuffer<u32> = strategy.build();
        buffer.add(0);
        buffer.add_range(1..10);
        assert_eq!(sorted(buffer.flush()), (0..10).collect::<Vec<_>>());
        assert!(buffer.flush().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn any_buffer_is_shareable() {
    for strategy in Strategy::ALL.into_iter().filter(|s| s.is_lossless()) {
        let buffer = Arc::new(strategy.build::<u32>());
        let flushed = flush_while_adding(buffer, 1000, 10).await;
        let items = sorted(flushed.into_iter().flatten().collect());
        assert_eq!(items, (0..1000).collect::<Vec<_>>(), "{strategy}");
    }
}
