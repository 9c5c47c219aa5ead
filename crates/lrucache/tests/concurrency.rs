// ==============================================
// LRU CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// Many threads against one shared cache. Each operation must be atomic with
// respect to the others, so the index and recency list stay in step and the
// capacity bound holds throughout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lrucache::LruCache;

const THREADS: usize = 8;
const OPS_PER_THREAD: u64 = 5_000;

#[test]
fn concurrent_mixed_ops_preserve_invariants() {
    let cache: Arc<LruCache<u64, u64>> = Arc::new(LruCache::new(128));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as u64)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPS_PER_THREAD {
                    let key = (t * 31 + i * 7) % 512;
                    match i % 4 {
                        0 | 1 => cache.set(key, key * 2),
                        2 => {
                            if let Some(value) = cache.get(&key) {
                                assert_eq!(value, key * 2);
                            }
                        }
                        _ => {
                            cache.remove(&key);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= 128);
    cache.check_invariants().unwrap();
}

#[test]
fn capacity_bound_holds_while_writers_run() {
    let cache: Arc<LruCache<u64, u64>> = Arc::new(LruCache::new(16));
    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let writers: Vec<_> = (0..THREADS as u64)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPS_PER_THREAD {
                    cache.set(t * OPS_PER_THREAD + i, i);
                }
            })
        })
        .collect();

    let observer = {
        let cache = Arc::clone(&cache);
        let done = Arc::clone(&done);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            while !done.load(Ordering::Acquire) {
                assert!(cache.len() <= 16);
                cache.check_invariants().unwrap();
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    observer.join().unwrap();

    assert_eq!(cache.len(), 16);
}

#[test]
fn stats_account_for_every_write() {
    let cache: Arc<LruCache<u64, u64>> = Arc::new(LruCache::new(32));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as u64)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // Disjoint key ranges: every write is a fresh insert
                for i in 0..1_000 {
                    cache.set(t * 1_000 + i, i);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats().snapshot();
    assert_eq!(stats.inserts, THREADS as u64 * 1_000);
    assert_eq!(stats.updates, 0);
    assert_eq!(stats.evictions, stats.inserts - cache.len() as u64);
}

#[test]
fn hot_key_survives_cold_scan() {
    let cache: Arc<LruCache<u64, u64>> = Arc::new(LruCache::new(8));
    cache.set(0, 0);

    // Keep key 0 hot between each scan insert; it must never be the tail
    // when an insert overflows.
    for i in 1..1_000 {
        assert_eq!(cache.get(&0), Some(0));
        cache.set(i, i);
    }

    assert!(cache.contains(&0));
}
