use std::{sync::Arc, thread};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use drain_buffer::{Buffer, Strategy};

const ITEMS_PER_PRODUCER: usize = 10_000;

fn producers_with_flusher(c: &mut Criterion) {
    let mut group = c.benchmark_group("producers_with_flusher");
    for producers in [1, 4, 8] {
        group.throughput(Throughput::Elements((producers * ITEMS_PER_PRODUCER) as u64));
        for strategy in Strategy::ALL {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), producers),
                &producers,
                |b, &producers| {
                    b.iter(|| {
                        let buffer = Arc::new(strategy.build::<usize>());
                        let handles: Vec<_> = (0..producers)
                            .map(|_| {
                                let buffer = buffer.clone();
                                thread::spawn(move || {
                                    for i in 0..ITEMS_PER_PRODUCER {
                                        buffer.add(i);
                                    }
                                })
                            })
                            .collect();
                        let mut flushed = 0;
                        while handles.iter().any(|h| !h.is_finished()) {
                            flushed += buffer.flush().len();
                        }
                        for handle in handles {
                            handle.join().unwrap();
                        }
                        flushed + buffer.flush().len()
                    });
                },
            );
        }
    }
    group.finish();
}

fn add_range_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_range_batches");
    for strategy in Strategy::ALL {
        group.bench_function(strategy.name(), |b| {
            let buffer = strategy.build::<usize>();
            b.iter(|| {
                for start in (0..ITEMS_PER_PRODUCER).step_by(100) {
                    buffer.add_range(start..start + 100);
                }
                buffer.flush().len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, producers_with_flusher, add_range_batches);
criterion_main!(benches);
