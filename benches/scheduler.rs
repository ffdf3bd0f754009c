//! Benchmark for placement scheduling
//!
//! Scheduling runs once per CreateVolume over every node in the cluster,
//! so it should stay cheap at a few thousand nodes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zfs_localpv_controller::allocation::{Candidate, CandidateMap, ScheduleRequest};
use zfs_localpv_controller::{normalize_capacity, schedule, SchedulerPolicy, GIB};

fn candidates(nodes: usize) -> CandidateMap {
    (0..nodes)
        .map(|i| {
            let node_id = format!("node-{:05}", i);
            let candidate = Candidate {
                node_id: node_id.clone(),
                pool_name: if i % 4 == 0 { "fast-pool" } else { "zfspv-pool" }.to_string(),
                free_bytes: ((i % 97) as u64 + 1) * GIB,
                volume_count: (i % 13) as u64,
            };
            (node_id, candidate)
        })
        .collect()
}

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");

    for nodes in [100usize, 1_000, 5_000] {
        let map = candidates(nodes);
        group.throughput(Throughput::Elements(nodes as u64));

        for policy in [SchedulerPolicy::VolumeWeighted, SchedulerPolicy::CapacityWeighted] {
            let request = ScheduleRequest {
                capacity_bytes: 10 * GIB,
                pool_name: Some("zfspv-pool"),
                policy,
            };
            group.bench_with_input(
                BenchmarkId::new(policy.to_string(), nodes),
                &map,
                |b, map| b.iter(|| schedule(black_box(&request), black_box(map))),
            );
        }
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_capacity", |b| {
        let mut bytes = 1u64;
        b.iter(|| {
            bytes = bytes.wrapping_mul(6364136223846793005).wrapping_add(1) >> 24;
            normalize_capacity(black_box(bytes))
        });
    });
}

criterion_group!(benches, bench_schedule, bench_normalize);
criterion_main!(benches);
