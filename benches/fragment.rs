//! Benchmarks for fragment writing and segment packaging.
//!
//! Measures moof+mdat serialization and the full publish path.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use llhls::config::{SegmenterConfig, SynthConfig};
use llhls::streaming::{tracks, Publisher, SyntheticSource};
use llhls_media::{write_fragment, Packet, TrackFragmenter, TrackKind};

/// Benchmark serializing one track fragment of `samples` frames.
fn bench_write_fragment(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_fragment");

    for samples in [10usize, 60, 300] {
        let frame_size = 4096;
        group.throughput(Throughput::Bytes((samples * frame_size) as u64));
        group.bench_function(format!("video_{}", samples), |b| {
            b.iter_batched(
                || {
                    let mut track =
                        TrackFragmenter::new(1, TrackKind::Video, 90000, 90000).unwrap();
                    for i in 0..=samples as u64 {
                        track.write_packet(Packet::new(i * 3000, vec![0u8; frame_size], i == 0));
                    }
                    track.make_fragment().unwrap().unwrap()
                },
                |fragment| {
                    let mut out = Vec::with_capacity(samples * frame_size + 1024);
                    write_fragment(&mut out, vec![fragment], 1).unwrap();
                    black_box(out)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark packaging ten seconds of synthetic audio and video.
fn bench_publish(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let segmenter = SegmenterConfig {
        work_dir: Some(dir.path().to_path_buf()),
        segment_duration_ms: 2000,
        part_duration_ms: 500,
        ..Default::default()
    };
    let synth = SynthConfig::default();

    c.bench_function("publish_10s", |b| {
        b.iter(|| {
            let mut publisher = Publisher::new(&segmenter, tracks(&synth).unwrap(), None);
            for (track, packet) in SyntheticSource::new(synth.clone(), 10) {
                publisher.write_packet(track, packet).unwrap();
            }
            publisher.finish().unwrap();
            black_box(publisher.playlist())
        });
    });
}

criterion_group!(benches, bench_write_fragment, bench_publish);
criterion_main!(benches);
