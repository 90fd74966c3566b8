//! Benchmarks for the propagation engine and the label grammar.
//!
//! Run:
//! - cargo bench -p singlab_label

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use singlab_label::{Field, PropagationConfig, Segment, Sequence, pitch};

const LENS: [usize; 3] = [100, 1_000, 10_000];
const SYLLABLE: [&str; 3] = ["k", "a", "N"];

/// Producer-style sequence: three phonemes per note, a pause every eight notes.
fn build_sequence(len: usize) -> Sequence {
    let segments = (0..len)
        .map(|i| {
            let note = i / SYLLABLE.len();
            let start = i as u64 * 500_000;
            if note % 8 == 7 {
                return Segment::with_phoneme(start, start + 500_000, "pau");
            }
            let mut s = Segment::with_phoneme(start, start + 500_000, SYLLABLE[i % SYLLABLE.len()]);
            s.phoneme.flag_current = Field::new("00");
            s.syllable_cur.phoneme_count = Field::int(SYLLABLE.len());
            s.syllable_cur.language_context = Field::int(note);
            s.note_cur.note.absolute_pitch = Field::new(pitch::note_name(60 + (note % 12) as u8));
            s.note_cur.note.user = Field::int(note);
            s.phrase_cur.syllable_count = Field::int(note / 8);
            s
        })
        .collect();
    Sequence::from_segments(segments)
}

fn bench_propagate(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate");
    group.sample_size(30);
    let config = PropagationConfig::default();

    for &len in &LENS {
        let seq = build_sequence(len);
        let id = BenchmarkId::new("fresh", len);
        group.bench_with_input(id, &seq, |b, seq| {
            b.iter(|| {
                let mut seq = seq.clone();
                black_box(seq.propagate(&config));
            });
        });
    }

    group.finish();
}

fn bench_grammar(c: &mut Criterion) {
    let mut group = c.benchmark_group("grammar");
    group.sample_size(30);

    for &len in &LENS {
        let mut seq = build_sequence(len);
        seq.propagate(&PropagationConfig::default());
        let text = seq.serialize();

        group.bench_with_input(BenchmarkId::new("serialize", len), &seq, |b, seq| {
            b.iter(|| black_box(seq.serialize()));
        });
        group.bench_with_input(BenchmarkId::new("load", len), &text, |b, text| {
            b.iter(|| black_box(Sequence::load(text.lines())));
        });
    }

    group.finish();
}

criterion_group!(propagate, bench_propagate, bench_grammar);
criterion_main!(propagate);
