use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizforge_core::model::{ReviewCard, DAY_MS};
use quizforge_core::scheduler::{due_cards, grade, initialize, Grade};

const T0: i64 = 1_700_000_000_000;

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade");
    let card = initialize("q", T0);

    for g in [Grade::Again, Grade::Good, Grade::Easy] {
        group.bench_function(g.to_string(), |b| {
            b.iter(|| grade(black_box(&card), black_box(g), black_box(T0)))
        });
    }

    group.bench_function("sequence_of_20", |b| {
        b.iter(|| {
            let mut card = initialize("q", T0);
            for step in 0..20 {
                let g = if step % 4 == 0 { Grade::Again } else { Grade::Good };
                card = grade(&card, g, T0 + step * DAY_MS);
            }
            card
        })
    });

    group.finish();
}

fn bench_due_cards(c: &mut Criterion) {
    let cards: Vec<ReviewCard> = (0..5_000)
        .map(|i| ReviewCard {
            due_at: T0 + (i % 30) * DAY_MS,
            ..initialize(&format!("q{i}"), T0)
        })
        .collect();

    c.bench_function("due_cards/5000", |b| {
        b.iter(|| due_cards(black_box(&cards), black_box(T0 + 10 * DAY_MS)).len())
    });
}

criterion_group!(benches, bench_grade, bench_due_cards);
criterion_main!(benches);
