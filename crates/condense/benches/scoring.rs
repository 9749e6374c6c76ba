use chrono::{Duration, Utc};
use condense_core::{Message, RelevanceScorer, Role, UserPreferences};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn sample_messages(count: usize) -> Vec<Message> {
    let now = Utc::now();
    (0..count)
        .map(|i| Message {
            id: format!("m{i}"),
            user_id: "u1".to_string(),
            thread_id: "t1".to_string(),
            session_id: None,
            role: if i % 2 == 0 { Role::User } else { Role::Assistant },
            content: format!(
                "Message {i}: we decided to update product prices and approved the new inventory plan"
            ),
            timestamp: now - Duration::minutes(i as i64 * 7),
            relevance_score: None,
            compressed: None,
        })
        .collect()
}

fn bench_score_100_messages(c: &mut Criterion) {
    let scorer = RelevanceScorer::new();
    let messages = sample_messages(100);
    let now = Utc::now();

    c.bench_function("score_100_messages", |b| {
        b.iter(|| {
            for message in &messages {
                scorer.score_at(message, black_box(Some("update_product_prices")), None, now);
            }
        });
    });
}

fn bench_score_with_preferences(c: &mut Criterion) {
    let scorer = RelevanceScorer::new();
    let messages = sample_messages(100);
    let preferences = UserPreferences {
        focus_keywords: vec!["inventory".to_string(), "discount".to_string()],
    };
    let now = Utc::now();

    c.bench_function("score_100_messages_with_preferences", |b| {
        b.iter(|| {
            for message in &messages {
                scorer.score_at(
                    message,
                    black_box(Some("update_product_prices")),
                    Some(&preferences),
                    now,
                );
            }
        });
    });
}

criterion_group!(benches, bench_score_100_messages, bench_score_with_preferences);
criterion_main!(benches);
