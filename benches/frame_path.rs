//! Frame path benchmark suite.
//!
//! Measures the per-message work done on the event loop:
//! - Parsing and summarizing inbound frames
//! - Appending to a full event log
//! - A full command round trip over a loopback socket
//!
//! Run with: cargo bench --bench frame_path
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::time::Duration;

use camera_link::{Client, Command, EventLog, Message, Severity};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::Message as WsMessage;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const FRAMES: &[(&str, &str)] = &[
    ("status", r#"{"type":"status","cameras":[{"id":"cam1"},{"id":"cam2"}]}"#),
    (
        "capture_complete",
        r#"{"type":"capture_complete","camera_id":"cam1","filename":"IMG_0042.JPG","path":"/data"}"#,
    ),
    ("pong", r#"{"type":"pong"}"#),
];

// ============================================================================
// Benchmark: Inbound Parsing
// ============================================================================

fn bench_inbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("inbound");

    for &(name, frame) in FRAMES {
        group.bench_with_input(BenchmarkId::new("parse", name), &frame, |b, frame| {
            b.iter(|| {
                let message = Message::from_frame(black_box(frame)).expect("valid frame");
                black_box(message.parse().log_summary())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Event Log
// ============================================================================

fn bench_event_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_log");

    for &capacity in &[100usize, 1_000] {
        group.bench_with_input(
            BenchmarkId::new("append_full", capacity),
            &capacity,
            |b, &capacity| {
                let mut log = EventLog::new(capacity);
                for i in 0..capacity {
                    log.append(Severity::Info, format!("warmup {i}"), None);
                }
                b.iter(|| {
                    log.append(Severity::Success, "Captured IMG_0042.JPG", Some("cam1".into()));
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: Round Trip
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let client = rt.block_on(async {
        let url = spawn_status_server().await;
        let client = Client::builder()
            .endpoint(url)
            .build()
            .expect("valid config");
        client.connect().await.expect("event loop running");
        client
            .wait_connected(Duration::from_secs(5))
            .await
            .expect("connected");
        client
    });

    let mut group = c.benchmark_group("round_trip");
    group.bench_function("status", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(client.send(Command::status()).await.expect("reply"))
        });
    });
    group.finish();

    rt.block_on(async {
        let _ = client.disconnect().await;
    });
}

/// Loopback server answering every `status` command.
async fn spawn_status_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("ws://{}", listener.local_addr().expect("addr"));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(frame)) = ws.next().await {
                    if let WsMessage::Text(text) = frame
                        && text.contains("\"status\"")
                    {
                        let reply = r#"{"type":"status","cameras":[]}"#;
                        if ws.send(WsMessage::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    url
}

criterion_group!(benches, bench_inbound, bench_event_log, bench_round_trip);
criterion_main!(benches);
