use std::time::Duration;

use sync_primitives::tracing::setup_tracing;
use sync_sims::{BufferedPipeline, DelayRange, PipelineConfig, SimError, SimEvent};
use tokio::sync::broadcast::error::TryRecvError;
use tokio_util::sync::CancellationToken;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

fn fast_config(capacity: usize, producers: usize, consumers: usize) -> PipelineConfig {
    PipelineConfig {
        capacity,
        producers,
        consumers,
        produce_delay: DelayRange::new(0, 2),
        consume_delay: DelayRange::new(0, 3),
        ..PipelineConfig::default()
    }
}

fn drain_events(events: &mut tokio::sync::broadcast::Receiver<SimEvent>) -> Vec<SimEvent> {
    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return seen,
            Err(TryRecvError::Lagged(n)) => panic!("listener lagged by {n} events"),
        }
    }
}

/// Producers with quotas finish on their own; the last one closes the channel and the
/// consumers drain it and stop at end-of-stream without any cancellation.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_quota_run_drains_and_stops() {
    setup_tracing();
    let config = PipelineConfig {
        items_per_producer: Some(10),
        ..fast_config(3, 2, 3)
    };
    let mut pipeline = BufferedPipeline::with_config(config).unwrap();
    let mut events = pipeline.subscribe();

    pipeline.start(CancellationToken::new()).unwrap();
    pipeline.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();

    let stats = pipeline.statistics();
    assert_eq!(stats.total_produced, 20);
    assert_eq!(stats.total_consumed, 20);
    assert_eq!(stats.buffered, 0);
    assert!(stats.producers.iter().all(|p| p.items == 10));
    assert!(stats.average_lifetime_ms.is_some());
    assert!(pipeline.channel().is_completed());

    let closed = drain_events(&mut events)
        .into_iter()
        .filter(|e| *e == SimEvent::ChannelClosed)
        .count();
    assert_eq!(closed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_producer_order_reaches_consumer() {
    setup_tracing();
    let config = PipelineConfig {
        items_per_producer: Some(50),
        ..fast_config(4, 1, 1)
    };
    let mut pipeline = BufferedPipeline::with_config(config).unwrap();
    let mut events = pipeline.subscribe();

    pipeline.start(CancellationToken::new()).unwrap();
    pipeline.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();

    let consumed: Vec<u64> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SimEvent::ItemConsumed { item, .. } => Some(item),
            _ => None,
        })
        .collect();
    assert_eq!(consumed, (1..=50).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_backpressure_bounds_the_buffer() {
    setup_tracing();
    let config = PipelineConfig {
        consume_delay: DelayRange::new(10, 20),
        ..fast_config(2, 3, 1)
    };
    let mut pipeline = BufferedPipeline::with_config(config).unwrap();
    let mut events = pipeline.subscribe();
    let cancel = CancellationToken::new();
    pipeline.start(cancel.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    pipeline.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();

    for event in drain_events(&mut events) {
        match event {
            SimEvent::ItemProduced { buffered, .. } | SimEvent::ItemConsumed { buffered, .. } => {
                assert!(buffered <= 2)
            }
            _ => {}
        }
    }
    let stats = pipeline.statistics();
    assert!(stats.buffered <= 2);
    assert!(stats.total_produced <= stats.total_consumed + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_stops_unbounded_run() {
    setup_tracing();
    let mut pipeline = BufferedPipeline::with_config(fast_config(5, 2, 2)).unwrap();
    let cancel = CancellationToken::new();
    pipeline.start(cancel.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    pipeline.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();

    let stats = pipeline.statistics();
    assert!(stats.total_produced > 0);
    assert_eq!(stats.total_produced, stats.total_consumed + stats.buffered as u64);
    assert!(pipeline.producers().iter().all(|p| !p.is_running()));
    assert!(pipeline.consumers().iter().all(|c| !c.is_running()));
}

#[tokio::test]
async fn test_manual_close_lets_consumers_finish() {
    setup_tracing();
    let mut pipeline = BufferedPipeline::with_config(fast_config(5, 1, 2)).unwrap();
    pipeline.start(CancellationToken::new()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    pipeline.close_for_writing();
    pipeline.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();

    let stats = pipeline.statistics();
    assert_eq!(stats.total_produced, stats.total_consumed);
    assert_eq!(stats.buffered, 0);
}

#[tokio::test]
async fn test_lifecycle_guards_and_invalid_sizes() {
    assert!(BufferedPipeline::new(0).is_err());
    assert!(BufferedPipeline::with_config(PipelineConfig {
        producers: 0,
        ..PipelineConfig::default()
    })
    .is_err());

    let mut pipeline = BufferedPipeline::new(2).unwrap();
    assert_eq!(pipeline.wait_all().await, Err(SimError::NotStarted));

    let cancel = CancellationToken::new();
    pipeline.start(cancel.clone()).unwrap();
    assert_eq!(pipeline.start(cancel.clone()), Err(SimError::AlreadyStarted));
    cancel.cancel();
    pipeline.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();
}

#[test]
fn test_statistics_serialize() {
    let pipeline = BufferedPipeline::new(4).unwrap();
    let json = serde_json::to_value(pipeline.statistics()).unwrap();

    assert_eq!(json["capacity"], 4);
    assert_eq!(json["producers"][0]["name"], "Producer-1");
    assert!(json["average_lifetime_ms"].is_null());
}
