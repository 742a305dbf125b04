//! Lane queue integration tests
//!
//! Exercise the public queue API end to end with a scripted executor.

use std::sync::Arc;
use std::time::Duration;

use laneq::domain::{TaskOptions, TaskStatus};
use laneq::error::LaneError;
use laneq::executor::MockExecutor;
use laneq::queue::{LaneConfig, LaneKind, LaneQueue, QueueConfig, RetryBackoff};

const WAIT: Duration = Duration::from_secs(10);

fn config() -> QueueConfig {
    QueueConfig::default()
        .with_tick_interval(Duration::from_millis(10))
        .with_backoff(RetryBackoff::new(Duration::from_millis(5), Duration::from_millis(20)))
}

fn start(mock: MockExecutor) -> (LaneQueue, Arc<MockExecutor>) {
    let mock = Arc::new(mock);
    let queue = LaneQueue::new(mock.clone(), config()).unwrap();
    (queue, mock)
}

#[tokio::test]
async fn test_parallel_lane_respects_concurrency_limit() {
    let (queue, mock) = start(MockExecutor::new().with_delay(Duration::from_millis(40)));

    let ids: Vec<String> = (0..12)
        .map(|i| {
            queue
                .enqueue("code-writer", &format!("job-{}", i), "parallel", "s", TaskOptions::new())
                .unwrap()
        })
        .collect();

    for id in &ids {
        let record = queue.wait_for(id, WAIT).await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
    }

    assert!(mock.peak_concurrency() <= 4, "peak was {}", mock.peak_concurrency());
    assert!(mock.peak_concurrency() >= 2);
    assert_eq!(mock.call_count(), 12);
}

#[tokio::test]
async fn test_serial_lane_runs_one_at_a_time() {
    let (queue, mock) = start(MockExecutor::new().with_delay(Duration::from_millis(15)));

    let ids: Vec<String> = (0..5)
        .map(|i| {
            queue
                .enqueue("planner", &format!("plan-{}", i), "planner", "s", TaskOptions::new())
                .unwrap()
        })
        .collect();
    for id in &ids {
        queue.wait_for(id, WAIT).await.unwrap();
    }

    assert_eq!(mock.peak_concurrency(), 1);
    assert_eq!(queue.get_lane_status("planner").unwrap().kind, LaneKind::Serial);
}

#[tokio::test]
async fn test_priority_then_fifo_within_lane() {
    let (queue, mock) = start(MockExecutor::new());
    queue.pause_lane("main").unwrap();

    let opts = |p: i32| TaskOptions::new().with_priority(p);
    let ids = [
        queue.enqueue("a", "low", "main", "s", opts(1)).unwrap(),
        queue.enqueue("a", "mid-1", "main", "s", opts(5)).unwrap(),
        queue.enqueue("a", "high", "main", "s", opts(9)).unwrap(),
        queue.enqueue("a", "mid-2", "main", "s", opts(5)).unwrap(),
    ];

    queue.resume_lane("main").unwrap();
    for id in &ids {
        queue.wait_for(id, WAIT).await.unwrap();
    }

    let order: Vec<String> = mock.calls().into_iter().map(|c| c.input).collect();
    assert_eq!(order, vec!["high", "mid-1", "mid-2", "low"]);
}

#[tokio::test]
async fn test_dependency_across_lanes_and_forward_reference() {
    let (queue, _) = start(MockExecutor::new().with_key_delay("parent", Duration::from_millis(50)));

    // Child declared before its parent exists
    let child = queue
        .enqueue("tester", "child", "parallel", "s", TaskOptions::new().depends_on("parent-task"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(queue.get_task(&child).unwrap().status, TaskStatus::Queued);

    let parent = queue
        .enqueue("code-writer", "parent", "main", "s", TaskOptions::new().with_id("parent-task"))
        .unwrap();

    let child = queue.wait_for(&child, WAIT).await.unwrap();
    let parent = queue.wait_for(&parent, WAIT).await.unwrap();

    assert_eq!(child.status, TaskStatus::Completed);
    let parent_done = parent.completed_at.unwrap();
    let child_started = child.started_at.unwrap();
    assert!(child_started >= parent_done);
}

#[tokio::test]
async fn test_failed_dependency_blocks_dependent() {
    let (queue, mock) = start(MockExecutor::new().always_fail("parent", "Syntax error"));

    let parent_id = queue
        .enqueue("a", "parent", "main", "s", TaskOptions::new().with_max_retries(0))
        .unwrap();
    let child = queue
        .enqueue("a", "child", "main", "s", TaskOptions::new().depends_on(parent_id.clone()))
        .unwrap();

    let parent = queue.wait_for(&parent_id, WAIT).await.unwrap();
    assert_eq!(parent.status, TaskStatus::Failed);

    // A failed task cannot be cancelled and keeps its error
    assert!(!queue.cancel(&parent_id));
    let parent = queue.get_task(&parent_id).unwrap();
    assert_eq!(parent.status, TaskStatus::Failed);
    assert_eq!(parent.error.as_deref(), Some("Syntax error"));

    let err = queue.wait_for(&child, Duration::from_millis(100)).await.unwrap_err();
    assert!(matches!(err, LaneError::WaitTimeout { .. }));
    assert_eq!(mock.calls_for("child"), 0);

    // The caller can still cancel the stuck dependent
    assert!(queue.cancel(&child));
    let child = queue.wait_for(&child, WAIT).await.unwrap();
    assert_eq!(child.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn test_cancelled_dependency_never_satisfies() {
    let (queue, mock) = start(MockExecutor::new());
    queue.pause_lane("main").unwrap();

    let parent = queue.enqueue("a", "parent", "main", "s", TaskOptions::new()).unwrap();
    let child = queue
        .enqueue("a", "child", "parallel", "s", TaskOptions::new().depends_on(parent.clone()))
        .unwrap();

    assert!(queue.cancel(&parent));
    queue.resume_lane("main").unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(queue.get_task(&child).unwrap().status, TaskStatus::Queued);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_retry_counts() {
    let (queue, mock) = start(
        MockExecutor::new()
            .fail_times("recovers", 2, "Network error")
            .always_fail("exhausts", "Network error"),
    );

    let recovers = queue
        .enqueue("a", "recovers", "parallel", "s", TaskOptions::new().with_max_retries(3))
        .unwrap();
    let exhausts = queue
        .enqueue("a", "exhausts", "parallel", "s", TaskOptions::new().with_max_retries(3))
        .unwrap();

    let recovers = queue.wait_for(&recovers, WAIT).await.unwrap();
    let exhausts = queue.wait_for(&exhausts, WAIT).await.unwrap();

    assert_eq!(recovers.status, TaskStatus::Completed);
    assert!(recovers.retry_count < recovers.max_retries);

    assert_eq!(exhausts.status, TaskStatus::Failed);
    assert_eq!(exhausts.retry_count, 3);
    // maxRetries + 1 attempts
    assert_eq!(mock.calls_for("exhausts"), 4);
}

#[tokio::test]
async fn test_task_in_backoff_can_be_cancelled() {
    let mock = Arc::new(MockExecutor::new().always_fail("flaky", "Network error"));
    let config = config().with_backoff(RetryBackoff::new(Duration::from_secs(5), Duration::from_secs(5)));
    let queue = LaneQueue::new(mock.clone(), config).unwrap();

    let id = queue
        .enqueue("a", "flaky", "main", "s", TaskOptions::new().with_max_retries(2))
        .unwrap();

    // Wait for the first attempt to fail and the task to be requeued
    let mut waited = Duration::ZERO;
    while queue.get_task(&id).unwrap().retry_count == 0 && waited < WAIT {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }

    let record = queue.get_task(&id).unwrap();
    assert_eq!(record.status, TaskStatus::Queued);
    assert_eq!(record.retry_count, 1);

    assert!(queue.cancel(&id));
    assert_eq!(queue.get_task(&id).unwrap().status, TaskStatus::Cancelled);
    assert_eq!(mock.calls_for("flaky"), 1);
}

#[tokio::test]
async fn test_pause_does_not_stop_running_tasks() {
    let (queue, _) = start(MockExecutor::new().with_delay(Duration::from_millis(60)));

    let first = queue.enqueue("a", "first", "main", "s", TaskOptions::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.pause_lane("main").unwrap();
    let second = queue.enqueue("a", "second", "main", "s", TaskOptions::new()).unwrap();

    let first = queue.wait_for(&first, WAIT).await.unwrap();
    assert_eq!(first.status, TaskStatus::Completed);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let status = queue.get_lane_status("main").unwrap();
    assert!(status.paused);
    assert_eq!(status.queued, 1);
    assert_eq!(queue.get_task(&second).unwrap().status, TaskStatus::Queued);

    queue.resume_lane("main").unwrap();
    let second = queue.wait_for(&second, WAIT).await.unwrap();
    assert_eq!(second.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_clear_lane_keeps_running_task() {
    let (queue, _) = start(MockExecutor::new().with_delay(Duration::from_millis(60)));

    let running = queue.enqueue("a", "running", "main", "s", TaskOptions::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.enqueue("a", "queued-1", "main", "s", TaskOptions::new()).unwrap();
    queue.enqueue("a", "queued-2", "main", "s", TaskOptions::new()).unwrap();

    assert_eq!(queue.clear_lane("main").unwrap(), 2);

    let running = queue.wait_for(&running, WAIT).await.unwrap();
    assert_eq!(running.status, TaskStatus::Completed);
    assert_eq!(queue.list_tasks(Some("main")).len(), 1);
}

#[tokio::test]
async fn test_stats_and_lane_status() {
    let mock = Arc::new(MockExecutor::new().always_fail("bad", "Unauthorized"));
    let config = config().with_lane(LaneConfig::new("gpu", 2));
    let queue = LaneQueue::new(mock, config).unwrap();

    let ok = queue.enqueue("a", "good", "gpu", "s", TaskOptions::new()).unwrap();
    let bad = queue
        .enqueue("a", "bad", "main", "s", TaskOptions::new().with_max_retries(0))
        .unwrap();
    queue.pause_lane("parallel").unwrap();
    let cancelled = queue.enqueue("a", "never", "parallel", "s", TaskOptions::new()).unwrap();
    queue.cancel(&cancelled);

    queue.wait_for(&ok, WAIT).await.unwrap();
    queue.wait_for(&bad, WAIT).await.unwrap();

    let stats = queue.get_stats();
    assert_eq!(stats.total_tasks, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.lane_count, 4);
    assert_eq!(stats.by_lane.get("gpu"), Some(&1));
    assert_eq!(stats.by_lane.get("planner"), Some(&0));

    let lanes = queue.get_all_lane_status();
    assert_eq!(lanes.len(), 4);
    let gpu = lanes.iter().find(|l| l.name == "gpu").unwrap();
    assert_eq!(gpu.kind, LaneKind::Concurrent);
    assert_eq!(gpu.running, 0);
}

#[tokio::test]
async fn test_unknown_lane_creates_no_record() {
    let (queue, mock) = start(MockExecutor::new());

    let err = queue
        .enqueue("a", "x", "does-not-exist", "s", TaskOptions::new().with_id("orphan"))
        .unwrap_err();

    assert!(matches!(err, LaneError::LaneNotFound(_)));
    assert!(queue.get_task("orphan").is_none());
    assert!(queue.list_tasks(None).is_empty());
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_wait_for_returns_terminal_record() {
    let (queue, _) = start(MockExecutor::new().with_delay(Duration::from_millis(20)));

    let id = queue.enqueue("a", "x", "main", "s", TaskOptions::new()).unwrap();
    let record = queue.wait_for(&id, WAIT).await.unwrap();
    assert!(record.status.is_terminal());

    // Waiting again returns immediately with the same record
    let again = queue.wait_for(&id, Duration::from_millis(1)).await.unwrap();
    assert_eq!(again.status, record.status);
    assert_eq!(again.completed_at, record.completed_at);
}
