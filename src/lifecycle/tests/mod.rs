#![allow(clippy::unwrap_used, clippy::panic)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Notify, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::info_span;

use super::{Refreshable, Service, ServiceError, ServiceGroup};

const WAIT: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Idle {
    runs: Arc<AtomicUsize>,
    started: Arc<Notify>,
}

#[async_trait]
impl Service for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        std::future::pending::<()>().await;
        Ok(())
    }
}

struct FailsWhenNotified {
    trigger: Arc<Notify>,
}

#[async_trait]
impl Service for FailsWhenNotified {
    fn name(&self) -> &str {
        "fails"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        self.trigger.notified().await;
        Err(ServiceError::failed("fails", "boom"))
    }
}

struct Panics;

#[async_trait]
impl Service for Panics {
    fn name(&self) -> &str {
        "panics"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        panic!("service exploded");
    }
}

struct Finishes;

#[async_trait]
impl Service for Finishes {
    fn name(&self) -> &str {
        "finishes"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

struct Reloads {
    refreshes: AtomicUsize,
}

#[async_trait]
impl Service for Reloads {
    fn name(&self) -> &str {
        "reloads"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        Some(self)
    }
}

#[async_trait]
impl Refreshable for Reloads {
    async fn refresh(&self) -> Result<(), ServiceError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn first_failure_stops_the_group() {
    let idle = Idle::default();
    let runs = idle.runs.clone();
    let started = idle.started.clone();
    let trigger = Arc::new(Notify::new());
    let services: Vec<Arc<dyn Service>> = vec![
        Arc::new(idle),
        Arc::new(FailsWhenNotified {
            trigger: trigger.clone(),
        }),
    ];
    let group = ServiceGroup::new(services, Some(info_span!("test_group")));

    let handle = tokio::spawn(group.run());
    timeout(WAIT, started.notified()).await.unwrap();
    trigger.notify_one();

    let result = timeout(WAIT, handle).await.unwrap().unwrap();

    assert!(matches!(result, Err(ServiceError::Failed { ref service, .. }) if service == "fails"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_service_is_reported_by_name() {
    let services: Vec<Arc<dyn Service>> = vec![Arc::new(Panics)];
    let group = ServiceGroup::new(services, None);

    let result = group.run().await;

    assert!(matches!(result, Err(ServiceError::Panicked { ref service }) if service == "panics"));
}

#[tokio::test]
async fn clean_exits_do_not_stop_other_services() {
    let idle = Idle::default();
    let runs = idle.runs.clone();
    let started = idle.started.clone();
    let services: Vec<Arc<dyn Service>> = vec![Arc::new(Finishes), Arc::new(idle)];
    let group = ServiceGroup::new(services, None);
    let token = group.cancellation_token();

    let mut handle = tokio::spawn(group.run());
    timeout(WAIT, started.notified()).await.unwrap();

    // The group must outlive the finished service until it is cancelled.
    assert!(timeout(Duration::from_millis(100), &mut handle).await.is_err());
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    token.cancel();
    let result = timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn external_token_cancels_the_group() {
    let token = CancellationToken::new();
    let services: Vec<Arc<dyn Service>> = vec![Arc::new(Idle::default())];
    let group = ServiceGroup::new(services, None).with_cancellation(token.clone());
    assert_eq!(group.len(), 1);

    token.cancel();

    assert!(group.run().await.is_ok());
}

#[tokio::test]
async fn empty_group_finishes_immediately() {
    let group = ServiceGroup::new(Vec::new(), None);
    assert!(group.is_empty());

    assert!(group.run().await.is_ok());
}

#[tokio::test]
async fn refresh_capability_is_opt_in() {
    let reloads = Reloads {
        refreshes: AtomicUsize::new(0),
    };
    let idle = Idle::default();

    assert!(idle.as_refreshable().is_none());

    let refreshable = reloads.as_refreshable().unwrap();
    refreshable.refresh().await.unwrap();
    assert_eq!(reloads.refreshes.load(Ordering::SeqCst), 1);
}
