#![allow(clippy::unwrap_used, clippy::panic)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::{sync::Notify, time::timeout};

use super::{ReaderCache, ReaderSetup};
use crate::{
    BoxError, ConfigError, ConfigReader,
    lifecycle::{Refreshable, Service, ServiceError},
    providers::InMemoryProvider,
};

const WAIT: Duration = Duration::from_secs(2);

fn reader_with(path: &str, value: &str) -> ConfigReader {
    let provider = InMemoryProvider::default();
    provider.set(path, value).unwrap();
    ConfigReader::new(provider)
}

async fn succeed(calls: Arc<AtomicUsize>, reader: ConfigReader) -> Result<ReaderSetup, BoxError> {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(ReaderSetup::new(reader))
}

async fn explode() -> Result<ReaderSetup, BoxError> {
    panic!("factory exploded")
}

async fn fail(calls: Arc<AtomicUsize>) -> Result<ReaderSetup, BoxError> {
    calls.fetch_add(1, Ordering::SeqCst);
    Err("factory failed".into())
}

struct RecordingService {
    runs: AtomicUsize,
    refreshes: AtomicUsize,
    fail_refresh: bool,
    started: Notify,
    stopped: Notify,
    fail_run: Notify,
}

impl RecordingService {
    fn new(fail_refresh: bool) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            fail_refresh,
            started: Notify::new(),
            stopped: Notify::new(),
            fail_run: Notify::new(),
        })
    }
}

#[async_trait]
impl Service for RecordingService {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.fail_run.notified().await;
        self.stopped.notify_one();
        Err(ServiceError::failed("recording", "stopped on request"))
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        Some(self)
    }
}

#[async_trait]
impl Refreshable for RecordingService {
    async fn refresh(&self) -> Result<(), ServiceError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            Err(ServiceError::failed("recording", "refresh failed"))
        } else {
            Ok(())
        }
    }
}

struct PlainService;

#[async_trait]
impl Service for PlainService {
    fn name(&self) -> &str {
        "plain"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

// Every call is polled once by `join_all` before the actor runs, so all of
// them are queued ahead of the attempt's completion.
#[tokio::test]
async fn concurrent_callers_share_one_initialization() {
    let cache = ReaderCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let reader = reader_with("t.v", "hello");

    let results = join_all((0..8).map(|_| {
        let calls = calls.clone();
        let reader = reader.clone();
        cache.get_or_initialize(move || succeed(calls, reader))
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().reader.id(), reader.id());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn only_the_initializing_caller_receives_services() {
    let cache = ReaderCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let reader = reader_with("t.v", "hello");

    let results = join_all((0..3).map(|_| {
        let calls = calls.clone();
        let reader = reader.clone();
        cache.get_or_initialize(move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(
                ReaderSetup::new(reader)
                    .with_service(Arc::new(PlainService))
                    .with_logger(tracing::info_span!("config_services")),
            )
        })
    }))
    .await;

    let setups: Vec<ReaderSetup> = results.into_iter().map(Result::unwrap).collect();
    let owners: Vec<&ReaderSetup> = setups.iter().filter(|s| s.services.is_some()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(owners.len(), 1);
    assert!(owners[0].logger.is_some());
    assert_eq!(setups.iter().filter(|s| s.logger.is_some()).count(), 1);
    assert!(setups.iter().all(|s| s.reader.id() == reader.id()));
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
    let cache = ReaderCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let results = join_all((0..5).map(|_| {
        let calls = calls.clone();
        cache.get_or_initialize(move || fail(calls))
    }))
    .await;

    for result in results {
        assert!(matches!(result, Err(ConfigError::InitializationFailed(_))));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!cache.is_ready());
}

#[tokio::test]
async fn success_is_never_recomputed() {
    let cache = ReaderCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let reader = reader_with("t.v", "hello");

    let first = {
        let calls = calls.clone();
        let reader = reader.clone();
        cache
            .get_or_initialize(move || succeed(calls, reader))
            .await
            .unwrap()
    };
    assert_eq!(first.reader.id(), reader.id());

    for _ in 0..3 {
        let calls = calls.clone();
        let later = cache.get_or_initialize(move || fail(calls)).await.unwrap();
        assert_eq!(later.reader.id(), reader.id());
        assert!(later.services.is_none());
        assert!(later.logger.is_none());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.cached_reader().map(|r| r.id()), Some(reader.id()));
}

#[tokio::test]
async fn failure_allows_a_fresh_attempt() {
    let cache = ReaderCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let reader = reader_with("t.v", "hello");

    let first = {
        let calls = calls.clone();
        cache.get_or_initialize(move || fail(calls)).await
    };
    assert!(first.is_err());
    assert!(cache.cached_reader().is_none());

    let second = {
        let calls = calls.clone();
        let reader = reader.clone();
        cache.get_or_initialize(move || succeed(calls, reader)).await
    };

    assert_eq!(second.unwrap().reader.id(), reader.id());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn panicking_factory_is_reported_and_retryable() {
    let cache = ReaderCache::new();

    let result = cache.get_or_initialize(explode).await;
    assert!(matches!(result, Err(ConfigError::InitializationFailed(_))));

    let reader = reader_with("a", "b");
    let expected = reader.id();
    let setup = cache
        .get_or_initialize(move || async move { Ok::<_, BoxError>(ReaderSetup::new(reader)) })
        .await
        .unwrap();
    assert_eq!(setup.reader.id(), expected);
}

#[tokio::test]
async fn initializer_receives_services_and_starts_them_once() {
    let cache = ReaderCache::new();
    let service = RecordingService::new(false);
    let reader = reader_with("t.v", "hello");

    let setup = {
        let service: Arc<dyn Service> = service.clone();
        let reader = reader.clone();
        cache
            .get_or_initialize(move || async move {
                Ok::<_, BoxError>(
                    ReaderSetup::new(reader)
                        .with_service(service)
                        .with_logger(tracing::info_span!("config_services")),
                )
            })
            .await
            .unwrap()
    };
    assert_eq!(setup.services.as_ref().map(Vec::len), Some(1));
    assert!(setup.logger.is_some());

    timeout(WAIT, service.started.notified()).await.unwrap();
    cache.refresh().await;
    cache.refresh().await;

    assert_eq!(service.runs.load(Ordering::SeqCst), 1);
    assert_eq!(service.refreshes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn service_failure_keeps_the_reader_cached() {
    let cache = ReaderCache::new();
    let service = RecordingService::new(false);
    let reader = reader_with("t.v", "hello");
    let calls = Arc::new(AtomicUsize::new(0));

    {
        let service: Arc<dyn Service> = service.clone();
        let reader = reader.clone();
        cache
            .get_or_initialize(move || async move {
                Ok::<_, BoxError>(ReaderSetup::new(reader).with_services(vec![service]))
            })
            .await
            .unwrap();
    }

    timeout(WAIT, service.started.notified()).await.unwrap();
    service.fail_run.notify_one();
    timeout(WAIT, service.stopped.notified()).await.unwrap();
    tokio::task::yield_now().await;

    let calls_clone = calls.clone();
    let setup = cache
        .get_or_initialize(move || fail(calls_clone))
        .await
        .unwrap();
    assert_eq!(setup.reader.id(), reader.id());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refresh_skips_plain_services_and_swallows_errors() {
    let cache = ReaderCache::new();
    let failing = RecordingService::new(true);
    let reader = reader_with("t.v", "hello");

    {
        let services: Vec<Arc<dyn Service>> = vec![Arc::new(PlainService), failing.clone()];
        cache
            .get_or_initialize(move || async move {
                Ok::<_, BoxError>(ReaderSetup::new(reader).with_services(services))
            })
            .await
            .unwrap();
    }

    cache.refresh().await;

    assert_eq!(failing.refreshes.load(Ordering::SeqCst), 1);
    assert!(cache.is_ready());
}

#[tokio::test]
async fn refresh_before_initialization_is_a_no_op() {
    let cache = ReaderCache::new();

    cache.refresh().await;

    assert!(!cache.is_ready());
}
