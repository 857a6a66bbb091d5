use std::sync::atomic::AtomicU32;
use std::time::Duration;

use futures::future::join_all;

use super::*;

/// Counts fetches; fails the first `fail_first` calls.
struct FakeRoster {
    calls: Arc<AtomicU32>,
    delay: Duration,
    fail_first: u32,
}

impl FakeRoster {
    fn new(delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            delay,
            fail_first: 0,
        }
    }
}

impl RosterSource for FakeRoster {
    async fn fetch_roster(&self, clinic_id: &ClinicId) -> Result<Vec<DoctorDetail>, ClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if call < self.fail_first {
            return Err(ClientError::UnexpectedStatus {
                status: 503,
                url: format!("http://localhost/clinics/{clinic_id}/doctors"),
            });
        }
        Ok(vec![
            DoctorDetail::new(format!("{clinic_id}-d1"), Some("Cardiology"), true),
            DoctorDetail::new(format!("{clinic_id}-d2"), Some("Dermatology"), false),
        ])
    }
}

fn key(id: &str) -> ClinicId {
    ClinicId::from(id)
}

#[tokio::test]
async fn concurrent_ensures_issue_exactly_one_fetch() {
    let fake = FakeRoster::new(Duration::from_millis(20));
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let clinic = key("c1");

    let results = join_all((0..8).map(|_| cache.ensure(&clinic))).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let first = results[0].as_ref().expect("resolved");
    assert_eq!(first.len(), 2);
    for result in &results {
        let doctors = result.as_ref().expect("resolved");
        assert!(Arc::ptr_eq(doctors, first), "all callers share one roster");
    }

    let stats = cache.stats();
    assert_eq!(stats.requests, 8);
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.coalesced, 7);
}

#[tokio::test]
async fn resolved_entry_is_memoized() {
    let fake = FakeRoster::new(Duration::ZERO);
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let clinic = key("c1");

    cache.ensure(&clinic).await.unwrap();
    cache.ensure(&clinic).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.state(&clinic), Some(EntryState::Resolved { doctors: 2 }));
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn different_keys_fetch_independently() {
    let fake = FakeRoster::new(Duration::from_millis(5));
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let (a, b) = (key("a"), key("b"));

    let (ra, rb) = tokio::join!(cache.ensure(&a), cache.ensure(&b));

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(ra.unwrap()[0].id.as_str(), "a-d1");
    assert_eq!(rb.unwrap()[0].id.as_str(), "b-d1");
}

#[tokio::test]
async fn failure_is_recorded_and_retried_on_next_trigger() {
    let mut fake = FakeRoster::new(Duration::ZERO);
    fake.fail_first = 1;
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let clinic = key("c1");

    let err = cache.ensure(&clinic).await.unwrap_err();
    assert_eq!(err.clinic_id, clinic);
    assert!(matches!(cache.state(&clinic), Some(EntryState::Failed { .. })));
    assert!(cache.snapshot().is_empty());

    let doctors = cache.ensure(&clinic).await.expect("retry succeeds");
    assert_eq!(doctors.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_does_not_affect_other_clinics() {
    let mut fake = FakeRoster::new(Duration::ZERO);
    fake.fail_first = 1;
    let cache = DetailCache::new(fake);

    assert!(cache.ensure(&key("bad")).await.is_err());
    assert!(cache.ensure(&key("good")).await.is_ok());

    let snapshot = cache.snapshot();
    assert!(snapshot.get(&key("bad")).is_none());
    assert_eq!(snapshot.get(&key("good")).map(<[DoctorDetail]>::len), Some(2));
}

#[tokio::test]
async fn fetch_completes_after_caller_stops_waiting() {
    let fake = FakeRoster::new(Duration::from_millis(30));
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let clinic = key("c1");

    let abandoned = tokio::time::timeout(Duration::from_millis(5), cache.ensure(&clinic)).await;
    assert!(abandoned.is_err(), "caller gave up before the fetch finished");
    assert_eq!(cache.state(&clinic), Some(EntryState::Pending));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cache.state(&clinic), Some(EntryState::Resolved { doctors: 2 }));

    cache.ensure(&clinic).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidated_pending_result_is_not_written_back() {
    let fake = FakeRoster::new(Duration::from_millis(30));
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let clinic = key("c1");

    let _ = tokio::time::timeout(Duration::from_millis(5), cache.ensure(&clinic)).await;
    assert!(cache.invalidate(&clinic));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cache.state(&clinic), None);

    cache.ensure(&clinic).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ensure_after_invalidate_joins_the_outstanding_fetch() {
    let fake = FakeRoster::new(Duration::from_millis(200));
    let calls = Arc::clone(&fake.calls);
    let cache = Arc::new(DetailCache::new(fake));
    let clinic = key("c1");

    let first = tokio::spawn({
        let cache = Arc::clone(&cache);
        let clinic = clinic.clone();
        async move { cache.ensure(&clinic).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.invalidate(&clinic));
    assert_eq!(cache.state(&clinic), Some(EntryState::Pending));

    let second = tokio::spawn({
        let cache = Arc::clone(&cache);
        let clinic = clinic.clone();
        async move { cache.ensure(&clinic).await }
    });
    let (first, second) = tokio::join!(first, second);
    assert!(first.unwrap().is_ok());
    assert!(second.unwrap().is_ok());

    assert_eq!(calls.load(Ordering::SeqCst), 1, "one fetch in flight per clinic");
    assert_eq!(cache.stats().coalesced, 1);
    assert_eq!(cache.state(&clinic), None);
}

#[tokio::test]
async fn clear_keeps_one_fetch_in_flight() {
    let fake = FakeRoster::new(Duration::from_millis(100));
    let calls = Arc::clone(&fake.calls);
    let cache = DetailCache::new(fake);
    let clinic = key("c1");

    let _ = tokio::time::timeout(Duration::from_millis(5), cache.ensure(&clinic)).await;
    cache.clear();

    cache.ensure(&clinic).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.snapshot().is_empty());
}

#[tokio::test]
async fn clear_drops_resolved_entries() {
    let cache = DetailCache::new(FakeRoster::new(Duration::ZERO));
    cache.ensure(&key("a")).await.unwrap();
    cache.ensure(&key("b")).await.unwrap();
    assert_eq!(cache.snapshot().len(), 2);

    cache.clear();
    assert!(cache.snapshot().is_empty());
    assert!(!cache.invalidate(&key("a")));
}

#[tokio::test]
async fn snapshot_excludes_pending_entries() {
    let cache = DetailCache::new(FakeRoster::new(Duration::from_millis(30)));
    cache.ensure(&key("done")).await.unwrap();
    let _ = tokio::time::timeout(Duration::from_millis(5), cache.ensure(&key("slow"))).await;

    let snapshot = cache.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get(&key("done")).is_some());
    assert!(snapshot.get(&key("slow")).is_none());
}

#[test]
fn snapshot_from_iterator() {
    let snapshot: DetailSnapshot = [(key("c1"), vec![DoctorDetail::new("d1", None, false)])]
        .into_iter()
        .collect();
    assert_eq!(snapshot.get(&key("c1")).map(<[DoctorDetail]>::len), Some(1));
    assert!(snapshot.get(&key("c2")).is_none());
}
