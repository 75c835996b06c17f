//! In-process doubles for the oracle and the promotion store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kube::ResourceExt;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;

use crate::crd::{
    KindDescriptor, LocalObjectsRef, Promotion, PromotionSpec,
    PromotionStatus, ReadinessChecks,
};
use crate::oracle::{
    ComputeError, FetchError, HealthStatus, HealthVerdict, StatusOracle,
};

use super::store::{PromotionStore, StoreError};

pub fn deployment(name: &str) -> LocalObjectsRef {
    LocalObjectsRef {
        group_version_resource: KindDescriptor::new("apps", "v1", "deployments"),
        name: name.into(),
        namespace: None,
    }
}

pub fn promotion(ns: &str, name: &str, refs: Vec<LocalObjectsRef>) -> Promotion {
    let mut p = Promotion::new(
        name,
        PromotionSpec {
            readiness_checks: Some(ReadinessChecks {
                local_objects_ref: refs,
            }),
            ..Default::default()
        },
    );
    p.metadata.namespace = Some(ns.into());
    p.metadata.resource_version = Some("1".into());
    p
}

#[derive(Clone)]
enum Scripted {
    Verdict(HealthVerdict),
    FetchFails(FetchError),
    ComputeFails(String),
}

type ObjectKey = (String, String, String);

#[derive(Default)]
pub struct MockOracle {
    objects: Mutex<HashMap<ObjectKey, Scripted>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn key(resource: &str, ns: &str, name: &str) -> ObjectKey {
        (resource.into(), ns.into(), name.into())
    }

    pub fn set(&self, r: &LocalObjectsRef, ns: &str, status: HealthStatus) {
        self.script(
            r,
            ns,
            Scripted::Verdict(HealthVerdict::new(status, status.to_string())),
        );
    }

    pub fn set_missing(&self, r: &LocalObjectsRef, ns: &str) {
        let err = FetchError::NotFound {
            kind: r.group_version_resource.to_string(),
            namespace: ns.into(),
            name: r.name.clone(),
        };
        self.script(r, ns, Scripted::FetchFails(err));
    }

    pub fn set_uncomputable(&self, r: &LocalObjectsRef, ns: &str) {
        self.script(r, ns, Scripted::ComputeFails("malformed status".into()));
    }

    fn script(&self, r: &LocalObjectsRef, ns: &str, s: Scripted) {
        self.objects.lock().unwrap().insert(
            Self::key(&r.group_version_resource.resource, ns, &r.name),
            s,
        );
    }

    /// `ns/name` of every fetch, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusOracle for MockOracle {
    async fn fetch(
        &self,
        kind: &KindDescriptor,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}/{}", namespace, name));
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let scripted = self
            .objects
            .lock()
            .unwrap()
            .get(&Self::key(&kind.resource, namespace, name))
            .cloned();
        match scripted {
            None => Err(FetchError::NotFound {
                kind: kind.to_string(),
                namespace: namespace.into(),
                name: name.into(),
            }),
            Some(Scripted::FetchFails(e)) => Err(e),
            Some(_) => {
                // The resource name doubles as the kind so compute can find
                // the script again.
                let ar = ApiResource {
                    group: kind.group.clone(),
                    version: kind.version.clone(),
                    api_version: kind.api_version(),
                    kind: kind.resource.clone(),
                    plural: kind.resource.clone(),
                };
                Ok(DynamicObject::new(name, &ar).within(namespace))
            }
        }
    }

    fn compute(
        &self,
        obj: &DynamicObject,
    ) -> Result<HealthVerdict, ComputeError> {
        let resource = obj
            .types
            .as_ref()
            .map(|t| t.kind.clone())
            .unwrap_or_default();
        let ns = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let scripted = self
            .objects
            .lock()
            .unwrap()
            .get(&Self::key(&resource, &ns, &name))
            .cloned();
        match scripted {
            Some(Scripted::Verdict(v)) => Ok(v),
            Some(Scripted::ComputeFails(message)) => Err(ComputeError {
                object: format!("{} {}/{}", resource, ns, name),
                message,
            }),
            _ => panic!("compute called for unscripted object {ns}/{name}"),
        }
    }
}

/// Promotion store kept in memory. Resource versions are bumped on every
/// status write and checked like the apiserver does.
#[derive(Default)]
pub struct InMemoryStore {
    objects: Mutex<HashMap<(String, String), Promotion>>,
    pending_conflicts: AtomicU32,
    fatal: Mutex<Option<String>>,
    writes: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, p: Promotion) {
        let key = (p.namespace().unwrap_or_default(), p.name_any());
        self.objects.lock().unwrap().insert(key, p);
    }

    pub fn status(&self, ns: &str, name: &str) -> Option<PromotionStatus> {
        self.objects
            .lock()
            .unwrap()
            .get(&(ns.to_string(), name.to_string()))
            .and_then(|p| p.status.clone())
    }

    /// Make the next `n` status writes fail as if another writer got there
    /// first.
    pub fn inject_conflicts(&self, n: u32) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, message: &str) {
        *self.fatal.lock().unwrap() = Some(message.into());
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromotionStore for InMemoryStore {
    async fn get(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<Promotion>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(ns.to_string(), name.to_string()))
            .cloned())
    }

    async fn replace_status(
        &self,
        promotion: &Promotion,
        status: &PromotionStatus,
    ) -> Result<(), StoreError> {
        let key = (promotion.namespace().unwrap_or_default(), promotion.name_any());
        let id = format!("{}/{}", key.0, key.1);
        if let Some(msg) = self.fatal.lock().unwrap().clone() {
            return Err(StoreError::Fatal(msg));
        }
        let mut objects = self.objects.lock().unwrap();
        let Some(stored) = objects.get_mut(&key) else {
            return Err(StoreError::NotFound(id));
        };
        if self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Conflict(id));
        }
        if stored.metadata.resource_version != promotion.metadata.resource_version
        {
            return Err(StoreError::Conflict(id));
        }
        let next = stored
            .metadata
            .resource_version
            .as_deref()
            .and_then(|rv| rv.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        stored.metadata.resource_version = Some(next.to_string());
        stored.status = Some(status.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
