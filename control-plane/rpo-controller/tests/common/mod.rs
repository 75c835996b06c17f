#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use envconfig::Envconfig;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{
    Client,
    api::{Api, DeleteParams, PostParams},
};
use rpo_controller::config::RpoConfig;
use rpo_controller::crd::{
    EnvironmentReference, FromSpec, KindDescriptor, LocalObjectsRef, Promotion,
    PromotionSpec, PromotionStatus, ReadinessChecks, ToSpec,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

/// Config with short requeues so readiness flips show up quickly.
pub fn test_config(ns: &str) -> RpoConfig {
    let env: HashMap<String, String> = [
        ("RPO_WATCH_NAMESPACE", ns),
        ("RPO_UNREADY_REQUEUE_SECS", "2"),
        ("RPO_READY_REQUEUE_SECS", "2"),
        ("RPO_ERROR_REQUEUE_SECS", "2"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    RpoConfig::init_from_hashmap(&env).expect("config")
}

/// Runs the controller in the background and stops it on drop.
pub struct ControllerGuard {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ControllerGuard {
    pub fn spawn(client: Client, cfg: RpoConfig) -> Self {
        let token = CancellationToken::new();
        let t = token.clone();
        let handle = tokio::spawn(async move {
            let _ = rpo_controller::controller::run_controller(client, cfg, t)
                .await;
        });
        Self {
            token,
            handle: Some(handle),
        }
    }
}

impl Drop for ControllerGuard {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }
}

pub fn deployment_ref(name: &str) -> LocalObjectsRef {
    LocalObjectsRef {
        group_version_resource: KindDescriptor::new("apps", "v1", "deployments"),
        name: name.into(),
        namespace: None,
    }
}

pub fn promotion(name: &str, refs: Vec<LocalObjectsRef>) -> Promotion {
    Promotion::new(
        name,
        PromotionSpec {
            from: FromSpec {
                environment_ref: EnvironmentReference { name: "dev".into() },
            },
            to: ToSpec {
                environment_ref: EnvironmentReference {
                    name: "prod".into(),
                },
            },
            readiness_checks: Some(ReadinessChecks {
                local_objects_ref: refs,
            }),
            ..Default::default()
        },
    )
}

pub fn nginx_deployment(name: &str, image: &str) -> Deployment {
    let labels: BTreeMap<String, String> =
        [("app".to_string(), name.to_string())].into();
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "main".into(),
                        image: Some(image.into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub async fn create_deployment(client: Client, ns: &str, dep: &Deployment) {
    let api: Api<Deployment> = Api::namespaced(client, ns);
    api.create(&PostParams::default(), dep)
        .await
        .expect("create deployment");
}

/// Poll the promotion until `pred` holds on its status.
pub async fn wait_for_status<F>(
    client: Client,
    ns: &str,
    name: &str,
    secs: u64,
    pred: F,
) -> Option<PromotionStatus>
where
    F: Fn(&PromotionStatus) -> bool,
{
    let api: Api<Promotion> = Api::namespaced(client, ns);
    for _ in 0..secs {
        if let Ok(Some(p)) = api.get_opt(name).await {
            if let Some(s) = p.status.filter(|s| pred(s)) {
                return Some(s);
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    None
}

pub async fn cleanup(client: Client, ns: &str, promotion: &str, deps: &[&str]) {
    let p_api: Api<Promotion> = Api::namespaced(client.clone(), ns);
    let _ = p_api.delete(promotion, &DeleteParams::default()).await;
    let d_api: Api<Deployment> = Api::namespaced(client, ns);
    for d in deps {
        let _ = d_api.delete(d, &DeleteParams::default()).await;
    }
}
