use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{ListParams, LogParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

use crate::model::{
    SENSOR_GROUP, SENSOR_KIND, SENSOR_PLURAL, SENSOR_POD_LABEL, SENSOR_VERSION, Sensor,
};

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

impl KubeGateway {
    pub async fn new() -> Result<Self> {
        Self::from_kube_selection(None).await
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn from_kube_selection(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster_url = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context: active_context,
            cluster: cluster_url,
            default_namespace,
        })
    }

    /// Sensor API scoped to `namespace`; an empty namespace lists across
    /// the cluster.
    fn sensor_api(&self, namespace: &str) -> Api<DynamicObject> {
        let api_resource = sensor_api_resource();
        if namespace.trim().is_empty() {
            Api::all_with(self.client.clone(), &api_resource)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &api_resource)
        }
    }

    pub async fn list_sensors(&self, namespace: &str) -> Result<Vec<Sensor>> {
        let items = list_all(&self.sensor_api(namespace), list_params())
            .await
            .with_context(|| format!("failed to list sensors in {}", scope_label(namespace)))?;

        items.into_iter().map(decode_sensor).collect()
    }

    pub async fn get_sensor(&self, namespace: &str, name: &str) -> Result<Sensor> {
        let object = self
            .sensor_api(namespace)
            .get(name)
            .await
            .with_context(|| format!("failed to load sensor {namespace}/{name}"))?;
        decode_sensor(object)
    }

    pub async fn create_sensor(&self, namespace: &str, manifest: &str) -> Result<Sensor> {
        let object = parse_sensor_manifest(manifest, namespace)?;
        let target_namespace = object.namespace().unwrap_or_default();
        let created = self
            .sensor_api(&target_namespace)
            .create(&PostParams::default(), &object)
            .await
            .with_context(|| {
                format!(
                    "failed to create sensor {target_namespace}/{}",
                    object.name_any()
                )
            })?;
        decode_sensor(created)
    }

    /// Tails the logs of every pod the sensor controller runs for `name`.
    pub async fn fetch_sensor_logs(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: i64,
    ) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!("{SENSOR_POD_LABEL}={name}");
        let mut list = pods
            .list(&ListParams::default().labels(&selector))
            .await
            .with_context(|| format!("failed to list pods for sensor {namespace}/{name}"))?
            .items;
        if list.is_empty() {
            return Ok(format!("No pods found with label {selector} in {namespace}."));
        }
        list.sort_by_key(|pod| std::cmp::Reverse(pod_running_score(pod)));

        let params = LogParams {
            tail_lines: Some(tail_lines),
            timestamps: true,
            ..LogParams::default()
        };
        if list.len() == 1 {
            let pod_name = list[0].name_any();
            return pods
                .logs(&pod_name, &params)
                .await
                .with_context(|| format!("failed to load logs for {namespace}/{pod_name}"));
        }

        let mut sections = Vec::with_capacity(list.len());
        for pod in &list {
            let pod_name = pod.name_any();
            let logs = pods.logs(&pod_name, &params).await;
            sections.push(pod_log_section(&pod_name, logs));
        }
        Ok(sections.join("\n"))
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let items = list_all(&namespaces, list_params())
            .await
            .context("failed to list namespaces")?;
        Ok(items
            .into_iter()
            .map(|namespace| namespace.name_any())
            .collect())
    }
}

fn sensor_api_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(SENSOR_GROUP, SENSOR_VERSION, SENSOR_KIND);
    ApiResource::from_gvk_with_plural(&gvk, SENSOR_PLURAL)
}

fn decode_sensor(object: DynamicObject) -> Result<Sensor> {
    let name = object.name_any();
    let value = serde_json::to_value(&object).context("failed to encode sensor object")?;
    serde_json::from_value(value).with_context(|| format!("failed to decode sensor {name}"))
}

/// Parses an edited manifest, defaulting `metadata.namespace` to the
/// namespace the editor was opened in.
fn parse_sensor_manifest(manifest: &str, namespace: &str) -> Result<DynamicObject> {
    let value: Value = serde_yaml::from_str(manifest).context("failed to parse sensor YAML")?;
    let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default();
    if kind != SENSOR_KIND {
        anyhow::bail!("expected kind {SENSOR_KIND}, found '{kind}'");
    }

    let mut object: DynamicObject =
        serde_json::from_value(value).context("sensor YAML is not a Kubernetes object")?;
    if object.metadata.name.as_deref().unwrap_or_default().is_empty() {
        anyhow::bail!("sensor manifest needs metadata.name");
    }
    if object
        .metadata
        .namespace
        .as_deref()
        .unwrap_or_default()
        .is_empty()
    {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            anyhow::bail!("sensor manifest needs metadata.namespace when listing all namespaces");
        }
        object.metadata.namespace = Some(namespace.to_string());
    }
    Ok(object)
}

async fn list_all<K>(api: &Api<K>, mut params: ListParams) -> kube::Result<Vec<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut items = Vec::new();
    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);
        match next_page_token(page.metadata.continue_) {
            Some(token) => params = params.continue_token(&token),
            None => return Ok(items),
        }
    }
}

fn next_page_token(token: Option<String>) -> Option<String> {
    token.filter(|token| !token.trim().is_empty())
}

// A pod that cannot serve logs (still pending, evicted) keeps its section.
fn pod_log_section(pod_name: &str, logs: kube::Result<String>) -> String {
    match logs {
        Ok(logs) => format!("── {pod_name} ──\n{logs}"),
        Err(error) => format!("── {pod_name} ──\nlogs unavailable: {error}"),
    }
}

fn pod_running_score(pod: &Pod) -> u64 {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .map(|phase| {
            if phase.eq_ignore_ascii_case("Running") {
                48
            } else if phase.eq_ignore_ascii_case("Pending") {
                18
            } else {
                6
            }
        })
        .unwrap_or(0)
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

fn scope_label(namespace: &str) -> &str {
    if namespace.trim().is_empty() {
        "all namespaces"
    } else {
        namespace
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_sensor, next_page_token, parse_sensor_manifest, pod_log_section, pod_running_score,
        sensor_api_resource,
    };
    use crate::model::sensor_template;
    use k8s_openapi::api::core::v1::{Pod, PodStatus};
    use kube::ResourceExt;
    use kube::core::DynamicObject;

    #[test]
    fn sensor_resource_uses_argo_group() {
        let resource = sensor_api_resource();
        assert_eq!(resource.api_version, "argoproj.io/v1alpha1");
        assert_eq!(resource.plural, "sensors");
    }

    #[test]
    fn template_manifest_parses_for_creation() {
        let object = parse_sensor_manifest(&sensor_template("argo-events"), "ignored").unwrap();
        assert_eq!(object.name_any(), "my-sensor");
        assert_eq!(object.namespace().as_deref(), Some("argo-events"));
    }

    #[test]
    fn manifest_namespace_defaults_to_current() {
        let manifest = "apiVersion: argoproj.io/v1alpha1\nkind: Sensor\nmetadata:\n  name: s\n";
        let object = parse_sensor_manifest(manifest, "team-a").unwrap();
        assert_eq!(object.namespace().as_deref(), Some("team-a"));

        let error = parse_sensor_manifest(manifest, "").unwrap_err();
        assert!(error.to_string().contains("metadata.namespace"));
    }

    #[test]
    fn manifest_of_other_kind_is_rejected() {
        let manifest = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: s\n";
        assert!(parse_sensor_manifest(manifest, "default").is_err());
    }

    #[test]
    fn dynamic_object_decodes_into_sensor() {
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "Sensor",
            "metadata": {"name": "webhook", "namespace": "argo-events"},
            "spec": {"triggers": [{"template": {"name": "t"}}]}
        }))
        .unwrap();
        let sensor = decode_sensor(object).unwrap();
        assert_eq!(sensor.name(), "webhook");
        assert_eq!(sensor.trigger_names(), vec!["t".to_string()]);
    }

    #[test]
    fn running_pods_rank_first() {
        let pod = |phase: &str| Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        assert!(pod_running_score(&pod("Running")) > pod_running_score(&pod("Pending")));
        assert!(pod_running_score(&pod("Pending")) > pod_running_score(&pod("Failed")));
        assert_eq!(pod_running_score(&Pod::default()), 0);
    }

    #[test]
    fn paging_stops_on_missing_or_empty_token() {
        assert_eq!(next_page_token(None), None);
        assert_eq!(next_page_token(Some(String::new())), None);
        assert_eq!(
            next_page_token(Some("eyJ2IjoibWV0YS5rOHMuaW8vdjEifQ".to_string())).as_deref(),
            Some("eyJ2IjoibWV0YS5rOHMuaW8vdjEifQ")
        );
    }

    #[test]
    fn failed_pod_logs_keep_their_section() {
        let running = pod_log_section("webhook-sensor-abc", Ok("started\n".to_string()));
        assert!(running.starts_with("── webhook-sensor-abc ──"));
        assert!(running.contains("started"));

        let pending = pod_log_section(
            "webhook-sensor-def",
            Err(kube::Error::LinesCodecMaxLineLengthExceeded),
        );
        assert!(pending.starts_with("── webhook-sensor-def ──"));
        assert!(pending.contains("logs unavailable"));
    }
}
