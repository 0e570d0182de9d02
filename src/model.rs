use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const SENSOR_GROUP: &str = "argoproj.io";
pub const SENSOR_VERSION: &str = "v1alpha1";
pub const SENSOR_KIND: &str = "Sensor";
pub const SENSOR_PLURAL: &str = "sensors";

/// Pod label the sensor controller stamps on every sensor deployment.
pub const SENSOR_POD_LABEL: &str = "sensor-name";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SensorSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SensorStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<EventDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDependency {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub event_source_name: String,
    #[serde(default)]
    pub event_name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TriggerTemplate>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Sensor {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|status| status.conditions.as_slice())
            .unwrap_or(&[])
    }

    pub fn status_icon(&self) -> StatusIcon {
        StatusIcon::from_conditions(self.conditions())
    }

    pub fn trigger_names(&self) -> Vec<String> {
        self.spec
            .triggers
            .iter()
            .filter_map(|trigger| trigger.template.as_ref())
            .map(|template| template.name.clone())
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.namespace(), SENSOR_KIND, self.name())
    }

    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace() == namespace && self.name() == name
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusIcon {
    Neutral,
    Healthy,
    Failed,
}

impl StatusIcon {
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        if conditions.is_empty() {
            Self::Neutral
        } else if conditions
            .iter()
            .any(|condition| condition.status.eq_ignore_ascii_case("false"))
        {
            Self::Failed
        } else {
            Self::Healthy
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Neutral => "󰒍",
            Self::Healthy => "󰄬",
            Self::Failed => "󰅖",
        }
    }
}

/// Composite graph node reference: `{namespace}/{kind}/{name}[/{key}]`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NodeId {
    pub namespace: String,
    pub kind: String,
    pub name: String,
    pub key: Option<String>,
}

impl NodeId {
    pub fn new(namespace: &str, kind: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn split(id: &str) -> Self {
        let mut parts = id.splitn(4, '/');
        let namespace = parts.next().unwrap_or_default().to_string();
        let kind = parts.next().unwrap_or_default().to_string();
        let name = parts.next().unwrap_or_default().to_string();
        let key = parts
            .next()
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        Self {
            namespace,
            kind,
            name,
            key,
        }
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)?;
        if let Some(key) = &self.key {
            write!(f, "/{key}")?;
        }
        Ok(())
    }
}

/// A selected node id resolved against the loaded sensor list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedNode<'a> {
    pub id: NodeId,
    pub value: Option<&'a Sensor>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ListBranch {
    Loading,
    Error,
    ZeroState,
    Populated,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SensorRow {
    pub icon: StatusIcon,
    pub name: String,
    pub namespace: String,
    pub created: String,
    pub link: String,
}

pub fn sensor_template(namespace: &str) -> String {
    let namespace = if namespace.trim().is_empty() {
        "argo-events"
    } else {
        namespace.trim()
    };
    format!(
        "apiVersion: {SENSOR_GROUP}/{SENSOR_VERSION}
kind: {SENSOR_KIND}
metadata:
  name: my-sensor
  namespace: {namespace}
spec:
  dependencies:
    - name: example-dep
      eventSourceName: webhook
      eventName: example
  triggers:
    - template:
        name: log-trigger
        log:
          intervalSeconds: 1
"
    )
}

#[cfg(test)]
mod tests {
    use super::{Condition, NodeId, Sensor, StatusIcon};

    fn condition(status: &str) -> Condition {
        Condition {
            type_: "Deployed".to_string(),
            status: status.to_string(),
            ..Condition::default()
        }
    }

    #[test]
    fn node_id_splits_all_segments() {
        let id = NodeId::split("argo-events/Sensor/webhook/slack-trigger");
        assert_eq!(id.namespace, "argo-events");
        assert_eq!(id.kind, "Sensor");
        assert_eq!(id.name, "webhook");
        assert_eq!(id.key.as_deref(), Some("slack-trigger"));
        assert_eq!(id.to_string(), "argo-events/Sensor/webhook/slack-trigger");
    }

    #[test]
    fn node_id_tolerates_missing_segments() {
        let id = NodeId::split("only-namespace");
        assert_eq!(id.namespace, "only-namespace");
        assert_eq!(id.kind, "");
        assert_eq!(id.name, "");
        assert_eq!(id.key, None);
    }

    #[test]
    fn status_icon_follows_conditions() {
        assert_eq!(StatusIcon::from_conditions(&[]), StatusIcon::Neutral);
        assert_eq!(
            StatusIcon::from_conditions(&[condition("True"), condition("True")]),
            StatusIcon::Healthy
        );
        assert_eq!(
            StatusIcon::from_conditions(&[condition("True"), condition("False")]),
            StatusIcon::Failed
        );
    }

    #[test]
    fn sensor_decodes_argo_manifest_and_keeps_unknown_fields() {
        let sensor: Sensor = serde_json::from_value(serde_json::json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "Sensor",
            "metadata": {"name": "webhook", "namespace": "argo-events"},
            "spec": {
                "template": {"serviceAccountName": "operate-workflow-sa"},
                "dependencies": [
                    {"name": "payload", "eventSourceName": "webhook", "eventName": "example"}
                ],
                "triggers": [
                    {"template": {"name": "workflow-trigger", "k8s": {"operation": "create"}}}
                ]
            },
            "status": {
                "conditions": [{"type": "Deployed", "status": "True"}]
            }
        }))
        .unwrap();

        assert_eq!(sensor.name(), "webhook");
        assert_eq!(sensor.namespace(), "argo-events");
        assert_eq!(sensor.trigger_names(), vec!["workflow-trigger".to_string()]);
        assert_eq!(sensor.spec.dependencies[0].event_source_name, "webhook");
        assert!(sensor.spec.extra.contains_key("template"));
        assert_eq!(sensor.status_icon(), StatusIcon::Healthy);
        assert_eq!(sensor.node_id().to_string(), "argo-events/Sensor/webhook");
    }
}
