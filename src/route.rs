use anyhow::Result;
use std::fmt::{Display, Formatter};
use url::form_urlencoded;

const SENSORS_SEGMENT: &str = "sensors";
const EVENT_FLOW_SEGMENT: &str = "event-flow";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Route {
    SensorList {
        namespace: String,
        side_panel: bool,
        selected_node: Option<String>,
    },
    SensorDetail {
        namespace: String,
        name: String,
    },
    EventFlow {
        namespace: String,
    },
}

impl Route {
    pub fn sensor_list(namespace: impl Into<String>) -> Self {
        Self::SensorList {
            namespace: namespace.into(),
            side_panel: false,
            selected_node: None,
        }
    }

    /// Parses `sensors/{ns?}[?query]`, `sensors/{ns}/{name}` and `event-flow/{ns?}`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        let segments = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();

        match segments.as_slice() {
            [] => Ok(Self::sensor_list("")),
            [SENSORS_SEGMENT] => Ok(Self::list_from_query("", query)),
            [SENSORS_SEGMENT, namespace] => Ok(Self::list_from_query(namespace, query)),
            [SENSORS_SEGMENT, namespace, name] => Ok(Self::SensorDetail {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            [EVENT_FLOW_SEGMENT] => Ok(Self::EventFlow {
                namespace: String::new(),
            }),
            [EVENT_FLOW_SEGMENT, namespace] => Ok(Self::EventFlow {
                namespace: namespace.to_string(),
            }),
            _ => anyhow::bail!("unsupported route '{raw}'"),
        }
    }

    fn list_from_query(namespace: &str, query: &str) -> Self {
        let params = QueryParams::parse(query);
        Self::SensorList {
            namespace: namespace.to_string(),
            side_panel: params.side_panel,
            selected_node: params.selected_node,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::SensorList { namespace, .. }
            | Self::SensorDetail { namespace, .. }
            | Self::EventFlow { namespace } => namespace,
        }
    }

    /// Renders the route, dropping the namespace segment of list routes
    /// when the namespace is managed by configuration.
    pub fn render(&self, managed_namespace: bool) -> String {
        match self {
            Self::SensorList {
                namespace,
                side_panel,
                selected_node,
            } => {
                let mut path = SENSORS_SEGMENT.to_string();
                if !managed_namespace && !namespace.is_empty() {
                    path.push('/');
                    path.push_str(namespace);
                }
                let mut query = form_urlencoded::Serializer::new(String::new());
                let mut has_query = false;
                if *side_panel {
                    query.append_pair("sidePanel", "true");
                    has_query = true;
                }
                if let Some(selected_node) = selected_node.as_deref().filter(|id| !id.is_empty())
                {
                    query.append_pair("selectedNode", selected_node);
                    has_query = true;
                }
                if has_query {
                    format!("{path}?{}", query.finish())
                } else {
                    path
                }
            }
            Self::SensorDetail { namespace, name } => {
                format!("{SENSORS_SEGMENT}/{namespace}/{name}")
            }
            Self::EventFlow { namespace } => {
                if namespace.is_empty() {
                    EVENT_FLOW_SEGMENT.to_string()
                } else {
                    format!("{EVENT_FLOW_SEGMENT}/{namespace}")
                }
            }
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct QueryParams {
    pub side_panel: bool,
    pub selected_node: Option<String>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "sidePanel" => params.side_panel = value == "true",
                "selectedNode" if !value.is_empty() => {
                    params.selected_node = Some(value.into_owned())
                }
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum HistoryMode {
    #[default]
    Push,
    Replace,
}

/// In-process navigation history. The current entry is the source of truth
/// for the view's route-backed state.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Route>,
    cursor: usize,
}

impl History {
    pub fn new(initial: Route) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &Route {
        &self.entries[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn push(&mut self, route: Route) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(route);
        self.cursor = self.entries.len() - 1;
    }

    pub fn replace(&mut self, route: Route) {
        self.entries[self.cursor] = route;
    }

    pub fn write(&mut self, mode: HistoryMode, route: Route) {
        match mode {
            HistoryMode::Push => self.push(route),
            HistoryMode::Replace => self.replace(route),
        }
    }

    pub fn back(&mut self) -> Option<&Route> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn forward(&mut self) -> Option<&Route> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }
}
