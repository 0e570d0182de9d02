use crate::config::SENSOR_LIST_CREATION;
use crate::input::Action;
use crate::model::{ListBranch, NodeId, SelectedNode, Sensor, SensorRow, sensor_template};
use crate::route::{History, HistoryMode, Route};
use chrono::{DateTime, Local};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tracing::debug;

pub const OPENED_SENSOR_LIST: &str = "openedSensorList";

pub const LEARN_MORE_URL: &str = "https://argoproj.github.io/argo-events/concepts/sensor/";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Namespace,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PanelTab {
    Summary,
    Logs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Batch(Vec<AppCommand>),
    CollectEvent {
        name: String,
    },
    LoadSensors {
        seq: u64,
        namespace: String,
    },
    LoadSensorDetail {
        namespace: String,
        name: String,
    },
    LoadSensorLogs {
        namespace: String,
        name: String,
    },
    LoadNamespaces,
    CreateSensor {
        namespace: String,
        template: String,
    },
    PersistSetting {
        key: String,
        value: bool,
    },
}

impl AppCommand {
    pub fn into_commands(self) -> Vec<AppCommand> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(commands) => commands
                .into_iter()
                .flat_map(AppCommand::into_commands)
                .collect(),
            command => vec![command],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub managed_namespace: Option<String>,
    pub history_mode: HistoryMode,
    pub display_iso_format: bool,
}

#[derive(Debug, Clone)]
struct RemoteText {
    namespace: String,
    name: String,
    content: Option<Result<String, String>>,
}

impl RemoteText {
    fn pending(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            content: None,
        }
    }

    fn is_for(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

pub struct App {
    running: bool,
    mode: InputMode,
    managed_namespace: Option<String>,
    history_mode: HistoryMode,
    history: History,
    first_render: bool,
    namespace: String,
    side_panel: bool,
    selected_node: Option<String>,
    display_iso_format: bool,
    error: Option<String>,
    sensors: Option<Vec<Sensor>>,
    fetch_seq: u64,
    loaded_at: Option<DateTime<Local>>,
    selected_row: usize,
    panel_tab: PanelTab,
    detail: Option<RemoteText>,
    logs: Option<RemoteText>,
    scroll: u16,
    namespaces: Vec<String>,
    input: String,
    completion_index: usize,
    status: String,
    show_help: bool,
    table_page_size: usize,
    cluster: String,
    context: String,
}

impl App {
    pub fn new(route: Route, options: ViewOptions) -> Self {
        let managed_namespace = options.managed_namespace.clone();
        let namespace = managed_namespace
            .clone()
            .unwrap_or_else(|| route.namespace().to_string());
        let (side_panel, selected_node) = match &route {
            Route::SensorList {
                side_panel,
                selected_node,
                ..
            } => (*side_panel, selected_node.clone()),
            _ => (false, None),
        };

        Self {
            running: true,
            mode: InputMode::Normal,
            managed_namespace,
            history_mode: options.history_mode,
            history: History::new(route),
            first_render: true,
            namespace,
            side_panel,
            selected_node,
            display_iso_format: options.display_iso_format,
            error: None,
            sensors: None,
            fetch_seq: 0,
            loaded_at: None,
            selected_row: 0,
            panel_tab: PanelTab::Summary,
            detail: None,
            logs: None,
            scroll: 0,
            namespaces: Vec::new(),
            input: String::new(),
            completion_index: 0,
            status: "Ready".to_string(),
            show_help: false,
            table_page_size: 10,
            cluster: "-".to_string(),
            context: "-".to_string(),
        }
    }

    pub fn mount(&mut self) -> AppCommand {
        self.sync_route();
        let mut commands = Vec::new();
        if self.on_list_route() {
            commands.push(AppCommand::CollectEvent {
                name: OPENED_SENSOR_LIST.to_string(),
            });
        }
        commands.push(self.load_sensors());
        commands.push(AppCommand::LoadNamespaces);
        if let Route::SensorDetail { namespace, name } = self.history.current().clone() {
            commands.push(self.open_detail(&namespace, &name));
        }
        AppCommand::Batch(commands)
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn route(&self) -> &Route {
        self.history.current()
    }

    pub fn route_text(&self) -> String {
        self.route().render(self.managed_namespace.is_some())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn namespace_label(&self) -> &str {
        if self.namespace.is_empty() {
            "all"
        } else {
            &self.namespace
        }
    }

    pub fn managed_namespace(&self) -> Option<&str> {
        self.managed_namespace.as_deref()
    }

    pub fn side_panel_open(&self) -> bool {
        self.side_panel
    }

    pub fn selected_node(&self) -> Option<&str> {
        self.selected_node.as_deref()
    }

    pub fn display_iso_format(&self) -> bool {
        self.display_iso_format
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sensors(&self) -> Option<&[Sensor]> {
        self.sensors.as_deref()
    }

    pub fn loaded_at(&self) -> Option<String> {
        self.loaded_at
            .map(|loaded| loaded.format("%H:%M:%S").to_string())
    }

    pub fn panel_tab(&self) -> PanelTab {
        self.panel_tab
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn completion_index(&self) -> usize {
        self.completion_index
    }

    pub fn set_kube_target(&mut self, cluster: String, context: String) {
        self.cluster = cluster;
        self.context = context;
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn set_table_page_size(&mut self, rows: usize) {
        self.table_page_size = rows.max(1);
    }

    pub fn selected_row_index(&self) -> Option<usize> {
        match self.sensors.as_deref() {
            Some(sensors) if !sensors.is_empty() => {
                Some(self.selected_row.min(sensors.len().saturating_sub(1)))
            }
            _ => None,
        }
    }

    pub fn branch(&self) -> ListBranch {
        match (&self.error, &self.sensors) {
            (Some(_), _) => ListBranch::Error,
            (None, None) => ListBranch::Loading,
            (None, Some(sensors)) if sensors.is_empty() => ListBranch::ZeroState,
            (None, Some(_)) => ListBranch::Populated,
        }
    }

    pub fn rows(&self) -> Vec<SensorRow> {
        self.sensors
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|sensor| SensorRow {
                icon: sensor.status_icon(),
                name: sensor.name().to_string(),
                namespace: sensor.namespace().to_string(),
                created: format_timestamp(
                    sensor.metadata.creation_timestamp.as_ref(),
                    self.display_iso_format,
                ),
                link: Route::SensorDetail {
                    namespace: sensor.namespace().to_string(),
                    name: sensor.name().to_string(),
                }
                .to_string(),
            })
            .collect()
    }

    pub fn resolve_selected(&self) -> Option<SelectedNode<'_>> {
        let selected = self.selected_node.as_deref()?;
        let id = NodeId::split(selected);
        let value = self
            .sensors
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|sensor| sensor.matches(&id.namespace, &id.name));
        Some(SelectedNode { id, value })
    }

    pub fn detail_title(&self) -> String {
        match &self.detail {
            Some(detail) => format!("Sensor {}/{}", detail.namespace, detail.name),
            None => "Sensor".to_string(),
        }
    }

    pub fn detail_text(&self) -> Result<&str, &str> {
        match self.detail.as_ref().and_then(|detail| detail.content.as_ref()) {
            Some(Ok(text)) => Ok(text),
            Some(Err(error)) => Err(error),
            None => Ok("Loading…"),
        }
    }

    pub fn logs_text(&self) -> Result<&str, &str> {
        match self.logs.as_ref().and_then(|logs| logs.content.as_ref()) {
            Some(Ok(text)) if text.trim().is_empty() => Ok("No log lines yet."),
            Some(Ok(text)) => Ok(text),
            Some(Err(error)) => Err(error),
            None => Ok("Loading logs…"),
        }
    }

    pub fn event_flow_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for sensor in self.sensors.as_deref().unwrap_or(&[]) {
            let sensor_label = format!("{}/{}", sensor.namespace(), sensor.name());
            if sensor.spec.dependencies.is_empty() {
                lines.push(format!("(no dependencies) ──▶ {sensor_label}"));
            }
            for dependency in &sensor.spec.dependencies {
                lines.push(format!(
                    "{}:{} ──▶ {sensor_label} ({})",
                    dependency.event_source_name, dependency.event_name, dependency.name
                ));
            }
            for trigger in sensor.trigger_names() {
                lines.push(format!("{sensor_label} ──▶ {trigger}"));
            }
        }
        lines
    }

    pub fn creator_template(&self) -> String {
        sensor_template(&self.namespace)
    }

    pub fn namespace_completions(&self) -> Vec<String> {
        let query = self.input.trim().to_ascii_lowercase();
        let mut candidates = self
            .namespaces
            .iter()
            .filter(|namespace| query.is_empty() || namespace.contains(&query))
            .cloned()
            .collect::<Vec<_>>();
        candidates.sort_by_key(|namespace| !namespace.starts_with(&query));
        candidates.truncate(24);
        candidates
    }

    pub fn set_namespaces(&mut self, mut namespaces: Vec<String>) {
        namespaces.sort();
        namespaces.dedup();
        self.namespaces = namespaces;
    }

    pub fn load_sensors(&mut self) -> AppCommand {
        self.fetch_seq += 1;
        AppCommand::LoadSensors {
            seq: self.fetch_seq,
            namespace: self.namespace.clone(),
        }
    }

    pub fn apply_sensor_list(&mut self, seq: u64, result: Result<Vec<Sensor>, String>) -> bool {
        if seq != self.fetch_seq {
            debug!(seq, latest = self.fetch_seq, "dropping stale sensor list");
            return false;
        }

        match result {
            Ok(sensors) => {
                let selected_identity = self.selected_row_identity();
                self.status = format!(
                    "Loaded {} sensors in {}",
                    sensors.len(),
                    self.namespace_label()
                );
                self.sensors = Some(sensors);
                self.error = None;
                self.loaded_at = Some(Local::now());
                self.restore_row_selection(selected_identity);
            }
            Err(error) => {
                self.status = normalize_status_text(format!(
                    "Sensor list failed: {}",
                    summarize_error_line(&error)
                ));
                self.error = Some(error);
            }
        }
        true
    }

    pub fn set_sensor_detail(&mut self, namespace: &str, name: &str, result: Result<Sensor, String>) {
        let Some(detail) = self.detail.as_mut().filter(|detail| detail.is_for(namespace, name))
        else {
            return;
        };
        detail.content = Some(result.map(|sensor| yaml_detail(&sensor)));
    }

    pub fn set_sensor_logs(&mut self, namespace: &str, name: &str, result: Result<String, String>) {
        let Some(logs) = self.logs.as_mut().filter(|logs| logs.is_for(namespace, name)) else {
            return;
        };
        logs.content = Some(result);
    }

    pub fn on_sensor_created(&mut self, sensor: &Sensor) -> AppCommand {
        self.status = format!("Created sensor {}/{}", sensor.namespace(), sensor.name());
        self.navigate(Route::SensorDetail {
            namespace: sensor.namespace().to_string(),
            name: sensor.name().to_string(),
        })
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        if self.mode == InputMode::Namespace {
            return self.apply_input_action(action);
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::Down => self.move_cursor(1),
            Action::Up => self.move_cursor(-1),
            Action::PageDown => self.move_cursor(self.table_page_size as isize),
            Action::PageUp => self.move_cursor(-(self.table_page_size as isize)),
            Action::Top => self.move_cursor(isize::MIN / 2),
            Action::Bottom => self.move_cursor(isize::MAX / 2),
            Action::OpenSelected => self.open_selected(),
            Action::ShowLogs => self.show_selected_logs(),
            Action::CreateSensor => self.create_sensor(),
            Action::StartNamespaceFilter => self.start_namespace_filter(),
            Action::ToggleTimestampFormat => {
                self.display_iso_format = !self.display_iso_format;
                self.status = if self.display_iso_format {
                    "Timestamps: ISO".to_string()
                } else {
                    "Timestamps: relative".to_string()
                };
                AppCommand::PersistSetting {
                    key: SENSOR_LIST_CREATION.to_string(),
                    value: self.display_iso_format,
                }
            }
            Action::ShowEventFlow => {
                if !self.on_list_route() || self.branch() != ListBranch::Populated {
                    self.status = "Event flow needs a loaded sensor list".to_string();
                    return AppCommand::None;
                }
                self.navigate(Route::EventFlow {
                    namespace: self.namespace.clone(),
                })
            }
            Action::HistoryBack => self.history_back(),
            Action::HistoryForward => {
                let was_list = self.on_list_route();
                if self.history.forward().is_none() {
                    self.status = "Already at the newest entry".to_string();
                    return AppCommand::None;
                }
                self.on_route_changed(was_list)
            }
            Action::NextPanelTab => self.toggle_panel_tab(),
            Action::Close => self.close(),
            Action::SubmitInput
            | Action::CompleteInput
            | Action::NextSuggestion
            | Action::PrevSuggestion
            | Action::CancelInput
            | Action::Backspace
            | Action::InputChar(_) => AppCommand::None,
        }
    }

    fn apply_input_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                self.completion_index = 0;
                self.status = "Namespace unchanged".to_string();
                AppCommand::None
            }
            Action::SubmitInput => {
                let namespace = self.input.trim().to_string();
                self.mode = InputMode::Normal;
                self.input.clear();
                self.completion_index = 0;
                self.set_namespace(namespace)
            }
            Action::CompleteInput => {
                let completions = self.namespace_completions();
                if let Some(candidate) = completions
                    .get(self.completion_index.min(completions.len().saturating_sub(1)))
                {
                    self.input = candidate.clone();
                }
                AppCommand::None
            }
            Action::NextSuggestion => {
                self.bump_completion(1);
                AppCommand::None
            }
            Action::PrevSuggestion => {
                self.bump_completion(-1);
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                self.completion_index = 0;
                AppCommand::None
            }
            Action::InputChar(c) => {
                self.input.push(c);
                self.completion_index = 0;
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    pub fn set_namespace(&mut self, namespace: String) -> AppCommand {
        if let Some(managed) = &self.managed_namespace {
            self.status = format!("Namespace is managed: {managed}");
            return AppCommand::None;
        }
        if namespace == self.namespace {
            self.status = format!("Namespace unchanged: {}", self.namespace_label());
            return AppCommand::None;
        }

        self.namespace = namespace;
        self.selected_row = 0;
        self.sync_route();
        self.status = format!("Loading sensors in {}", self.namespace_label());
        self.load_sensors()
    }

    fn sync_route(&mut self) {
        if self.first_render {
            self.first_render = false;
            return;
        }
        let route = Route::SensorList {
            namespace: self.namespace.clone(),
            side_panel: self.side_panel,
            selected_node: self.selected_node.clone(),
        };
        if self.history.current() == &route {
            return;
        }
        debug!(route = %route, "syncing route");
        self.history.write(self.history_mode, route);
    }

    fn set_side_panel(&mut self, open: bool) {
        self.set_query_state(open, self.selected_node.clone());
    }

    fn set_selected_node(&mut self, selected: Option<String>) {
        self.set_query_state(self.side_panel, selected);
    }

    // One route write per user action, however many query fields change.
    fn set_query_state(&mut self, side_panel: bool, selected: Option<String>) {
        if self.side_panel == side_panel && self.selected_node == selected {
            return;
        }
        self.side_panel = side_panel;
        self.selected_node = selected;
        self.sync_route();
    }

    fn navigate(&mut self, route: Route) -> AppCommand {
        let was_list = self.on_list_route();
        debug!(route = %route, "navigating");
        self.history.push(route);
        self.on_route_changed(was_list)
    }

    fn history_back(&mut self) -> AppCommand {
        let was_list = self.on_list_route();
        if self.history.back().is_none() {
            self.status = "Already at the oldest entry".to_string();
            return AppCommand::None;
        }
        self.on_route_changed(was_list)
    }

    fn on_route_changed(&mut self, was_list: bool) -> AppCommand {
        self.scroll = 0;
        match self.history.current().clone() {
            Route::SensorList {
                namespace,
                side_panel,
                selected_node,
            } => {
                self.side_panel = side_panel;
                self.selected_node = selected_node;
                let namespace = self.effective_namespace(namespace);
                if !was_list {
                    self.namespace = namespace;
                    return AppCommand::Batch(vec![
                        AppCommand::CollectEvent {
                            name: OPENED_SENSOR_LIST.to_string(),
                        },
                        self.load_sensors(),
                    ]);
                }
                if namespace != self.namespace {
                    self.namespace = namespace;
                    return self.load_sensors();
                }
                AppCommand::None
            }
            Route::SensorDetail { namespace, name } => self.open_detail(&namespace, &name),
            Route::EventFlow { namespace } => {
                let namespace = self.effective_namespace(namespace);
                if namespace != self.namespace {
                    self.namespace = namespace;
                    return self.load_sensors();
                }
                AppCommand::None
            }
        }
    }

    fn open_detail(&mut self, namespace: &str, name: &str) -> AppCommand {
        self.detail = Some(RemoteText::pending(namespace, name));
        self.scroll = 0;
        AppCommand::LoadSensorDetail {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    fn effective_namespace(&self, requested: String) -> String {
        self.managed_namespace.clone().unwrap_or(requested)
    }

    fn on_list_route(&self) -> bool {
        matches!(self.history.current(), Route::SensorList { .. })
    }

    fn sensor_panel_open(&self) -> bool {
        self.on_list_route() && self.selected_node.is_some()
    }

    fn creator_open(&self) -> bool {
        self.on_list_route() && self.side_panel && self.selected_node.is_none()
    }

    fn selected_sensor(&self) -> Option<&Sensor> {
        let index = self.selected_row_index()?;
        self.sensors.as_deref()?.get(index)
    }

    fn move_cursor(&mut self, delta: isize) -> AppCommand {
        if !self.on_list_route() {
            self.scroll = offset_u16(self.scroll, delta);
            return AppCommand::None;
        }
        if self.sensor_panel_open() {
            if self.panel_tab == PanelTab::Logs {
                self.scroll = offset_u16(self.scroll, delta);
                return AppCommand::None;
            }
            self.move_trigger_selection(delta);
            return AppCommand::None;
        }

        let len = self.sensors.as_deref().map(<[Sensor]>::len).unwrap_or(0);
        if len == 0 {
            self.selected_row = 0;
            return AppCommand::None;
        }
        let max_index = len.saturating_sub(1) as isize;
        let current = self.selected_row.min(max_index as usize) as isize;
        self.selected_row = current.saturating_add(delta).clamp(0, max_index) as usize;
        AppCommand::None
    }

    fn move_trigger_selection(&mut self, delta: isize) {
        let Some(selected) = self.resolve_selected() else {
            return;
        };
        let Some(sensor) = selected.value else {
            return;
        };
        let triggers = sensor.trigger_names();
        if triggers.is_empty() {
            return;
        }
        let max_index = triggers.len().saturating_sub(1) as isize;
        let next = match selected
            .id
            .key
            .as_deref()
            .and_then(|key| triggers.iter().position(|trigger| trigger == key))
        {
            Some(current) => (current as isize).saturating_add(delta).clamp(0, max_index),
            None if delta >= 0 => 0,
            None => max_index,
        } as usize;
        let id = NodeId::new(&selected.id.namespace, &selected.id.kind, &selected.id.name)
            .with_key(triggers[next].clone());
        self.set_selected_node(Some(id.to_string()));
    }

    fn open_selected(&mut self) -> AppCommand {
        if !self.on_list_route() {
            return AppCommand::None;
        }
        if self.creator_open() {
            return self.create_sensor();
        }
        if self.sensor_panel_open() {
            return self.toggle_panel_tab();
        }
        let Some(sensor) = self.selected_sensor() else {
            self.status = "No sensor selected".to_string();
            return AppCommand::None;
        };
        let route = Route::SensorDetail {
            namespace: sensor.namespace().to_string(),
            name: sensor.name().to_string(),
        };
        self.navigate(route)
    }

    fn show_selected_logs(&mut self) -> AppCommand {
        if !self.on_list_route() {
            return AppCommand::None;
        }
        let Some(sensor) = self.selected_sensor() else {
            self.status = "No sensor selected".to_string();
            return AppCommand::None;
        };
        let id = sensor.node_id().to_string();
        self.set_selected_node(Some(id));
        self.panel_tab = PanelTab::Logs;
        self.request_logs()
    }

    fn toggle_panel_tab(&mut self) -> AppCommand {
        if !self.sensor_panel_open() {
            return AppCommand::None;
        }
        self.scroll = 0;
        self.panel_tab = match self.panel_tab {
            PanelTab::Summary => PanelTab::Logs,
            PanelTab::Logs => PanelTab::Summary,
        };
        if self.panel_tab == PanelTab::Logs {
            return self.request_logs();
        }
        AppCommand::None
    }

    fn request_logs(&mut self) -> AppCommand {
        let Some(selected) = self.resolve_selected() else {
            return AppCommand::None;
        };
        let (namespace, name) = (selected.id.namespace.clone(), selected.id.name.clone());
        self.logs = Some(RemoteText::pending(&namespace, &name));
        self.scroll = 0;
        AppCommand::LoadSensorLogs { namespace, name }
    }

    fn create_sensor(&mut self) -> AppCommand {
        if !self.on_list_route() {
            return AppCommand::None;
        }
        if !self.creator_open() {
            self.set_query_state(true, None);
            self.status = "Create sensor: Enter to edit the template, Esc to close".to_string();
            return AppCommand::None;
        }
        AppCommand::CreateSensor {
            namespace: self.namespace.clone(),
            template: self.creator_template(),
        }
    }

    fn start_namespace_filter(&mut self) -> AppCommand {
        if !self.on_list_route() {
            return AppCommand::None;
        }
        if let Some(managed) = &self.managed_namespace {
            self.status = format!("Namespace is managed: {managed}");
            return AppCommand::None;
        }
        self.mode = InputMode::Namespace;
        self.input = self.namespace.clone();
        self.completion_index = 0;
        self.status = "Namespace filter (empty = all namespaces)".to_string();
        AppCommand::None
    }

    fn close(&mut self) -> AppCommand {
        if !self.on_list_route() {
            if self.history.can_go_back() {
                return self.history_back();
            }
            return self.navigate(Route::sensor_list(self.namespace.clone()));
        }
        if self.selected_node.is_some() {
            self.panel_tab = PanelTab::Summary;
            self.set_selected_node(None);
        } else if self.side_panel {
            self.set_side_panel(false);
        }
        AppCommand::None
    }

    fn bump_completion(&mut self, direction: isize) {
        let len = self.namespace_completions().len();
        if len == 0 {
            self.completion_index = 0;
            return;
        }
        let current = self.completion_index.min(len - 1) as isize;
        self.completion_index = (current + direction).rem_euclid(len as isize) as usize;
    }

    fn selected_row_identity(&self) -> Option<(String, String)> {
        self.selected_sensor()
            .map(|sensor| (sensor.namespace().to_string(), sensor.name().to_string()))
    }

    fn restore_row_selection(&mut self, identity: Option<(String, String)>) {
        let len = self.sensors.as_deref().map(<[Sensor]>::len).unwrap_or(0);
        let found = identity.and_then(|(namespace, name)| {
            self.sensors
                .as_deref()?
                .iter()
                .position(|sensor| sensor.matches(&namespace, &name))
        });
        self.selected_row = found.unwrap_or(self.selected_row.min(len.saturating_sub(1)));
    }
}

pub fn format_timestamp(timestamp: Option<&Time>, iso: bool) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };
    if iso {
        return timestamp.0.to_string();
    }
    let elapsed =
        (k8s_openapi::jiff::Timestamp::now().as_second() - timestamp.0.as_second()).max(0);
    format!("{} ago", format_elapsed_seconds(elapsed))
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

fn yaml_detail(sensor: &Sensor) -> String {
    serde_yaml::to_string(sensor).unwrap_or_else(|error| format!("failed to format detail: {error}"))
}

fn offset_u16(value: u16, delta: isize) -> u16 {
    (value as isize).saturating_add(delta).clamp(0, u16::MAX as isize) as u16
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

fn normalize_status_text(status: String) -> String {
    status
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{
        App, AppCommand, OPENED_SENSOR_LIST, PanelTab, ViewOptions, format_elapsed_seconds,
        format_timestamp,
    };
    use crate::input::Action;
    use crate::model::{
        Condition, ListBranch, Sensor, SensorSpec, SensorStatus, StatusIcon, Trigger,
        TriggerTemplate,
    };
    use crate::route::{HistoryMode, Route};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

    fn sensor(namespace: &str, name: &str) -> Sensor {
        Sensor {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            ..Sensor::default()
        }
    }

    fn sensor_with_triggers(namespace: &str, name: &str, triggers: &[&str]) -> Sensor {
        Sensor {
            spec: SensorSpec {
                triggers: triggers
                    .iter()
                    .map(|trigger| Trigger {
                        template: Some(TriggerTemplate {
                            name: trigger.to_string(),
                            ..TriggerTemplate::default()
                        }),
                        ..Trigger::default()
                    })
                    .collect(),
                ..SensorSpec::default()
            },
            ..sensor(namespace, name)
        }
    }

    fn mounted(route: &str) -> (App, u64) {
        let mut app = App::new(Route::parse(route).unwrap(), ViewOptions::default());
        let seq = app
            .mount()
            .into_commands()
            .into_iter()
            .find_map(|command| match command {
                AppCommand::LoadSensors { seq, .. } => Some(seq),
                _ => None,
            })
            .unwrap();
        (app, seq)
    }

    fn type_namespace(app: &mut App, namespace: &str) -> AppCommand {
        app.apply_action(Action::StartNamespaceFilter);
        for _ in 0..app.input().len() {
            app.apply_action(Action::Backspace);
        }
        for c in namespace.chars() {
            app.apply_action(Action::InputChar(c));
        }
        app.apply_action(Action::SubmitInput)
    }

    #[test]
    fn mount_reads_route_without_navigating() {
        let (app, _) = mounted("sensors/ns1?sidePanel=true&selectedNode=ns1/Sensor/foo");
        assert!(app.side_panel_open());
        assert_eq!(app.selected_node(), Some("ns1/Sensor/foo"));
        assert_eq!(app.namespace(), "ns1");
        assert_eq!(app.history_len(), 1);
    }

    #[test]
    fn mount_collects_event_once_and_fetches() {
        let mut app = App::new(Route::sensor_list("default"), ViewOptions::default());
        let commands = app.mount().into_commands();
        let collected = commands
            .iter()
            .filter(|command| {
                matches!(command, AppCommand::CollectEvent { name } if name == OPENED_SENSOR_LIST)
            })
            .count();
        assert_eq!(collected, 1);
        assert!(commands.contains(&AppCommand::LoadSensors {
            seq: 1,
            namespace: "default".to_string(),
        }));
        assert_eq!(app.branch(), ListBranch::Loading);
    }

    #[test]
    fn namespace_change_issues_one_fetch_and_clears_error() {
        let (mut app, seq) = mounted("sensors/default");
        assert!(app.apply_sensor_list(seq, Err("connection refused".to_string())));
        assert_eq!(app.branch(), ListBranch::Error);

        let command = type_namespace(&mut app, "argo-events");
        let AppCommand::LoadSensors { seq, namespace } = command else {
            panic!("expected a single fetch, got {command:?}");
        };
        assert_eq!(namespace, "argo-events");
        assert_eq!(app.route().to_string(), "sensors/argo-events");

        assert!(app.apply_sensor_list(seq, Ok(vec![sensor("argo-events", "a")])));
        assert_eq!(app.error(), None);
        assert_eq!(app.branch(), ListBranch::Populated);
    }

    #[test]
    fn same_namespace_does_not_refetch() {
        let (mut app, _) = mounted("sensors/default");
        assert_eq!(type_namespace(&mut app, "default"), AppCommand::None);
        assert_eq!(app.history_len(), 1);
    }

    #[test]
    fn failure_keeps_previous_list() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(vec![sensor("default", "a")]));
        let AppCommand::LoadSensors { seq, .. } = type_namespace(&mut app, "other") else {
            panic!("expected fetch");
        };
        app.apply_sensor_list(seq, Err("forbidden".to_string()));
        assert_eq!(app.branch(), ListBranch::Error);
        assert_eq!(app.sensors().map(<[Sensor]>::len), Some(1));
    }

    #[test]
    fn stale_fetch_results_are_dropped() {
        let (mut app, first) = mounted("sensors/one");
        let AppCommand::LoadSensors { seq: second, .. } = type_namespace(&mut app, "two") else {
            panic!("expected fetch");
        };

        assert!(app.apply_sensor_list(second, Ok(vec![sensor("two", "b")])));
        assert!(!app.apply_sensor_list(first, Ok(vec![sensor("one", "a")])));
        assert_eq!(app.rows()[0].namespace, "two");
    }

    #[test]
    fn empty_list_shows_zero_state() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(Vec::new()));
        assert_eq!(app.branch(), ListBranch::ZeroState);
        assert!(app.rows().is_empty());
    }

    #[test]
    fn rows_follow_response_order_with_detail_links() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(
            seq,
            Ok(vec![sensor("default", "a"), sensor("default", "b")]),
        );

        let rows = app.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "a");
        assert_eq!(rows[1].name, "b");
        assert_eq!(rows[0].link, "sensors/default/a");
        assert_eq!(rows[1].link, "sensors/default/b");
        assert!(rows.iter().all(|row| row.icon == StatusIcon::Neutral));
        assert!(rows.iter().all(|row| row.created == "-"));
    }

    #[test]
    fn failed_condition_marks_row() {
        let (mut app, seq) = mounted("sensors/default");
        let mut failing = sensor("default", "broken");
        failing.status = Some(SensorStatus {
            conditions: vec![Condition {
                type_: "Deployed".to_string(),
                status: "False".to_string(),
                ..Condition::default()
            }],
            ..SensorStatus::default()
        });
        app.apply_sensor_list(seq, Ok(vec![failing]));
        assert_eq!(app.rows()[0].icon, StatusIcon::Failed);
    }

    #[test]
    fn unknown_selected_node_resolves_to_none() {
        let (mut app, seq) = mounted("sensors/ns1?selectedNode=ns1/Sensor/missing");
        app.apply_sensor_list(seq, Ok(vec![sensor("ns1", "present")]));
        let selected = app.resolve_selected().unwrap();
        assert_eq!(selected.id.name, "missing");
        assert!(selected.value.is_none());
    }

    #[test]
    fn selected_node_resolves_before_and_after_load() {
        let (mut app, seq) = mounted("sensors/ns1?selectedNode=ns1/Sensor/foo");
        assert!(app.resolve_selected().unwrap().value.is_none());
        app.apply_sensor_list(seq, Ok(vec![sensor("ns1", "foo")]));
        assert_eq!(app.resolve_selected().unwrap().value.unwrap().name(), "foo");
    }

    #[test]
    fn logs_affordance_opens_side_panel_without_navigating() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(vec![sensor("default", "a"), sensor("default", "b")]));
        app.apply_action(Action::Down);

        let command = app.apply_action(Action::ShowLogs);
        assert_eq!(
            command,
            AppCommand::LoadSensorLogs {
                namespace: "default".to_string(),
                name: "b".to_string(),
            }
        );
        assert_eq!(app.selected_node(), Some("default/Sensor/b"));
        assert_eq!(app.panel_tab(), PanelTab::Logs);
        assert_eq!(
            app.route().to_string(),
            "sensors/default?selectedNode=default%2FSensor%2Fb"
        );
        assert!(matches!(app.route(), Route::SensorList { .. }));
    }

    #[test]
    fn row_enter_navigates_to_detail_and_back_remounts() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(vec![sensor("default", "a")]));

        let command = app.apply_action(Action::OpenSelected);
        assert_eq!(
            command,
            AppCommand::LoadSensorDetail {
                namespace: "default".to_string(),
                name: "a".to_string(),
            }
        );
        assert_eq!(app.route().to_string(), "sensors/default/a");

        let commands = app.apply_action(Action::Close).into_commands();
        assert!(matches!(app.route(), Route::SensorList { .. }));
        assert!(
            commands
                .iter()
                .any(|command| matches!(command, AppCommand::LoadSensors { .. }))
        );
    }

    #[test]
    fn history_back_restores_query_state() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(vec![sensor("default", "a")]));
        app.apply_action(Action::ShowLogs);
        app.apply_action(Action::Close);
        assert_eq!(app.selected_node(), None);

        assert_eq!(app.apply_action(Action::HistoryBack), AppCommand::None);
        assert_eq!(app.selected_node(), Some("default/Sensor/a"));
        app.apply_action(Action::HistoryBack);
        assert_eq!(app.selected_node(), None);
        app.apply_action(Action::HistoryForward);
        assert_eq!(app.selected_node(), Some("default/Sensor/a"));
    }

    #[test]
    fn history_back_across_namespaces_refetches() {
        let (mut app, _) = mounted("sensors/one");
        type_namespace(&mut app, "two");
        let command = app.apply_action(Action::HistoryBack);
        assert!(matches!(command, AppCommand::LoadSensors { ref namespace, .. } if namespace == "one"));
        assert_eq!(app.namespace(), "one");
    }

    #[test]
    fn replace_mode_does_not_grow_history() {
        let mut app = App::new(
            Route::sensor_list("default"),
            ViewOptions {
                history_mode: HistoryMode::Replace,
                ..ViewOptions::default()
            },
        );
        app.mount();
        type_namespace(&mut app, "other");
        app.apply_action(Action::CreateSensor);
        assert_eq!(app.history_len(), 1);
        assert_eq!(app.route().to_string(), "sensors/other?sidePanel=true");
    }

    #[test]
    fn create_opens_panel_then_requests_creation() {
        let (mut app, _) = mounted("sensors/argo-events");
        assert_eq!(app.apply_action(Action::CreateSensor), AppCommand::None);
        assert!(app.side_panel_open());
        assert_eq!(app.route().to_string(), "sensors/argo-events?sidePanel=true");

        let AppCommand::CreateSensor {
            namespace,
            template,
        } = app.apply_action(Action::OpenSelected)
        else {
            panic!("expected create command");
        };
        assert_eq!(namespace, "argo-events");
        assert!(template.contains("namespace: argo-events"));

        app.apply_action(Action::Close);
        assert!(!app.side_panel_open());
    }

    #[test]
    fn created_sensor_opens_detail_route() {
        let (mut app, _) = mounted("sensors/argo-events?sidePanel=true");
        let command = app.on_sensor_created(&sensor("argo-events", "fresh"));
        assert_eq!(app.route().to_string(), "sensors/argo-events/fresh");
        assert!(matches!(command, AppCommand::LoadSensorDetail { .. }));
    }

    #[test]
    fn create_from_sensor_panel_writes_one_history_entry() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(vec![sensor("default", "a")]));
        app.apply_action(Action::ShowLogs);
        let before = app.history_len();

        app.apply_action(Action::CreateSensor);
        assert_eq!(app.history_len(), before + 1);
        assert_eq!(app.route().to_string(), "sensors/default?sidePanel=true");

        app.apply_action(Action::HistoryBack);
        assert!(!app.side_panel_open());
        assert_eq!(app.selected_node(), Some("default/Sensor/a"));
    }

    #[test]
    fn mount_on_detail_route_defers_list_telemetry() {
        let mut app = App::new(Route::parse("sensors/default/a").unwrap(), ViewOptions::default());
        let opened = |commands: &[AppCommand]| {
            commands
                .iter()
                .filter(|command| matches!(command, AppCommand::CollectEvent { .. }))
                .count()
        };
        let commands = app.mount().into_commands();
        assert_eq!(opened(&commands), 0);
        assert!(commands.iter().any(|command| matches!(command, AppCommand::LoadSensorDetail { .. })));

        let commands = app.apply_action(Action::Close).into_commands();
        assert!(matches!(app.route(), Route::SensorList { .. }));
        assert_eq!(opened(&commands), 1);
    }

    #[test]
    fn reentering_logs_tab_refetches() {
        let (mut app, seq) = mounted("sensors/default");
        app.apply_sensor_list(seq, Ok(vec![sensor("default", "a")]));
        let logs = AppCommand::LoadSensorLogs {
            namespace: "default".to_string(),
            name: "a".to_string(),
        };
        assert_eq!(app.apply_action(Action::ShowLogs), logs);
        app.set_sensor_logs("default", "a", Ok("line one".to_string()));
        assert_eq!(app.logs_text(), Ok("line one"));

        assert_eq!(app.apply_action(Action::NextPanelTab), AppCommand::None);
        assert_eq!(app.apply_action(Action::NextPanelTab), logs);
        assert_eq!(app.logs_text(), Ok("Loading logs…"));
    }

    #[test]
    fn managed_namespace_overrides_route_and_filter() {
        let mut app = App::new(
            Route::parse("sensors/ignored").unwrap(),
            ViewOptions {
                managed_namespace: Some("team-a".to_string()),
                ..ViewOptions::default()
            },
        );
        let commands = app.mount().into_commands();
        assert!(commands.contains(&AppCommand::LoadSensors {
            seq: 1,
            namespace: "team-a".to_string(),
        }));
        assert_eq!(app.apply_action(Action::StartNamespaceFilter), AppCommand::None);
        assert_eq!(app.mode(), super::InputMode::Normal);

        app.apply_action(Action::CreateSensor);
        assert_eq!(app.route_text(), "sensors?sidePanel=true");
    }

    #[test]
    fn trigger_navigation_updates_selected_node_key() {
        let (mut app, seq) = mounted("sensors/ns?selectedNode=ns/Sensor/s");
        app.apply_sensor_list(seq, Ok(vec![sensor_with_triggers("ns", "s", &["t1", "t2"])]));

        app.apply_action(Action::Down);
        assert_eq!(app.selected_node(), Some("ns/Sensor/s/t1"));
        app.apply_action(Action::Down);
        assert_eq!(app.selected_node(), Some("ns/Sensor/s/t2"));
        app.apply_action(Action::Down);
        assert_eq!(app.selected_node(), Some("ns/Sensor/s/t2"));
        assert_eq!(
            app.resolve_selected().unwrap().id.key.as_deref(),
            Some("t2")
        );
    }

    #[test]
    fn timestamp_toggle_persists_setting() {
        let (mut app, _) = mounted("sensors/default");
        let command = app.apply_action(Action::ToggleTimestampFormat);
        assert_eq!(
            command,
            AppCommand::PersistSetting {
                key: "sensorListCreation".to_string(),
                value: true,
            }
        );
        assert!(app.display_iso_format());
    }

    #[test]
    fn event_flow_requires_loaded_sensors() {
        let (mut app, seq) = mounted("sensors/default");
        assert_eq!(app.apply_action(Action::ShowEventFlow), AppCommand::None);
        assert!(matches!(app.route(), Route::SensorList { .. }));

        app.apply_sensor_list(seq, Ok(vec![sensor_with_triggers("default", "s", &["t"])]));
        app.apply_action(Action::ShowEventFlow);
        assert_eq!(app.route().to_string(), "event-flow/default");
        assert!(
            app.event_flow_lines()
                .contains(&"default/s ──▶ t".to_string())
        );
    }

    #[test]
    fn namespace_completion_uses_discovered_namespaces() {
        let (mut app, _) = mounted("sensors/default");
        app.set_namespaces(vec![
            "kube-system".to_string(),
            "argo-events".to_string(),
            "argo".to_string(),
        ]);
        app.apply_action(Action::StartNamespaceFilter);
        for _ in 0..app.input().len() {
            app.apply_action(Action::Backspace);
        }
        for c in "arg".chars() {
            app.apply_action(Action::InputChar(c));
        }
        assert_eq!(
            app.namespace_completions(),
            vec!["argo".to_string(), "argo-events".to_string()]
        );
        app.apply_action(Action::NextSuggestion);
        app.apply_action(Action::CompleteInput);
        assert_eq!(app.input(), "argo-events");
    }

    #[test]
    fn detail_result_for_other_sensor_is_ignored() {
        let (mut app, _) = mounted("sensors/default/a");
        app.set_sensor_detail("default", "b", Ok(sensor("default", "b")));
        assert_eq!(app.detail_text(), Ok("Loading…"));
        app.set_sensor_detail("default", "a", Ok(sensor("default", "a")));
        assert!(app.detail_text().unwrap().contains("name: a"));
    }

    #[test]
    fn timestamps_render_iso_or_relative() {
        let time = Time(k8s_openapi::jiff::Timestamp::from_second(1_717_236_000).unwrap());
        assert_eq!(format_timestamp(Some(&time), true), "2024-06-01T10:00:00Z");
        assert!(format_timestamp(Some(&time), false).ends_with("d ago"));
        assert_eq!(format_timestamp(None, false), "-");
        assert_eq!(format_elapsed_seconds(59), "59s");
        assert_eq!(format_elapsed_seconds(3_600), "1h");
    }
}
