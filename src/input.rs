use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    ToggleHelp,
    OpenSelected,
    ShowLogs,
    CreateSensor,
    StartNamespaceFilter,
    ToggleTimestampFormat,
    ShowEventFlow,
    HistoryBack,
    HistoryForward,
    NextPanelTab,
    Close,
    SubmitInput,
    CompleteInput,
    NextSuggestion,
    PrevSuggestion,
    CancelInput,
    Backspace,
    InputChar(char),
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Namespace => map_input_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Enter => Some(Action::OpenSelected),
        KeyCode::Char('l') => Some(Action::ShowLogs),
        KeyCode::Char('c') | KeyCode::Char('e') => Some(Action::CreateSensor),
        KeyCode::Char('n') | KeyCode::Char('/') => Some(Action::StartNamespaceFilter),
        KeyCode::Char('t') => Some(Action::ToggleTimestampFormat),
        KeyCode::Char('f') => Some(Action::ShowEventFlow),
        KeyCode::Char('[') | KeyCode::Backspace => Some(Action::HistoryBack),
        KeyCode::Left if key.modifiers.contains(KeyModifiers::ALT) => Some(Action::HistoryBack),
        KeyCode::Char(']') => Some(Action::HistoryForward),
        KeyCode::Right if key.modifiers.contains(KeyModifiers::ALT) => {
            Some(Action::HistoryForward)
        }
        KeyCode::Tab => Some(Action::NextPanelTab),
        KeyCode::Esc => Some(Action::Close),
        _ => None,
    }
}

fn map_input_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Tab => Some(Action::CompleteInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Down => Some(Action::NextSuggestion),
        KeyCode::Up => Some(Action::PrevSuggestion),
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::NextSuggestion)
        }
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PrevSuggestion)
        }
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::InputMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn normal_mode_maps_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
    }

    #[test]
    fn normal_mode_maps_l_to_logs() {
        let key = KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::ShowLogs));
    }

    #[test]
    fn normal_mode_maps_enter_to_open() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::OpenSelected));
    }

    #[test]
    fn normal_mode_maps_history_keys() {
        let back = KeyEvent::new(KeyCode::Char('['), KeyModifiers::NONE);
        let forward = KeyEvent::new(KeyCode::Right, KeyModifiers::ALT);
        assert_eq!(map_key(InputMode::Normal, back), Some(Action::HistoryBack));
        assert_eq!(
            map_key(InputMode::Normal, forward),
            Some(Action::HistoryForward)
        );
    }

    #[test]
    fn namespace_mode_maps_chars_and_submit() {
        let ch = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::Namespace, ch),
            Some(Action::InputChar('n'))
        );
        assert_eq!(
            map_key(InputMode::Namespace, enter),
            Some(Action::SubmitInput)
        );
    }

    #[test]
    fn namespace_mode_rejects_ctrl_c() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(InputMode::Namespace, key), None);
    }
}
