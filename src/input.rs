use crate::model::{Scene, UserMode};
use crate::sim::Event;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

impl InputEvent {
    #[cfg(test)]
    fn new(key: KeyCode) -> Self {
        Self {
            key,
            mods: KeyModifiers::NONE,
        }
    }

    fn ctrl(&self, ch: char) -> bool {
        self.mods.contains(KeyModifiers::CONTROL)
            && matches!(self.key, KeyCode::Char(c) if c.eq_ignore_ascii_case(&ch))
    }
}

pub(crate) fn collect_input_nonblocking(wait: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // block for at most one frame, then drain whatever else is queued
    let mut timeout = wait;
    while event::poll(timeout)? {
        if let TermEvent::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 64 {
                    break;
                }
            }
        }
        timeout = Duration::ZERO;
    }
    Ok(out)
}

fn typed_char(ev: &InputEvent) -> Option<char> {
    match ev.key {
        KeyCode::Char(ch)
            if !ev.mods.contains(KeyModifiers::CONTROL) && !ev.mods.contains(KeyModifiers::ALT) =>
        {
            (!ch.is_control()).then_some(ch)
        }
        _ => None,
    }
}

pub(crate) fn map_event(scene: &Scene, ev: InputEvent) -> Option<Event> {
    if ev.ctrl('c') || ev.ctrl('q') {
        return Some(Event::Quit);
    }

    match scene {
        Scene::Chat => {
            if ev.ctrl('o') {
                return Some(Event::AttachOpen);
            }
            if ev.ctrl('x') {
                return Some(Event::ClearAttachment);
            }
            if ev.ctrl('p') {
                return Some(Event::PokePet);
            }
            match ev.key {
                KeyCode::Enter => Some(Event::Submit),
                KeyCode::Backspace => Some(Event::InputBackspace),
                KeyCode::Esc => Some(Event::DismissNotification),
                KeyCode::Tab => Some(Event::CycleMode),
                KeyCode::F(1) => Some(Event::HelpToggle),
                KeyCode::F(2) => Some(Event::DressingOpen),
                KeyCode::F(3) => Some(Event::ToggleRender),
                KeyCode::F(5) => Some(Event::SwitchMode(UserMode::Student)),
                KeyCode::F(6) => Some(Event::SwitchMode(UserMode::Work)),
                KeyCode::F(7) => Some(Event::SwitchMode(UserMode::Leisure)),
                _ => typed_char(&ev).map(Event::InputChar),
            }
        }
        Scene::Help => match ev.key {
            KeyCode::F(1) => Some(Event::HelpToggle),
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Event::Back),
            _ => None,
        },
        Scene::Dressing => match ev.key {
            KeyCode::Up => Some(Event::DressingMove(-1)),
            KeyCode::Down | KeyCode::Tab => Some(Event::DressingMove(1)),
            KeyCode::Left => Some(Event::DressingCycle(-1)),
            KeyCode::Right => Some(Event::DressingCycle(1)),
            KeyCode::Enter => Some(Event::DressingSelect),
            KeyCode::Esc | KeyCode::F(2) => Some(Event::Back),
            _ => None,
        },
        Scene::Rename | Scene::Attach => match ev.key {
            KeyCode::Enter => Some(Event::EditCommit),
            KeyCode::Esc => Some(Event::EditCancel),
            KeyCode::Backspace => Some(Event::EditBackspace),
            _ => typed_char(&ev).map(Event::EditChar),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(ch: char) -> InputEvent {
        InputEvent {
            key: KeyCode::Char(ch),
            mods: KeyModifiers::CONTROL,
        }
    }

    #[test]
    fn chat_keys_type_and_send() {
        let chat = Scene::Chat;
        assert!(matches!(
            map_event(&chat, InputEvent::new(KeyCode::Char('q'))),
            Some(Event::InputChar('q'))
        ));
        assert!(matches!(
            map_event(&chat, InputEvent::new(KeyCode::Enter)),
            Some(Event::Submit)
        ));
        assert!(matches!(map_event(&chat, ctrl('p')), Some(Event::PokePet)));
        assert!(matches!(map_event(&chat, ctrl('O')), Some(Event::AttachOpen)));
        assert!(matches!(
            map_event(&chat, InputEvent::new(KeyCode::F(6))),
            Some(Event::SwitchMode(UserMode::Work))
        ));
        assert!(map_event(&chat, ctrl('z')).is_none());
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        for scene in [
            Scene::Chat,
            Scene::Help,
            Scene::Dressing,
            Scene::Rename,
            Scene::Attach,
        ] {
            assert!(matches!(map_event(&scene, ctrl('c')), Some(Event::Quit)));
        }
    }

    #[test]
    fn edit_scenes_capture_text() {
        assert!(matches!(
            map_event(&Scene::Attach, InputEvent::new(KeyCode::Char('/'))),
            Some(Event::EditChar('/'))
        ));
        assert!(matches!(
            map_event(&Scene::Rename, InputEvent::new(KeyCode::Esc)),
            Some(Event::EditCancel)
        ));
        assert!(matches!(
            map_event(&Scene::Dressing, InputEvent::new(KeyCode::Left)),
            Some(Event::DressingCycle(-1))
        ));
    }
}
