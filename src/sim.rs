use crate::conversation::CONTEXT_TURNS;
use crate::gateway::ReplyRequest;
use crate::model::{
    AppState, Attachment, Message, Mood, Notification, NotificationKind, Scene, UserMode,
    UserStats, NAME_MAX,
};
use crate::persona;
use std::path::PathBuf;
use std::time::Instant;

pub(crate) const INTIMACY_PER_REPLY: u8 = 2;
pub(crate) const HEALTH_CHECK_EVERY_MIN: u64 = 45;
pub(crate) const HEALTH_PENALTY: u8 = 10;
pub(crate) const STRETCH_REMINDER: &str = "Time to stretch! Let's wiggle! 🎵";
const DRESSING_FIELDS: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HealthCheck {
    pub(crate) at_minute: u64,
    pub(crate) health: u8,
}

impl UserStats {
    pub(crate) fn new(intimacy: u8, health: u8) -> Self {
        let intimacy = intimacy.min(100);
        Self {
            intimacy,
            level: Self::level_for(intimacy),
            session_minutes: 0,
            health: health.min(100),
        }
    }

    pub(crate) fn level_for(intimacy: u8) -> u8 {
        intimacy / 20 + 1
    }

    pub(crate) fn add_intimacy(&mut self, amount: u8) {
        self.intimacy = self.intimacy.saturating_add(amount).min(100);
        self.level = Self::level_for(self.intimacy);
    }

    /// One session-clock minute. Every 45th minute costs 10 health.
    pub(crate) fn on_minute_elapsed(&mut self) -> Option<HealthCheck> {
        self.session_minutes += 1;
        if self.session_minutes % HEALTH_CHECK_EVERY_MIN != 0 {
            return None;
        }
        self.health = self.health.saturating_sub(HEALTH_PENALTY);
        Some(HealthCheck {
            at_minute: self.session_minutes,
            health: self.health,
        })
    }
}

/// Everything that can change `AppState`: keys, clock ticks, finished background work.
#[derive(Clone, Debug)]
pub(crate) enum Event {
    InputChar(char),
    InputBackspace,
    Submit,
    ReplyReceived(String),
    MinuteElapsed,
    PokePet,
    SwitchMode(UserMode),
    CycleMode,
    AttachOpen,
    AttachmentLoaded(Attachment),
    AttachmentFailed(String),
    ClearAttachment,
    DismissNotification,
    HelpToggle,
    DressingOpen,
    DressingMove(i32),
    DressingCycle(i32),
    DressingSelect,
    EditChar(char),
    EditBackspace,
    EditCommit,
    EditCancel,
    ToggleRender,
    Back,
    /// Frame heartbeat; fires due mood reverts.
    Tick,
    Quit,
}

/// Work the runtime performs on the reducer's behalf.
#[derive(Clone, Debug)]
pub(crate) enum Effect {
    RequestReply(ReplyRequest),
    LoadAttachment(PathBuf),
    Quit,
}

impl AppState {
    pub(crate) fn update(&mut self, event: Event, now: Instant) -> Vec<Effect> {
        match event {
            Event::InputChar(ch) => {
                if !self.thinking {
                    self.input.push(ch);
                }
            }
            Event::InputBackspace => {
                if !self.thinking {
                    self.input.pop();
                }
            }
            Event::Submit => return self.submit(),
            Event::ReplyReceived(text) => {
                let reply = Message::model(text);
                tracing::debug!(id = %reply.id, chars = reply.text.chars().count(), "reply appended");
                self.conversation.append(reply);
                self.thinking = false;
                self.stats.add_intimacy(INTIMACY_PER_REPLY);
                self.mood.on_reply(now);
            }
            Event::MinuteElapsed => {
                if let Some(check) = self.stats.on_minute_elapsed() {
                    tracing::info!(
                        minute = check.at_minute,
                        health = check.health,
                        "health check"
                    );
                    self.notification = Some(Notification {
                        kind: NotificationKind::Reminder,
                        text: STRETCH_REMINDER.to_string(),
                    });
                    self.mood.on_health_check(now);
                }
            }
            Event::PokePet => self.mood.on_poke(now),
            Event::SwitchMode(mode) => self.switch_mode(mode),
            Event::CycleMode => self.switch_mode(self.mode.next()),
            Event::AttachOpen => {
                self.edit_buffer.clear();
                self.scene = Scene::Attach;
            }
            Event::AttachmentLoaded(att) => {
                tracing::info!(name = %att.name, mime = %att.mime_type, "attachment ready");
                self.conversation.set_pending(att);
            }
            Event::AttachmentFailed(reason) => {
                self.notification = Some(Notification {
                    kind: NotificationKind::Problem,
                    text: reason,
                });
            }
            Event::ClearAttachment => {
                self.conversation.clear_pending();
            }
            Event::DismissNotification => self.notification = None,
            Event::HelpToggle => {
                self.scene = match self.scene {
                    Scene::Help => Scene::Chat,
                    _ => Scene::Help,
                };
            }
            Event::DressingOpen => {
                self.scene = Scene::Dressing;
                self.dressing_cursor = 0;
            }
            Event::DressingMove(delta) => {
                let next = (self.dressing_cursor as i32 + delta).rem_euclid(DRESSING_FIELDS);
                self.dressing_cursor = next as usize;
            }
            Event::DressingCycle(delta) => self.cycle_dressing(delta),
            Event::DressingSelect => {
                if self.dressing_cursor == 0 {
                    self.edit_buffer = self.appearance.name.clone();
                    self.scene = Scene::Rename;
                } else {
                    self.cycle_dressing(1);
                }
            }
            Event::EditChar(ch) => {
                if self.scene != Scene::Rename || self.edit_buffer.chars().count() < NAME_MAX {
                    self.edit_buffer.push(ch);
                }
            }
            Event::EditBackspace => {
                self.edit_buffer.pop();
            }
            Event::EditCommit => return self.commit_edit(),
            Event::EditCancel => {
                self.scene = match self.scene {
                    Scene::Rename => Scene::Dressing,
                    _ => Scene::Chat,
                };
            }
            // handled by the runtime, which owns render settings
            Event::ToggleRender => {}
            Event::Back => self.scene = Scene::Chat,
            Event::Tick => {
                self.frames = self.frames.wrapping_add(1);
                self.mood.poll(now);
            }
            Event::Quit => return vec![Effect::Quit],
        }
        Vec::new()
    }

    fn submit(&mut self) -> Vec<Effect> {
        // the send control is disabled while a reply is outstanding
        if self.thinking {
            return Vec::new();
        }
        if self.input.trim().is_empty() && self.conversation.pending().is_none() {
            return Vec::new();
        }

        let attachments: Vec<Attachment> = self.conversation.take_pending().into_iter().collect();
        let history = self.conversation.recent(CONTEXT_TURNS).to_vec();
        let text = std::mem::take(&mut self.input);

        self.conversation
            .append(Message::user(text.clone(), attachments.clone()));
        self.thinking = true;
        self.mood.on_send();

        vec![Effect::RequestReply(ReplyRequest {
            history,
            text,
            mode: self.mode,
            attachments,
        })]
    }

    fn switch_mode(&mut self, mode: UserMode) {
        self.mode = mode;
        self.conversation
            .append(Message::model(persona::mode_switch_line(mode)));
    }

    fn cycle_dressing(&mut self, delta: i32) {
        let a = &mut self.appearance;
        match self.dressing_cursor {
            1 => a.species = a.species.cycle(delta),
            2 => a.outfit = a.outfit.cycle(delta),
            3 => a.color = a.color.cycle(delta),
            _ => {}
        }
    }

    fn commit_edit(&mut self) -> Vec<Effect> {
        let value = std::mem::take(&mut self.edit_buffer);
        let trimmed = value.trim();
        match self.scene {
            Scene::Rename => {
                if !trimmed.is_empty() {
                    self.appearance.name = trimmed.to_string();
                }
                self.scene = Scene::Dressing;
                Vec::new()
            }
            Scene::Attach => {
                self.scene = Scene::Chat;
                if trimmed.is_empty() {
                    return Vec::new();
                }
                vec![Effect::LoadAttachment(crate::attachment::expand_path(
                    trimmed,
                ))]
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn mood(&self) -> Mood {
        self.mood.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::GREETING;
    use crate::gateway::ATTACHMENT_PLACEHOLDER;
    use crate::model::{ColorTheme, PetAppearance, Role, Species};
    use std::time::Duration;

    fn state() -> AppState {
        AppState::new(UserMode::Student, PetAppearance::default())
    }

    fn type_text(st: &mut AppState, s: &str, now: Instant) {
        for ch in s.chars() {
            st.update(Event::InputChar(ch), now);
        }
    }

    fn pdf() -> Attachment {
        Attachment {
            mime_type: "application/pdf".into(),
            data: "JVBERi0x".into(),
            name: "hw.pdf".into(),
        }
    }

    #[test]
    fn level_tracks_intimacy_and_clamps() {
        let mut s = UserStats::default();
        assert_eq!((s.intimacy, s.level), (30, 2));
        for _ in 0..100 {
            s.add_intimacy(INTIMACY_PER_REPLY);
            assert!(s.intimacy <= 100);
            assert_eq!(s.level, s.intimacy / 20 + 1);
        }
        assert_eq!((s.intimacy, s.level), (100, 6));
        s.add_intimacy(u8::MAX);
        assert_eq!(s.intimacy, 100);

        let s = UserStats::new(250, 250);
        assert_eq!((s.intimacy, s.health, s.level), (100, 100, 6));
    }

    #[test]
    fn health_drops_ten_every_forty_five_minutes() {
        let mut s = UserStats::default();
        let mut checks = Vec::new();
        for _ in 0..(45 * 12) {
            let before = s.health;
            if let Some(c) = s.on_minute_elapsed() {
                checks.push(c);
            } else {
                assert_eq!(s.health, before);
            }
        }
        assert_eq!(s.session_minutes, 540);
        assert_eq!(checks.len(), 12);
        assert_eq!(checks[0], HealthCheck { at_minute: 45, health: 90 });
        assert_eq!(checks[1], HealthCheck { at_minute: 90, health: 80 });
        assert_eq!(checks[2].at_minute, 135);
        assert_eq!(checks[9].health, 0);
        assert_eq!(checks[11].health, 0);
        assert_eq!(s.health, 0);
    }

    #[test]
    fn submit_then_reply_runs_the_turn() {
        let t0 = Instant::now();
        let mut st = state();
        type_text(&mut st, "hello", t0);

        let effects = st.update(Event::Submit, t0);
        let [Effect::RequestReply(req)] = effects.as_slice() else {
            panic!("expected one reply request, got {effects:?}");
        };
        assert_eq!(req.text, "hello");
        assert_eq!(req.mode, UserMode::Student);
        assert_eq!(req.history.len(), 1);
        assert_eq!(req.history[0].text, GREETING);
        assert!(st.input.is_empty());
        assert!(st.thinking);
        assert_eq!(st.mood(), Mood::Thinking);
        assert_eq!(st.conversation.len(), 2);

        st.update(Event::ReplyReceived("hi friend!".into()), t0);
        assert!(!st.thinking);
        assert_eq!(st.mood(), Mood::Happy);
        assert_eq!(st.stats.intimacy, 32);
        assert_eq!(st.stats.level, 2);
        let last = st.conversation.messages().last().unwrap();
        assert_eq!((last.role, last.text.as_str()), (Role::Model, "hi friend!"));
        let sent = &st.conversation.messages()[1];
        assert!(uuid::Uuid::parse_str(&last.id).is_ok());
        assert_ne!(last.id, sent.id);

        st.update(Event::Tick, t0 + Duration::from_secs(3));
        assert_eq!(st.mood(), Mood::Happy);
        st.update(Event::Tick, t0 + Duration::from_secs(4));
        assert_eq!(st.mood(), Mood::Idle);
    }

    #[test]
    fn blank_submit_without_file_does_nothing() {
        let t0 = Instant::now();
        let mut st = state();
        type_text(&mut st, "   ", t0);
        assert!(st.update(Event::Submit, t0).is_empty());
        assert_eq!(st.conversation.len(), 1);
        assert_eq!(st.mood(), Mood::Idle);
    }

    #[test]
    fn file_only_submit_moves_attachment_out_of_pending() {
        let t0 = Instant::now();
        let mut st = state();
        st.update(Event::AttachmentLoaded(pdf()), t0);
        assert!(st.conversation.pending().is_some());

        let effects = st.update(Event::Submit, t0);
        let [Effect::RequestReply(req)] = effects.as_slice() else {
            panic!("expected a reply request");
        };
        assert_eq!(req.attachments, vec![pdf()]);
        assert_eq!(
            crate::gateway::build_prompt(req).text.lines().last(),
            Some("Pet:")
        );
        assert!(crate::gateway::build_prompt(req)
            .text
            .contains(ATTACHMENT_PLACEHOLDER));
        assert!(st.conversation.pending().is_none());
        let sent = st.conversation.messages().last().unwrap();
        assert_eq!(sent.attachments, vec![pdf()]);
    }

    #[test]
    fn no_second_send_while_thinking() {
        let t0 = Instant::now();
        let mut st = state();
        type_text(&mut st, "one", t0);
        assert_eq!(st.update(Event::Submit, t0).len(), 1);
        type_text(&mut st, "two", t0);
        assert!(st.input.is_empty());
        assert!(st.update(Event::Submit, t0).is_empty());
    }

    #[test]
    fn history_handed_to_gateway_is_capped() {
        let t0 = Instant::now();
        let mut st = state();
        for i in 0..12 {
            type_text(&mut st, &format!("q{i}"), t0);
            st.update(Event::Submit, t0);
            st.update(Event::ReplyReceived(format!("a{i}")), t0);
        }
        type_text(&mut st, "last", t0);
        let effects = st.update(Event::Submit, t0);
        let [Effect::RequestReply(req)] = effects.as_slice() else {
            panic!("expected a reply request");
        };
        assert_eq!(req.history.len(), CONTEXT_TURNS);
        assert_eq!(req.history.last().unwrap().text, "a11");
    }

    #[test]
    fn health_tick_nudges_and_worries() {
        let t0 = Instant::now();
        let mut st = state();
        for _ in 0..44 {
            st.update(Event::MinuteElapsed, t0);
        }
        assert!(st.notification.is_none());
        st.update(Event::MinuteElapsed, t0);
        assert_eq!(st.stats.health, 90);
        assert_eq!(
            st.notification,
            Some(Notification {
                kind: NotificationKind::Reminder,
                text: STRETCH_REMINDER.into()
            })
        );
        assert_eq!(st.mood(), Mood::Worried);
        st.update(Event::Tick, t0 + Duration::from_secs(5));
        assert_eq!(st.mood(), Mood::Idle);
        st.update(Event::DismissNotification, t0);
        assert!(st.notification.is_none());
    }

    #[test]
    fn stale_happy_timer_does_not_cut_off_next_thinking() {
        let t0 = Instant::now();
        let mut st = state();
        type_text(&mut st, "a", t0);
        st.update(Event::Submit, t0);
        st.update(Event::ReplyReceived("b".into()), t0);
        type_text(&mut st, "c", t0);
        st.update(Event::Submit, t0 + Duration::from_secs(1));
        st.update(Event::Tick, t0 + Duration::from_secs(4));
        assert_eq!(st.mood(), Mood::Thinking);
    }

    #[test]
    fn poke_makes_pet_happy_briefly() {
        let t0 = Instant::now();
        let mut st = state();
        st.update(Event::PokePet, t0);
        assert_eq!(st.mood(), Mood::Happy);
        st.update(Event::Tick, t0 + Duration::from_secs(1));
        assert_eq!(st.mood(), Mood::Idle);
    }

    #[test]
    fn mode_switch_announces_itself() {
        let t0 = Instant::now();
        let mut st = state();
        st.update(Event::CycleMode, t0);
        assert_eq!(st.mode, UserMode::Work);
        st.update(Event::SwitchMode(UserMode::Leisure), t0);
        assert_eq!(st.mode, UserMode::Leisure);
        let last = st.conversation.messages().last().unwrap();
        assert_eq!(last.text, "Let's switch to Leisure Mode! I'll do my best! ✨");
        assert_eq!(st.conversation.len(), 3);
    }

    #[test]
    fn dressing_room_edits_appearance() {
        let t0 = Instant::now();
        let mut st = state();
        st.update(Event::DressingOpen, t0);
        st.update(Event::DressingMove(1), t0);
        st.update(Event::DressingCycle(1), t0);
        assert_eq!(st.appearance.species, Species::Cat);
        st.update(Event::DressingMove(2), t0);
        st.update(Event::DressingSelect, t0);
        assert_eq!(st.appearance.color, ColorTheme::Blue);
        st.update(Event::DressingMove(1), t0);
        assert_eq!(st.dressing_cursor, 0);

        st.update(Event::DressingSelect, t0);
        assert_eq!(st.scene, Scene::Rename);
        for _ in 0..8 {
            st.update(Event::EditBackspace, t0);
        }
        for ch in "Mochi the very long named".chars() {
            st.update(Event::EditChar(ch), t0);
        }
        st.update(Event::EditCommit, t0);
        assert_eq!(st.scene, Scene::Dressing);
        assert_eq!(st.appearance.name.chars().count(), NAME_MAX);
        assert!(st.appearance.name.starts_with("Mochi"));

        st.update(Event::DressingSelect, t0);
        for _ in 0..NAME_MAX {
            st.update(Event::EditBackspace, t0);
        }
        st.update(Event::EditChar(' '), t0);
        st.update(Event::EditCommit, t0);
        assert!(st.appearance.name.starts_with("Mochi"));

        st.update(Event::Back, t0);
        assert_eq!(st.scene, Scene::Chat);
    }

    #[test]
    fn attach_prompt_emits_load_effect() {
        let t0 = Instant::now();
        let mut st = state();
        st.update(Event::AttachOpen, t0);
        assert_eq!(st.scene, Scene::Attach);
        for ch in "/tmp/cat.png".chars() {
            st.update(Event::EditChar(ch), t0);
        }
        let effects = st.update(Event::EditCommit, t0);
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadAttachment(p)] if p == &PathBuf::from("/tmp/cat.png")
        ));
        assert_eq!(st.scene, Scene::Chat);

        st.update(Event::AttachOpen, t0);
        assert!(st.update(Event::EditCommit, t0).is_empty());

        st.update(Event::AttachmentFailed("nope".into()), t0);
        assert_eq!(
            st.notification.as_ref().map(|n| n.kind),
            Some(NotificationKind::Problem)
        );
    }

    #[test]
    fn clearing_pending_keeps_history() {
        let t0 = Instant::now();
        let mut st = state();
        st.update(Event::AttachmentLoaded(pdf()), t0);
        st.update(Event::ClearAttachment, t0);
        assert!(st.conversation.pending().is_none());
        assert_eq!(st.conversation.len(), 1);
    }
}
