use crate::conversation::Conversation;
use crate::mood::MoodController;
use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::fmt;

pub(crate) const NAME_MAX: usize = 18;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Chat,
    Help,
    Dressing,
    Rename,
    Attach,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum UserMode {
    Student,
    Work,
    Leisure,
}

impl UserMode {
    pub(crate) const ALL: [UserMode; 3] = [UserMode::Student, UserMode::Work, UserMode::Leisure];

    pub(crate) fn label(self) -> &'static str {
        match self {
            UserMode::Student => "Student",
            UserMode::Work => "Work",
            UserMode::Leisure => "Leisure",
        }
    }

    /// Sidebar entry text.
    pub(crate) fn menu_label(self) -> &'static str {
        match self {
            UserMode::Student => "📚 Study Time",
            UserMode::Work => "💼 Work Focus",
            UserMode::Leisure => "🎮 Play Time",
        }
    }

    pub(crate) fn next(self) -> Self {
        match self {
            UserMode::Student => UserMode::Work,
            UserMode::Work => UserMode::Leisure,
            UserMode::Leisure => UserMode::Student,
        }
    }
}

impl fmt::Display for UserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discrete emotional-display state of the avatar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mood {
    Idle,
    Thinking,
    Happy,
    Worried,
    Crying,
    Sleeping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Species {
    Bear,
    Cat,
    Rabbit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Outfit {
    Everyday,
    Pajama,
    Hero,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ColorTheme {
    Pink,
    Blue,
    Yellow,
    Purple,
}

/// Steps through a fixed option list, wrapping at both ends.
fn cycle<T: Copy + PartialEq>(all: &[T], cur: T, delta: i32) -> T {
    let len = all.len() as i32;
    let i = all.iter().position(|v| *v == cur).unwrap_or(0) as i32;
    all[(i + delta).rem_euclid(len) as usize]
}

impl Species {
    pub(crate) const ALL: [Species; 3] = [Species::Bear, Species::Cat, Species::Rabbit];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Species::Bear => "🐻 Bear",
            Species::Cat => "🐱 Cat",
            Species::Rabbit => "🐰 Bun",
        }
    }

    pub(crate) fn cycle(self, delta: i32) -> Self {
        cycle(&Self::ALL, self, delta)
    }
}

impl Outfit {
    pub(crate) const ALL: [Outfit; 3] = [Outfit::Everyday, Outfit::Pajama, Outfit::Hero];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Outfit::Everyday => "everyday",
            Outfit::Pajama => "pajama",
            Outfit::Hero => "hero",
        }
    }

    pub(crate) fn cycle(self, delta: i32) -> Self {
        cycle(&Self::ALL, self, delta)
    }
}

impl ColorTheme {
    pub(crate) const ALL: [ColorTheme; 4] = [
        ColorTheme::Pink,
        ColorTheme::Blue,
        ColorTheme::Yellow,
        ColorTheme::Purple,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            ColorTheme::Pink => "pink",
            ColorTheme::Blue => "blue",
            ColorTheme::Yellow => "yellow",
            ColorTheme::Purple => "purple",
        }
    }

    /// (main, dark) RGB pairs.
    pub(crate) fn rgb(self) -> ((u8, u8, u8), (u8, u8, u8)) {
        match self {
            ColorTheme::Pink => ((251, 113, 133), (190, 18, 60)),
            ColorTheme::Blue => ((56, 189, 248), (3, 105, 161)),
            ColorTheme::Yellow => ((250, 204, 21), (161, 98, 7)),
            ColorTheme::Purple => ((192, 132, 252), (126, 34, 206)),
        }
    }

    pub(crate) fn cycle(self, delta: i32) -> Self {
        cycle(&Self::ALL, self, delta)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PetAppearance {
    pub(crate) name: String,
    pub(crate) species: Species,
    pub(crate) outfit: Outfit,
    pub(crate) color: ColorTheme,
}

impl Default for PetAppearance {
    fn default() -> Self {
        Self {
            name: "Chiichan".to_string(),
            species: Species::Bear,
            outfit: Outfit::Everyday,
            color: ColorTheme::Pink,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    User,
    Model,
}

/// A user-supplied file, base64 encoded for inline transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Attachment {
    pub(crate) mime_type: String,
    /// Bare base64 or a `data:<mime>;base64,<payload>` URL.
    pub(crate) data: String,
    pub(crate) name: String,
}

impl Attachment {
    /// The bare base64 payload, if there is one.
    pub(crate) fn base64_payload(&self) -> Option<&str> {
        let payload = if self.data.starts_with("data:") {
            self.data.split_once(',').map(|(_, p)| p)?
        } else {
            self.data.as_str()
        };
        if payload.is_empty() {
            None
        } else {
            Some(payload)
        }
    }

    pub(crate) fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Message {
    pub(crate) id: String,
    pub(crate) role: Role,
    pub(crate) text: String,
    pub(crate) timestamp: DateTime<Local>,
    pub(crate) attachments: Vec<Attachment>,
}

impl Message {
    fn new(role: Role, text: String, attachments: Vec<Attachment>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text,
            timestamp: Local::now(),
            attachments,
        }
    }

    pub(crate) fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(Role::User, text.into(), attachments)
    }

    pub(crate) fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text.into(), Vec::new())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UserStats {
    pub(crate) intimacy: u8,
    pub(crate) level: u8,
    pub(crate) session_minutes: u64,
    pub(crate) health: u8,
}

impl Default for UserStats {
    fn default() -> Self {
        UserStats::new(30, 100)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NotificationKind {
    Reminder,
    Problem,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notification {
    pub(crate) kind: NotificationKind,
    pub(crate) text: String,
}

/// Everything the UI shows. Mutated only through `AppState::update`.
#[derive(Clone, Debug)]
pub(crate) struct AppState {
    pub(crate) mode: UserMode,
    pub(crate) appearance: PetAppearance,
    pub(crate) stats: UserStats,
    pub(crate) conversation: Conversation,
    pub(crate) mood: MoodController,
    pub(crate) scene: Scene,
    pub(crate) input: String,
    pub(crate) thinking: bool,
    pub(crate) notification: Option<Notification>,
    pub(crate) dressing_cursor: usize,
    pub(crate) edit_buffer: String,
    pub(crate) frames: u64,
}

impl AppState {
    pub(crate) fn new(mode: UserMode, appearance: PetAppearance) -> Self {
        Self {
            mode,
            appearance,
            stats: UserStats::default(),
            conversation: Conversation::with_greeting(),
            mood: MoodController::new(),
            scene: Scene::Chat,
            input: String::new(),
            thinking: false,
            notification: None,
            dressing_cursor: 0,
            edit_buffer: String::new(),
            frames: 0,
        }
    }
}
