use crate::avatar::PetAvatar;
use crate::model::{AppState, NotificationKind, Role, Scene, UserMode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Render toggles owned by the runtime rather than the reducer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RenderOpts {
    pub(crate) braille: bool,
    pub(crate) color: bool,
}

const SIDEBAR_W: u16 = 30;
const DRESSING_LABELS: [&str; 4] = ["Name", "Species", "Outfit", "Color"];

fn tint(opts: RenderOpts, c: Color) -> Color {
    if opts.color {
        c
    } else {
        Color::White
    }
}

fn accent(st: &AppState, opts: RenderOpts) -> Color {
    let ((r, g, b), _) = st.appearance.color.rgb();
    tint(opts, Color::Rgb(r, g, b))
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub(crate) fn draw(f: &mut Frame, st: &AppState, opts: RenderOpts) {
    let area = f.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_W), Constraint::Min(20)])
        .split(rows[0]);
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(6)])
        .split(cols[1]);

    render_sidebar(f, cols[0], st, opts);
    render_stage(f, main[0], st, opts);
    render_chat(f, main[1], st, opts);
    render_footer(f, rows[1], st);

    match st.scene {
        Scene::Chat => {}
        Scene::Help => render_help(f, area, opts),
        Scene::Dressing => render_dressing(f, area, st, opts),
        Scene::Rename => render_prompt(f, area, st, opts, "Rename your pet", "Enter save · Esc back"),
        Scene::Attach => render_prompt(
            f,
            area,
            st,
            opts,
            "Attach a file (png, jpeg, webp, heic, pdf)",
            "Enter load · Esc cancel",
        ),
    }

    if st.notification.is_some() && st.scene == Scene::Chat {
        render_notification(f, area, st, opts);
    }
}

fn render_sidebar(f: &mut Frame, area: Rect, st: &AppState, opts: RenderOpts) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(" NexusPet ", bold().fg(accent(st, opts))));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let a = &st.appearance;
    let profile = vec![
        Line::from(Span::styled(a.name.clone(), bold().fg(accent(st, opts)))),
        Line::from(format!("Lv.{} {}", st.stats.level, a.species.label())),
        Line::from(format!("{} outfit · {}", a.outfit.label(), a.color.label())),
    ];
    f.render_widget(
        Paragraph::new(profile).block(Block::default().borders(Borders::BOTTOM)),
        parts[0],
    );

    let modes: Vec<Line> = UserMode::ALL
        .iter()
        .map(|m| {
            if *m == st.mode {
                Line::from(Span::styled(
                    format!("▶ {}", m.menu_label()),
                    bold().fg(accent(st, opts)),
                ))
            } else {
                Line::from(format!("  {}", m.menu_label()))
            }
        })
        .collect();
    f.render_widget(
        Paragraph::new(modes).block(Block::default().borders(Borders::BOTTOM).title("Mode")),
        parts[1],
    );

    let love = Gauge::default()
        .block(Block::default().title(format!("Love {}/100", st.stats.intimacy)))
        .gauge_style(Style::default().fg(tint(opts, Color::LightMagenta)))
        .ratio(f64::from(st.stats.intimacy.min(100)) / 100.0)
        .label("");
    f.render_widget(love, parts[2]);

    let energy_color = if st.stats.health <= 50 {
        Color::Red
    } else {
        Color::Green
    };
    let energy = Gauge::default()
        .block(Block::default().title(format!("Energy {}/100", st.stats.health)))
        .gauge_style(Style::default().fg(tint(opts, energy_color)))
        .ratio(f64::from(st.stats.health.min(100)) / 100.0)
        .label("");
    f.render_widget(energy, parts[3]);

    f.render_widget(
        Paragraph::new(vec![
            Line::from("Time together"),
            Line::from(Span::styled(
                format_session(st.stats.session_minutes),
                bold(),
            )),
        ]),
        parts[4],
    );
}

fn render_stage(f: &mut Frame, area: Rect, st: &AppState, opts: RenderOpts) {
    let mood = st.mood();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} is {} ", st.appearance.name, mood_word(mood)));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        PetAvatar {
            look: &st.appearance,
            mood,
            frames: st.frames,
            braille: opts.braille,
            color: opts.color,
        },
        inner,
    );
}

fn mood_word(mood: crate::model::Mood) -> &'static str {
    use crate::model::Mood::*;
    match mood {
        Idle => "relaxing",
        Thinking => "thinking…",
        Happy => "happy!",
        Worried => "worried",
        Crying => "crying",
        Sleeping => "asleep",
    }
}

pub(crate) fn format_session(minutes: u64) -> String {
    let (h, m) = (minutes / 60, minutes % 60);
    if h == 0 {
        format!("{m}m")
    } else {
        format!("{h}h {m:02}m")
    }
}

/// Greedy word wrap on display columns; overlong words are split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for para in text.split('\n') {
        let mut line = String::new();
        let mut line_w = 0;
        for word in para.split_whitespace() {
            let mut word_w = word.width();
            let mut word = word.to_string();
            if word_w > width {
                if !line.is_empty() {
                    out.push(std::mem::take(&mut line));
                    line_w = 0;
                }
                let mut chunk = String::new();
                let mut chunk_w = 0;
                for ch in word.chars() {
                    let cw = ch.width().unwrap_or(0);
                    if chunk_w + cw > width && !chunk.is_empty() {
                        out.push(std::mem::take(&mut chunk));
                        chunk_w = 0;
                    }
                    chunk.push(ch);
                    chunk_w += cw;
                }
                word = chunk;
                word_w = chunk_w;
            }
            let gap = usize::from(!line.is_empty());
            if line_w + gap + word_w > width && !line.is_empty() {
                out.push(std::mem::take(&mut line));
                line_w = 0;
            }
            if !line.is_empty() {
                line.push(' ');
                line_w += 1;
            }
            line.push_str(&word);
            line_w += word_w;
        }
        out.push(line);
    }
    out
}

fn chat_lines(st: &AppState, width: usize, opts: RenderOpts) -> Vec<Line<'static>> {
    let you = Style::default().fg(tint(opts, Color::Cyan)).add_modifier(Modifier::BOLD);
    let pet = bold().fg(accent(st, opts));
    let mut lines = Vec::new();

    for msg in st.conversation.messages() {
        let (who, style, align) = match msg.role {
            Role::User => ("You".to_string(), you, Alignment::Right),
            Role::Model => (st.appearance.name.clone(), pet, Alignment::Left),
        };
        lines.push(
            Line::from(vec![
                Span::styled(who, style),
                Span::styled(
                    format!(" {}", msg.timestamp.format("%H:%M")),
                    Style::default().fg(tint(opts, Color::DarkGray)),
                ),
            ])
            .alignment(align),
        );
        for att in &msg.attachments {
            lines.push(Line::from(format!("📎 {}", att.name)).alignment(align));
        }
        if !msg.text.is_empty() {
            for l in wrap_text(&msg.text, width.saturating_sub(2)) {
                lines.push(Line::from(l).alignment(align));
            }
        }
        lines.push(Line::from(""));
    }

    if st.thinking {
        lines.push(Line::from(Span::styled(
            format!("{} is typing …", st.appearance.name),
            Style::default().fg(tint(opts, Color::Gray)).add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

fn render_chat(f: &mut Frame, area: Rect, st: &AppState, opts: RenderOpts) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Chat · {} Mode ", st.mode.label()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let pending_h = u16::from(st.conversation.pending().is_some());
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(pending_h),
            Constraint::Length(3),
        ])
        .split(inner);

    let log = parts[0];
    let lines = chat_lines(st, log.width as usize, opts);
    let skip = lines.len().saturating_sub(log.height as usize);
    f.render_widget(
        Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>()),
        log,
    );

    if let Some(att) = st.conversation.pending() {
        let kind = if att.is_image() { "image" } else { "file" };
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("📎 {} ", att.name), bold()),
                Span::raw(format!("({kind}, Ctrl+X to remove)")),
            ])),
            parts[1],
        );
    }

    let (prompt, style) = if st.thinking {
        (
            format!("{} is thinking…", st.appearance.name),
            Style::default().fg(tint(opts, Color::DarkGray)),
        )
    } else {
        (format!("{}▏", st.input), Style::default())
    };
    f.render_widget(
        Paragraph::new(prompt)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title("Say something")),
        parts[2],
    );
}

fn render_footer(f: &mut Frame, area: Rect, st: &AppState) {
    let keys: &[(&str, &str)] = match st.scene {
        Scene::Chat => &[
            ("Enter", "send"),
            ("Tab", "mode"),
            ("^O", "attach"),
            ("^P", "poke"),
            ("F1", "help"),
            ("F2", "dress"),
            ("^C", "quit"),
        ],
        Scene::Dressing => &[("↑/↓", "field"), ("←/→", "change"), ("Enter", "select"), ("Esc", "back")],
        _ => &[("Esc", "back"), ("^C", "quit")],
    };
    let mut spans = Vec::new();
    for (k, v) in keys {
        spans.push(Span::styled(*k, bold()));
        spans.push(Span::raw(format!(" {v}  ")));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub(crate) fn centered(w: u16, h: u16, area: Rect) -> Rect {
    let w = w.min(area.width);
    let h = h.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn render_notification(f: &mut Frame, area: Rect, st: &AppState, opts: RenderOpts) {
    let Some(n) = &st.notification else {
        return;
    };
    let (title, color) = match n.kind {
        NotificationKind::Reminder => (" Reminder ", Color::Yellow),
        NotificationKind::Problem => (" Oops ", Color::Red),
    };
    let rect = centered(44, 5, area);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(vec![Line::from(n.text.clone()), Line::from(""), Line::from("Esc to dismiss")])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(tint(opts, color))),
            ),
        rect,
    );
}

fn render_dressing(f: &mut Frame, area: Rect, st: &AppState, opts: RenderOpts) {
    let rect = centered(40, 8, area);
    f.render_widget(Clear, rect);
    let a = &st.appearance;
    let values = [
        a.name.clone(),
        a.species.label().to_string(),
        a.outfit.label().to_string(),
        a.color.label().to_string(),
    ];
    let lines: Vec<Line> = DRESSING_LABELS
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (label, value))| {
            if i == st.dressing_cursor {
                Line::from(vec![
                    Span::styled(format!("▶ {label:<8}"), bold()),
                    Span::styled(format!("◀ {value} ▶"), bold().fg(accent(st, opts))),
                ])
            } else {
                Line::from(format!("  {label:<8}  {value}"))
            }
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Dressing Room ")),
        rect,
    );
}

fn render_prompt(
    f: &mut Frame,
    area: Rect,
    st: &AppState,
    opts: RenderOpts,
    title: &str,
    hint: &str,
) {
    let rect = centered(56, 5, area);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(format!("{}▏", st.edit_buffer), bold())),
            Line::from(""),
            Line::from(Span::styled(
                hint.to_string(),
                Style::default().fg(tint(opts, Color::DarkGray)),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} "))),
        rect,
    );
}

fn render_help(f: &mut Frame, area: Rect, opts: RenderOpts) {
    let rect = centered(52, 18, area);
    f.render_widget(Clear, rect);
    let lines = vec![
        Line::from("Chat"),
        Line::from("  Enter       send message"),
        Line::from("  Tab         next mode"),
        Line::from("  F5/F6/F7    student / work / leisure"),
        Line::from("  Ctrl+O      attach a file"),
        Line::from("  Ctrl+X      remove pending file"),
        Line::from("  Ctrl+P      poke your pet"),
        Line::from("  F2          dressing room"),
        Line::from("  F3          braille / ascii pet"),
        Line::from("  Esc         dismiss reminder"),
        Line::from(""),
        Line::from("Anywhere"),
        Line::from("  F1          this help"),
        Line::from("  Ctrl+C      quit"),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(tint(opts, Color::Gray)))
            .block(Block::default().borders(Borders::ALL).title(" Help ")),
        rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Notification, PetAppearance};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(st: &AppState) -> String {
        let mut term = Terminal::new(TestBackend::new(100, 40)).unwrap();
        term.draw(|f| draw(f, st, RenderOpts { braille: true, color: true }))
            .unwrap();
        term.backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn wraps_on_words_and_splits_long_ones() {
        assert_eq!(wrap_text("hello there friend", 11), vec!["hello there", "friend"]);
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn wide_glyphs_count_as_two_columns() {
        assert_eq!(wrap_text("yay ✨✨", 5), vec!["yay", "✨✨"]);
        assert_eq!(wrap_text("✨✨✨", 4), vec!["✨✨", "✨"]);
        for line in wrap_text("so happy (◕‿◕) ✨ let's play ✨✨✨ today", 8) {
            assert!(line.width() <= 8, "{line:?} is {} columns", line.width());
        }
    }

    #[test]
    fn session_time_reads_naturally() {
        assert_eq!(format_session(0), "0m");
        assert_eq!(format_session(59), "59m");
        assert_eq!(format_session(125), "2h 05m");
    }

    #[test]
    fn main_screen_shows_profile_and_greeting() {
        let st = AppState::new(UserMode::Work, PetAppearance::default());
        let s = screen(&st);
        assert!(s.contains("Chiichan"));
        assert!(s.contains("Lv.2"));
        assert!(s.contains("Chat · Work Mode"));
        assert!(s.contains("Hello friend!"));
    }

    #[test]
    fn reminder_popup_and_thinking_indicator() {
        let mut st = AppState::new(UserMode::Student, PetAppearance::default());
        st.thinking = true;
        st.notification = Some(Notification {
            kind: NotificationKind::Reminder,
            text: "Time to stretch!".into(),
        });
        let s = screen(&st);
        assert!(s.contains("Reminder"));
        assert!(s.contains("Time to stretch!"));
        assert!(s.contains("is thinking"));
    }
}
