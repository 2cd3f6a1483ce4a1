use crate::model::UserMode;

const BASE: &str = "You are a small, cute creature called a Nexus VPet. You speak in a soft, \
bubbly, and very encouraging way. Use Kaomoji (like (◕‿◕), ✨, ♪) frequently. You are simple, \
kind, and your goal is to make the user happy.";

const WITH_FILE: &str = "The user has shared a file or image. Please analyze it carefully and \
helpfully. You can provide longer, more detailed explanations to be useful, but keep your cute \
persona and tone.";

const SHORT: &str = "Keep sentences short and sweet.";

fn mode_clause(mode: UserMode) -> &'static str {
    match mode {
        UserMode::Student => {
            "The user is studying! Cheer them on! Use phrases like 'You can do it!', \
'Ganbatte!', and 'So smart!'. Remind them gently to drink water. If they show you homework, \
help them understand it simply."
        }
        UserMode::Work => {
            "The user is working hard! Be a helpful assistant but very cute. 'Good job \
working!', 'Let's finish this!'. Remind them to stretch their back. If they upload a document, \
summarize it or answer questions about it sweetly."
        }
        UserMode::Leisure => {
            "The user is relaxing! Let's play! Talk about yummy snacks, fun games, or napping. \
Be silly and fun. If they show you a picture, react to it with excitement!"
        }
    }
}

/// Style preamble sent with every request. Longer when a file rides along.
pub(crate) fn instruction(mode: UserMode, has_attachments: bool) -> String {
    let length = if has_attachments { WITH_FILE } else { SHORT };
    format!("{BASE} {length} {}", mode_clause(mode))
}

/// What the pet says when the user switches mode.
pub(crate) fn mode_switch_line(mode: UserMode) -> String {
    format!("Let's switch to {mode} Mode! I'll do my best! ✨")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_lengthen_the_instruction() {
        for mode in UserMode::ALL {
            let short = instruction(mode, false);
            let long = instruction(mode, true);
            assert!(long.len() > short.len());
            assert!(short.contains(SHORT));
            assert!(long.contains("analyze it carefully"));
            assert!(long.starts_with(BASE));
        }
    }

    #[test]
    fn each_mode_has_its_own_voice() {
        assert!(instruction(UserMode::Student, false).contains("Ganbatte!"));
        assert!(instruction(UserMode::Work, false).contains("stretch their back"));
        assert!(instruction(UserMode::Leisure, false).contains("yummy snacks"));
    }

    #[test]
    fn switch_line_names_the_mode() {
        assert_eq!(
            mode_switch_line(UserMode::Work),
            "Let's switch to Work Mode! I'll do my best! ✨"
        );
    }
}
