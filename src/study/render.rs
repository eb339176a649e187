// Card rendering - one markdown card per language, printed with termimad

use super::types::{Language, SessionState, Tip};
use termimad::{MadSkin, crossterm::style::Color};

/// Skin used for every card
pub fn card_skin() -> MadSkin {
    let mut skin = MadSkin::default();

    skin.headers[0].set_fg(Color::Cyan);
    skin.headers[1].set_fg(Color::Blue);
    skin.bold.set_fg(Color::White);
    skin.italic.set_fg(Color::Magenta);
    skin.inline_code.set_fg(Color::Yellow);

    skin
}

/// Markdown for the card of `lang`
pub fn card_markdown(lang: Language, state: &SessionState) -> String {
    let mut card = format!("## {}\n\n", lang.badge());

    let text = state.translations.get(lang);
    if text.is_empty() {
        card.push_str("...\n\n");
    } else {
        card.push_str(&format!("**{}**\n\n", text));
    }

    let pronunciation = state.pronunciations.get(lang);
    if !pronunciation.is_empty() {
        card.push_str(&format!("*{}*\n\n", pronunciation));
    }

    card.push_str("`LEARNING TIP`\n\n");
    match state.learning_tips.get(lang) {
        tip if tip.is_empty() => card.push_str("...\n"),
        Tip::Single(text) => {
            card.push_str(text);
            card.push('\n');
        }
        Tip::List(items) => {
            for item in items {
                card.push_str(&format!("• {}\n", item));
            }
        }
    }

    card
}

/// Markdown for the whole session: the source sentence and all three cards
pub fn session_markdown(state: &SessionState) -> String {
    let mut page = String::from("# 오늘의 문장 학습\n\n");

    if state.input_text.is_empty() {
        page.push_str("_(no sentence yet)_\n\n");
    } else {
        page.push_str(&format!("> {}\n\n", state.input_text));
    }

    for lang in Language::ALL {
        page.push_str(&card_markdown(lang, state));
        page.push_str("\n---\n\n");
    }

    page
}

pub fn print_session(skin: &MadSkin, state: &SessionState) {
    skin.print_text(&session_markdown(state));
}
