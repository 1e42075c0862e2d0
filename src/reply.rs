//! Reply classification: is a thread message a real answer or noise?

use unicode_segmentation::UnicodeSegmentation;

/// Short replies that always count as an answer.
const ACKNOWLEDGMENTS: &[&str] = &[
    "yes",
    "no",
    "stop",
    "cancel",
    "approve",
    "approved",
    "reject",
    "rejected",
    "done",
    "skip",
    "continue",
    "proceed",
    "correct",
    "incorrect",
    "wrong",
    "right",
];

/// Returns true if `text` is substantive enough to hand back to the caller.
///
/// Rules, in order: at least 2 non-whitespace characters; acknowledgment
/// allowlist always accepted; emoji-only text rejected; everything else accepted.
pub fn is_substantive_reply(text: &str) -> bool {
    let stripped = text.trim();

    if stripped.chars().filter(|c| !c.is_whitespace()).count() < 2 {
        return false;
    }

    let folded = stripped.to_lowercase();
    if ACKNOWLEDGMENTS.contains(&folded.as_str()) {
        return true;
    }

    !is_emoji_only(stripped)
}

/// Every non-whitespace piece is a pictograph or a known `:shortcode:`.
fn is_emoji_only(text: &str) -> bool {
    text.split_whitespace().all(|word| {
        word.graphemes(true).all(is_emoji_grapheme) || is_shortcode_run(word)
    })
}

fn is_emoji_grapheme(grapheme: &str) -> bool {
    if emojis::get(grapheme).is_some() {
        return true;
    }
    // Text-presentation forms arrive without the variation selector and
    // skin-tone modifiers are not always listed as their own sequence.
    let base: String = grapheme
        .chars()
        .filter(|c| !matches!(c, '\u{FE0F}' | '\u{1F3FB}'..='\u{1F3FF}'))
        .collect();
    !base.is_empty() && base != grapheme && emojis::get(&base).is_some()
}

/// `:tada::+1:` style runs, which Slack sends for emoji typed into a message.
fn is_shortcode_run(word: &str) -> bool {
    let Some(inner) = word.strip_prefix(':').and_then(|w| w.strip_suffix(':')) else {
        return false;
    };
    inner.split("::").all(|code| {
        code.starts_with("skin-tone-")
            || (!code.is_empty() && emojis::get_by_shortcode(code).is_some())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_fewer_than_two_visible_chars() {
        for s in ["", " ", "a", "  k  ", "\n\t", "?"] {
            assert!(!is_substantive_reply(s), "{s:?}");
        }
    }

    #[test]
    fn test_allowlist_any_case_and_padding() {
        for word in ACKNOWLEDGMENTS {
            assert!(is_substantive_reply(word));
            assert!(is_substantive_reply(&word.to_uppercase()));
            assert!(is_substantive_reply(&format!("  {word}\n")));
        }
        assert!(is_substantive_reply("No"));
        assert!(is_substantive_reply(" APPROVED "));
    }

    #[test]
    fn test_rejects_emoji_only() {
        for s in ["🎉🎉", "👍 👍", "🚀🚀🚀", " 😀 🎉 "] {
            assert!(!is_substantive_reply(s), "{s:?}");
        }
    }

    #[test]
    fn test_emoji_with_text_accepted() {
        for s in ["🎉🎉ok", "👍 lgtm", "🚀🚀🚀 ship it"] {
            assert!(is_substantive_reply(s), "{s:?}");
        }
    }

    #[test]
    fn test_rejects_shortcode_only() {
        assert!(!is_substantive_reply(":tada:"));
        assert!(!is_substantive_reply(":rocket: :tada:"));
        assert!(!is_substantive_reply(":tada::rocket:"));
        assert!(!is_substantive_reply(":+1::skin-tone-2:"));
    }

    #[test]
    fn test_unknown_shortcode_or_colon_text_accepted() {
        assert!(is_substantive_reply(":not_a_real_emoji_name:"));
        assert!(is_substantive_reply("use option: 2"));
        assert!(is_substantive_reply("::"));
    }

    #[test]
    fn test_ordinary_replies_accepted() {
        assert!(is_substantive_reply("Use the second approach"));
        assert!(is_substantive_reply("2."));
        assert!(is_substantive_reply("42"));
    }
}
