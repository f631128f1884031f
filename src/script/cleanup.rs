//! Removal of formatting and meta-commentary the model adds despite instructions.

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    preamble: Regex,
    bold_direction: Regex,
    sound_cue: Regex,
    speaker_label: Regex,
    header: Regex,
    asterisks: Regex,
    blank_lines: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        // Only the first line, and only when it announces the script
        preamble: Regex::new(r"(?i)\A[^\n]*\bhere(?: is|'s)\b[^\n]*\b(?:script|transcript|version)\b[^\n]*\n+")
            .expect("valid regex"),
        bold_direction: Regex::new(r"\*\*\(.*?\)\*\*").expect("valid regex"),
        sound_cue: Regex::new(r"(?i)\(SOUND[^)]*\)").expect("valid regex"),
        speaker_label: Regex::new(r"(?i)\*\*(?:HOST|NARRATOR):\*\*").expect("valid regex"),
        header: Regex::new(r"(?m)^#{1,6}\s*").expect("valid regex"),
        asterisks: Regex::new(r"\*{2,}").expect("valid regex"),
        blank_lines: Regex::new(r"\n{3,}").expect("valid regex"),
    })
}

/// Strip stage directions, speaker labels, markdown and preambles from a script.
pub fn clean_script(text: &str) -> String {
    let p = patterns();
    let text = p.preamble.replace(text, "");
    let text = p.bold_direction.replace_all(&text, "");
    let text = p.sound_cue.replace_all(&text, "");
    let text = p.speaker_label.replace_all(&text, "");
    let text = p.header.replace_all(&text, "");
    let text = p.asterisks.replace_all(&text, "");
    let text = p.blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_preamble() {
        let text = "Here is the polished transcript:\n\nWelcome back to the show.";
        assert_eq!(clean_script(text), "Welcome back to the show.");
    }

    #[test]
    fn test_keeps_ordinary_first_line() {
        let text = "Here is a question worth asking.\nWhy coffee?";
        assert_eq!(clean_script(text), text);
    }

    #[test]
    fn test_removes_directions_and_labels() {
        let text = "**HOST:** Welcome! **(music swells)** (SOUND: cups clinking) Let's begin.";
        assert_eq!(clean_script(text), "Welcome!   Let's begin.");
    }

    #[test]
    fn test_removes_markdown() {
        let text = "### Part One\nThis is **really** important.\n\n\n\nNext.";
        assert_eq!(clean_script(text), "Part One\nThis is really important.\n\nNext.");
    }

    #[test]
    fn test_blank_result() {
        assert_eq!(clean_script("  ** **  "), "");
    }
}
