use crate::image::{self, ImageClient};
use log::{info, warn};

/// Appended to every filtered description before submission.
pub const STYLE_SUFFIX: &str = "Children's book illustration style.";

const GENERIC_REFERENCES: [&str; 3] = ["the main character", "our hero", "the protagonist"];
const POSSESSIVES: [&str; 3] = ["his", "her", "their"];
const FEATURES: [&str; 4] = ["face", "expression", "eyes", "smile"];

/// Defense-in-depth filter for descriptions that leaked a character
/// reference despite the composer's instruction: drops the character's name
/// (case-insensitive, whole word), generic self-references, and possessive +
/// facial-feature pairs, then collapses the leftover whitespace.
pub fn scrub_character_references(description: &str, character_name: &str) -> String {
    let mut text = remove_phrase(description, character_name.trim());
    for phrase in GENERIC_REFERENCES {
        text = remove_phrase(&text, phrase);
    }
    for possessive in POSSESSIVES {
        for feature in FEATURES {
            let pair = format!("{} {}", possessive, feature);
            text = remove_phrase(&text, &pair);
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes whole-word, ASCII-case-insensitive occurrences of `phrase`.
fn remove_phrase(text: &str, phrase: &str) -> String {
    if phrase.is_empty() {
        return text.to_string();
    }

    let hay = text.as_bytes();
    let needle = phrase.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;

    while i + needle.len() <= hay.len() {
        let boundary_before = i == 0 || !hay[i - 1].is_ascii_alphanumeric();
        let after = i + needle.len();
        let boundary_after = after == hay.len() || !hay[after].is_ascii_alphanumeric();

        if text.is_char_boundary(i)
            && boundary_before
            && boundary_after
            && hay[i..after].eq_ignore_ascii_case(needle)
        {
            out.push_str(&text[copied..i]);
            i = after;
            copied = after;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Non-propagating wrapper around an image provider: scrubs the description,
/// appends the fixed style suffix, and degrades to the error placeholder on
/// any provider failure.
pub struct IllustrationRenderer {
    client: Box<dyn ImageClient>,
}

impl IllustrationRenderer {
    pub fn new(client: Box<dyn ImageClient>) -> Self {
        Self { client }
    }

    pub async fn render(&self, description: &str, character_name: &str) -> String {
        let scrubbed = scrub_character_references(description, character_name);
        if scrubbed != description.trim() {
            info!("Scrubbed character references from illustration description");
        }

        let prompt = format!("{} {}", scrubbed, STYLE_SUFFIX);
        match self.client.render(&prompt).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Illustration generation failed, using placeholder: {:#}", e);
                image::error_placeholder_url()
            }
        }
    }
}
