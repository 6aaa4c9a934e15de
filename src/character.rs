use serde::{Deserialize, Deserializer, Serialize};

/// Substituted when a profile arrives with a blank name.
pub const DEFAULT_NAME: &str = "Hero";
/// Substituted when a profile arrives with a blank role.
pub const DEFAULT_ROLE: &str = "brave adventurer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Girl,
    Boy,
    #[default]
    Neutral,
}

impl Gender {
    /// Anything other than the two known categories maps to the neutral set.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "girl" => Gender::Girl,
            "boy" => Gender::Boy,
            _ => Gender::Neutral,
        }
    }

    /// Noun used when the character is introduced in a prompt.
    pub fn noun(self) -> &'static str {
        match self {
            Gender::Girl => "girl",
            Gender::Boy => "boy",
            Gender::Neutral => "child",
        }
    }

    pub fn pronouns(self) -> Pronouns {
        match self {
            Gender::Boy => Pronouns {
                subject: "he",
                object: "him",
                possessive: "his",
                reflexive: "himself",
                subject_cap: "He",
                possessive_cap: "His",
            },
            Gender::Girl => Pronouns {
                subject: "she",
                object: "her",
                possessive: "her",
                reflexive: "herself",
                subject_cap: "She",
                possessive_cap: "Her",
            },
            Gender::Neutral => Pronouns {
                subject: "they",
                object: "them",
                possessive: "their",
                reflexive: "themself",
                subject_cap: "They",
                possessive_cap: "Their",
            },
        }
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Gender::from_wire(&s))
    }
}

/// Fixed 6-field pronoun set used in prompt composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pronouns {
    pub subject: &'static str,
    pub object: &'static str,
    pub possessive: &'static str,
    pub reflexive: &'static str,
    pub subject_cap: &'static str,
    pub possessive_cap: &'static str,
}

/// Who the story is about. Owned by the caller, immutable for the duration
/// of a story session, passed by value into the engine on every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    pub age: u8,
    pub role: String,
    #[serde(default)]
    pub personalities: Vec<String>,
    #[serde(default)]
    pub favorite_color: Option<String>,
    #[serde(default)]
    pub favorite_animal: Option<String>,
}

impl CharacterProfile {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            DEFAULT_NAME
        } else {
            &self.name
        }
    }

    pub fn display_role(&self) -> &str {
        if self.role.trim().is_empty() {
            DEFAULT_ROLE
        } else {
            &self.role
        }
    }
}
