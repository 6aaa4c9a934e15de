pub mod character;
pub mod config;
pub mod engine;
pub mod generator;
pub mod illustration;
pub mod image;
pub mod llm;
pub mod prompt;
pub mod session;

pub use character::{CharacterProfile, Gender, Pronouns};
pub use config::Config;
pub use engine::{Choice, StoryEngine, StoryNode, StoryOutcome};
pub use session::StorySession;
