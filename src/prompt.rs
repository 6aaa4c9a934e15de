use crate::character::CharacterProfile;

/// Personality description used when the profile lists no traits.
pub const DEFAULT_TRAITS: &str = "curious and kind";

const ILLUSTRATION_STYLE: &str = "Children's book illustration in a modern, animated style \
with clean lines and vibrant colors. The art should be whimsical and engaging, suitable for \
young readers.";

/// System + user instruction pair submitted to the text-generation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

/// Scene-setting description for a theme id. Unknown ids get a generic
/// templated description so composition never fails.
pub fn theme_description(theme: &str) -> String {
    let known = match theme {
        "fantasy" => {
            "Set in a magical kingdom with castles, dragons, wizards, and enchanted forests. \
             Include elements like magic spells, royal quests, and mythical creatures."
        }
        "space" => {
            "Set in outer space with planets, spaceships, alien friends, and cosmic adventures. \
             Include elements like zero gravity, star systems, and intergalactic travel."
        }
        "forest" => {
            "Set in a mysterious woodland with talking animals, hidden pathways, and nature \
             magic. Include elements like ancient trees, forest creatures, and natural wonders."
        }
        "ocean" => {
            "Set underwater in the ocean with colorful coral reefs, sea creatures, and \
             underwater cities. Include elements like submarines, mermaids, and ocean treasures."
        }
        "timetravel" => {
            "Set across different time periods with time machines, historical figures, and \
             temporal paradoxes. Include elements like dinosaur ages, future cities, and time \
             portals."
        }
        "vehicles" => {
            "Set in a world where vehicles are alive and can talk. Include friendly cars, \
             trucks, construction vehicles, trains, and airplanes having adventures on roads, \
             construction sites, and airports."
        }
        "dinosaurs" => {
            "Set in prehistoric times or a land where dinosaurs still exist. Include friendly \
             dinosaurs like T-Rex, Triceratops, and Pterodactyls as characters in jungle and \
             volcanic landscapes."
        }
        "pirates" => {
            "Set on the high seas with pirate ships, treasure maps, and island adventures. \
             Include elements like parrots, treasure chests, and friendly sea battles."
        }
        "superhero" => {
            "Set in a modern city where the character has special powers. Include elements \
             like saving people, fighting (gentle) villains, and using superpowers for good."
        }
        "magic_school" => {
            "Set in a school where students learn magic. Include elements like spell classes, \
             magical creatures as pets, flying broomsticks, and enchanted classrooms."
        }
        "safari" => {
            "Set in the African savanna with lions, elephants, giraffes, and zebras. Include \
             elements like safari vehicles, watering holes, and animal migrations."
        }
        "candyland" => {
            "Set in a world made entirely of candy and sweets. Include chocolate rivers, gummy \
             bear citizens, candy cane forests, and ice cream mountains."
        }
        "robots" => {
            "Set in a futuristic world or factory with friendly robots. Include elements like \
             robot assembly, circuits, gears, and helpful robot companions."
        }
        "fairytale" => {
            "Set in classic storybook lands with familiar fairytale elements. Include elements \
             like enchanted cottages, magical beans, fairy godmothers, and talking mirrors."
        }
        "arctic" => {
            "Set in the Arctic or Antarctic with snow, ice, and polar animals. Include elements \
             like igloos, Northern Lights, penguins, polar bears, and ice fishing."
        }
        _ => {
            return format!(
                "Set in a world themed around {}. Be creative and include appropriate \
                 elements for this theme.",
                theme
            );
        }
    };
    known.to_string()
}

/// Content-complexity guidance banded by age. Thresholds are compared with
/// `<=` in ascending order, so ages 4, 7 and 10 fall into the lower band.
pub fn age_guidelines(age: u8) -> &'static str {
    if age <= 4 {
        "This story is for very young children (ages 3-4). Keep the following in mind:\n\
         - Use very simple vocabulary and short sentences\n\
         - Focus on basic concepts like colors, shapes, and simple emotions\n\
         - Include lots of repetition and familiar patterns\n\
         - Keep the story very gentle and reassuring\n\
         - Avoid any scary or complex situations\n\
         - Use simple, clear choices that are easy to understand"
    } else if age <= 7 {
        "This story is for young children (ages 5-7). Keep the following in mind:\n\
         - Use simple but varied vocabulary\n\
         - Include basic problem-solving elements\n\
         - Focus on friendship, kindness, and simple moral lessons\n\
         - Keep the story light and fun\n\
         - Include some gentle challenges that can be easily overcome\n\
         - Use clear choices that help develop decision-making skills"
    } else if age <= 10 {
        "This story is for older children (ages 8-10). Keep the following in mind:\n\
         - Use more complex vocabulary and sentence structures\n\
         - Include more sophisticated problem-solving\n\
         - Focus on character development and personal growth\n\
         - Can include mild challenges and conflicts\n\
         - Include some educational elements and interesting facts\n\
         - Use choices that encourage critical thinking"
    } else {
        "This story is for pre-teens (ages 11+). Keep the following in mind:\n\
         - Use more sophisticated language and concepts\n\
         - Include complex problem-solving and character development\n\
         - Focus on personal growth and meaningful challenges\n\
         - Can include more nuanced moral situations\n\
         - Include educational elements and interesting facts\n\
         - Use choices that encourage deeper thinking and personal values"
    }
}

/// Builds the instruction pair for one generation turn. Pure function of its
/// inputs; absent profile fields get documented defaults and composition
/// never fails.
pub fn compose(
    character: &CharacterProfile,
    theme: &str,
    previous_context: Option<&str>,
) -> PromptMessages {
    let name = character.display_name();
    let role = character.display_role();
    let pronouns = character.gender.pronouns();

    let traits = if character.personalities.is_empty() {
        DEFAULT_TRAITS.to_string()
    } else {
        character.personalities.join(", ")
    };

    let mut character_details = format!(
        "The main character is {name}, a {noun} who is {age} years old. Their role in this \
         story is a {role}.\n{name}'s personality traits are: {traits}.",
        name = name,
        noun = character.gender.noun(),
        age = character.age,
        role = role,
        traits = traits,
    );
    if let Some(color) = &character.favorite_color {
        character_details.push_str(&format!(
            "\n{}'s favorite color is {}. Try to weave this color into the story or \
             illustration if appropriate.",
            name, color
        ));
    }
    if let Some(animal) = &character.favorite_animal {
        character_details.push_str(&format!(
            "\n{}'s favorite animal is {}. This animal could make an appearance as a friend, \
             guide, or creature encountered.",
            name, animal
        ));
    }

    let system = format!(
        "You are a creative and engaging storyteller for children.\n\
         {details}\n\
         {guidelines}\n\
         The story theme is: {theme}.\n\n\
         IMPORTANT THEME GUIDANCE: {theme_desc}\n\n\
         The story should be positive, magical, and age-appropriate, written in simple, \
         easy-to-understand language.\n\
         Incorporate {name}'s characteristics naturally into the narrative. Use correct \
         pronouns based on their gender ({subj}/{obj}/{poss}).\n\n\
         CRITICAL: The story MUST be set in the {theme} world as described above. Do NOT \
         default to generic forest or fantasy settings unless that is the specific theme.\n\n\
         Your response MUST be a single, valid JSON object. Do not include any text outside \
         of this JSON object.\n\
         The JSON object must have the following keys:\n\
         1. \"title\": A creative, engaging title for this story (5-8 words). Should be \
         exciting and capture the essence of the adventure. Do not include the character's \
         name in the title.\n\
         2. \"story_text\": A string containing the next paragraph of the story (2-4 \
         sentences).\n\
         3. \"choices\": An array of 2 or 3 choice objects. Each choice object must have:\n\
         a. \"text\": A string for the choice presented to the user (e.g., \"Explore the \
         sparkling cave\").\n\
         b. \"next_prompt_context\": A brief string describing the essence of this choice, \
         which will be used to inform the next part of the story if this choice is selected \
         (e.g., \"chose to explore the cave\").\n\
         4. \"illustration_prompt\": A detailed, descriptive prompt (around 30-60 words) for \
         generating a vibrant, friendly, and safe children's book style illustration for the \
         current story scene.\n\n\
         CRITICAL RULE FOR ILLUSTRATIONS: You MUST NOT include {name} or any reference to \
         the main character in the illustration prompt. Do NOT mention their face, body, \
         expressions, or any part of them. Focus ONLY on the environment, setting, objects, \
         creatures, and atmosphere. For example, instead of \"Show the excitement on \
         {name}'s face\", write \"Show the magical glowing crystal floating in the air with \
         swirling energy around it\". {style}",
        details = character_details,
        guidelines = age_guidelines(character.age),
        theme = theme,
        theme_desc = theme_description(theme),
        name = name,
        subj = pronouns.subject,
        obj = pronouns.object,
        poss = pronouns.possessive,
        style = ILLUSTRATION_STYLE,
    );

    let user = match previous_context {
        Some(context) => format!(
            "Continue the story based on the previous choice: \"{}\". What happens next?",
            context
        ),
        None => format!("Start the adventure for {}! Set the scene.", name),
    };

    PromptMessages { system, user }
}
