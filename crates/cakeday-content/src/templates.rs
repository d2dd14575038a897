//! Static fallback templates, selected by personality.
//!
//! Template selection is deterministic (personality + batch size only) so a
//! retried batch renders identically and tests can assert exact output.

use tracing::info;

use crate::types::{join_mentions, CelebrantProfile};

/// Personality names accepted in config. Unknown names fall back to
/// "standard" rather than erroring — a typo in config must not stop a
/// celebration.
pub const PERSONALITIES: &[&str] = &[
    "standard",
    "mystic-dog",
    "superhero",
    "pirate",
    "tech-guru",
    "chef",
    "poet",
];

fn batch_title(count: usize) -> String {
    match count {
        2 => "Birthday Twins".to_string(),
        3 => "Birthday Triplets".to_string(),
        n => format!("Birthday {n}-Celebration"),
    }
}

fn opener(personality: &str) -> &'static str {
    match personality {
        "mystic-dog" => "The stars have aligned and the cosmos demands celebration!",
        "superhero" => "Birthday signal spotted over the city!",
        "pirate" => "Ahoy! All hands on deck for a birthday voyage!",
        "tech-guru" => "Deploying birthday celebration to production...",
        "chef" => "Something special is baking in the kitchen today!",
        "poet" => "A day of days, worth a verse or two:",
        _ => "It's celebration time!",
    }
}

/// Consolidated fallback message for a whole batch.
pub fn consolidated_message(personality: &str, celebrants: &[CelebrantProfile]) -> String {
    let mentions = join_mentions(celebrants);
    let message = if celebrants.len() == 1 {
        let age_line = celebrants[0]
            .age
            .map(|a| format!(" Turning {a} today!"))
            .unwrap_or_default();
        format!(
            ":birthday: *Happy Birthday!* :tada:\n\n\
             {opener}\n\n\
             <!here> Join us in wishing {mentions} a fantastic birthday!{age_line}\n\n\
             Let's make their special day amazing! :sparkles:",
            opener = opener(personality),
        )
    } else {
        format!(
            ":star2: *{title} Alert!* :star2:\n\n\
             {opener}\n\n\
             <!here> What are the odds?! {mentions} are all celebrating birthdays today!\n\n\
             This calls for an extra special celebration! :birthday: :tada:\n\n\
             Let's make their shared special day absolutely amazing! :sparkles:",
            title = batch_title(celebrants.len()),
            opener = opener(personality),
        )
    };
    info!(
        personality,
        count = celebrants.len(),
        "fallback template message generated"
    );
    message
}

/// Fallback title for an image upload when title generation fails.
pub fn image_title(personality: &str, celebrant: &CelebrantProfile) -> String {
    let name = &celebrant.display_name;
    match personality {
        "mystic-dog" => format!("{name}'s Cosmic Birthday Vision"),
        "superhero" => format!("Captain {name}'s Birthday Mission"),
        "pirate" => format!("Cap'n {name}'s Birthday Treasure"),
        "tech-guru" => format!("{name}.birthday() Successfully Executed"),
        "chef" => format!("{name}'s Birthday Recipe"),
        "poet" => format!("Ode to {name}'s Birthday"),
        _ => format!("{name}'s Amazing Birthday"),
    }
}
