//! Texts used when the captioning service is unavailable.

use chrono::NaiveDate;
use herald_core::{DayCategory, day_line};
use rand::seq::SliceRandom;

/// Caption posted with an image when none could be generated.
pub const FALLBACK_CAPTION: &str = "\u{1F3E1} Premium Property Available!

\u{1F4CD} Prime Location
\u{2022} Quality Construction
\u{2022} Great Investment Opportunity

\u{1F4DE} Call Now for more details";

/// Quotes a regular-day fallback greeting is drawn from.
pub const FALLBACK_QUOTES: [&str; 8] = [
    "Success usually comes to those who are too busy to be looking for it.",
    "The road to success and the road to failure are almost exactly the same.",
    "Opportunities don't happen. You create them.",
    "Don't watch the clock; do what it does. Keep going.",
    "The secret of getting ahead is getting started.",
    "Quality means doing it right when no one is looking.",
    "It always seems impossible until it is done.",
    "Keep your face always toward the sunshine and shadows will fall behind you.",
];

/// Build a greeting for `date` without the captioning service.
pub fn fallback_greeting(date: NaiveDate, category: DayCategory, team_name: &str) -> String {
    match category {
        DayCategory::EndOfWeek => format!(
            "\u{1F4C5} {} | Sunday Special\n\n\
             \"Review, Reflect, and Recharge.\"\n\n\
             Good Morning {}! \u{2600}\u{FE0F}\n\
             Today is the day for site visits and closings. Power up! \u{1F3E1}\u{1F4AA}",
            date.format("%-d %b %Y"),
            team_name
        ),
        DayCategory::Regular => {
            let quote = FALLBACK_QUOTES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(FALLBACK_QUOTES[0]);
            format!(
                "\u{1F4C5} {}\n\n\
                 \"{}\"\n\n\
                 Good Morning {}! \u{2600}\u{FE0F}\n\
                 Let's crush our targets today! \u{1F3E1}\u{1F680}",
                day_line(date),
                quote,
                team_name
            )
        }
    }
}
