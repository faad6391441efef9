//! Prompt texts.

use chrono::NaiveDate;
use herald_core::{DayCategory, day_line};

/// Prompt sent alongside an image to caption it.
pub fn caption_prompt(team_name: &str) -> String {
    format!(
        "You are a professional real estate marketing expert for {team_name}, a property sales company in India.

Analyze this real estate marketing image and write a WhatsApp-ready promotional message.

Instructions:
1. Read the image carefully and extract all visible text (price, location, project name, features, contact info).
2. Do not make up information. Only use what is visible in the image.
3. If a price is visible, include it exactly as shown.
4. If a location is visible, include it exactly.
5. List features as bullet points with emojis.

Output format:
[Catchy headline based on the image]

\u{1F3E1} [Property type] @ [Price if visible]
\u{1F4CD} [Location if visible]

\u{2022} [Feature from the image]
\u{2022} [More features]

\u{1F4DE} Call Now for more details

Keep it clean and professional. If text is unreadable, describe what you see. Never invent prices or locations."
    )
}

/// Prompt for the morning greeting on `date`.
pub fn greeting_prompt(date: NaiveDate, category: DayCategory, team_name: &str) -> String {
    let header = day_line(date);
    match category {
        DayCategory::EndOfWeek => format!(
            "You are the enthusiastic team leader of '{team_name}', a real estate sales team.
Write a special Sunday morning motivation message for the team.

Context:
- Sunday is the most important day in real estate: site visits and closings.
- Date: {header}

Requirements:
- Tone: high energy, appreciative, creative.
- Language: natural Hinglish (mix of Hindi and English).
- Mention that today is the day for maximum site visits and closings.

Format:
\u{1F4C5} {header}

\"[Quote]\"

[Main body]"
        ),
        DayCategory::Regular => format!(
            "You are the team leader of '{team_name}', a real estate sales team.
Write a morning motivational message.

Context:
- Date: {header}
- Focus: sales, follow-ups, hustle, discipline.

Requirements:
- Tone: professional yet warm and motivating.
- Language: Hinglish (mix of Hindi and English).
- Keep it fresh; avoid generic phrases.
- Include a short, powerful quote about success, sales, or hard work.

Format:
\u{1F4C5} {header}

\"[Quote]\"

Good Morning {team_name}! \u{2600}\u{FE0F}
[One line of motivation] \u{1F3E1}\u{1F680}"
        ),
    }
}
