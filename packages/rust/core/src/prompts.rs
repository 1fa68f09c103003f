//! Prompt texts for link curation, summarization and message writing.

/// Styles offered to users; any other free-text style is passed through as-is.
pub const SUGGESTED_STYLES: &[&str] = &["Professional", "Friendly", "Intriguing"];

/// JSON key the curation response must carry.
pub const CURATED_LINKS_KEY: &str = "useful_links";

/// System instructions for link curation, capped at `limit` links.
pub fn curation_system_prompt(limit: usize) -> String {
    format!(
        "You are helping research a company through its website: what it offers, why customers \
benefit from its products, and what sets it apart from competitors.

You will receive a JSON array with every link found on the site. Choose the links most worth \
reading for that purpose, most useful first, at most {limit}.

Respond with a JSON object only, no other text: {{\"{CURATED_LINKS_KEY}\": [\"<link>\", ...]}}. \
Every link must be copied exactly from the input."
    )
}

pub const COMPANY_SUMMARY_SYSTEM_PROMPT: &str = r#"You will receive text collected from a company's website. Write a detailed summary of the company and list up to 10 facts about it: its products, the advantages of using them, notable features, company values and other positive aspects. Keep both concise and informative.

Use this layout:

Summary:
<summary of the company>

Facts:

1. <fact>
2. <fact>
...
"#;

pub const LEAD_SUMMARY_SYSTEM_PROMPT: &str = r#"You will receive text about a person: profile details and recent posts. Write a detailed summary of the person and list up to 10 facts about their interests, career and activities. Include the person's name, the companies they worked for, and other notable names and numbers. Keep both concise and informative.

Use this layout:

Summary:
<summary of the person>

Facts:

1. <fact>
2. <fact>
...
"#;

const MESSAGE_CLOSING_QUESTION: &str = "Imagine doubling your audience growth effortlessly with our sales automation platform. What would you achieve with that kind of boost?";

/// System instructions for the personalized message in the given style.
pub fn message_system_prompt(style: &str) -> String {
    format!(
        "You write outreach messages. You will receive facts and a summary about a person, \
facts and a summary about our company, and excerpts from the company's website that \
point at shared interests and benefits for the person.

Instructions:
1) Write a short, catchy, hyper-personalized sales message from this information.
2) Open with a greeting (Hi or Hello) and the person's name, then write 3-5 sentences about \
them, their career and passions. Add 1-2 sentences on how the company can improve their \
life and business.
3) Compliment the person and build a connection. Be polite and not too salesy.
4) Write in a {style} style.
5) Leave no placeholders: the message is sent to the person exactly as written.
6) Output only the message, with no heading or closing remarks around it.
7) End with a catchy question; rephrase or reuse this one: \"{MESSAGE_CLOSING_QUESTION}\""
    )
}

/// User content for the personalized message.
pub fn message_user_prompt(
    lead_summary: &str,
    company_summary: &str,
    context_chunks: &[String],
    notes: &str,
) -> String {
    let mut prompt = format!(
        "Person facts and summary:\n{}\n\nCompany facts and summary:\n{}\n\nRelevant company excerpts:\n",
        lead_summary.trim(),
        company_summary.trim()
    );

    for (i, chunk) in context_chunks.iter().enumerate() {
        prompt.push_str(&format!("\n[{}] {}\n", i + 1, chunk.trim()));
    }

    let notes = notes.trim();
    if !notes.is_empty() {
        prompt.push_str(&format!("\nAdditional notes from the sender:\n{notes}\n"));
    }
    prompt
}
