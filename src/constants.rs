pub const MODEL_API_KEY_ENV_NAME: &str = "TABLESCOUT_MODEL_API_KEY";

pub(crate) const THINK_STRIPPER: &str = r"<think>[\s\S]*</think>\s*";

/// Matches provider error messages that mean "too many requests".
pub(crate) const RATE_LIMIT_MARKER: &str = r"(?i)\b429\b|rate[\s_-]?limit|too many requests";

pub(crate) const DEFAULT_PROMPT_TEMPLATE: &str = r#"
You will see everything that has been written about a single restaurant:
its own description, its labels and articles that mention it.
Write a concise, neutral summary of the restaurant for a dining guide.
Mention the kind of food, the atmosphere and anything that makes it stand out.
Your answer should contain only the summary, it will be pasted directly into the guide.
Restaurant content to summarize:"#;

pub(crate) const USER_AGENT: &str = "Tablescout Bot";
