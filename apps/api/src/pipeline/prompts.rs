// All LLM prompt constants for the feedback pipeline. Every prompt demands
// a single JSON object; llm_client::call_json strips stray code fences.

/// System prompt for classification — enforces a single JSON object.
pub const CLASSIFY_SYSTEM: &str =
    "You are a product-feedback analyst classifying customer mentions for a \
    triage pipeline. \
    You MUST respond with valid JSON only — a single object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Classification prompt template. Replace `{company_context}`, `{source}`,
/// `{metadata}`, `{engagement_score}`, `{title}`, `{content}` before sending.
pub const CLASSIFY_PROMPT_TEMPLATE: &str = r#"{company_context}Classify the following piece of customer feedback.

Return a JSON object with this EXACT schema (no extra fields):
{
  "category": "bug",
  "confidence": 85,
  "priority": "high",
  "priority_reasons": ["Blocker mentioned"],
  "sentiment": "negative",
  "keywords": ["export", "dashboard"],
  "customer_segment": "mid-market"
}

Allowed values:
- category: "bug" | "feature_request" | "praise" | "question" | "complaint" | "other"
- priority: "urgent" | "high" | "medium" | "low"
- sentiment: "positive" | "neutral" | "negative"
- customer_segment: "enterprise" | "mid-market" | "smb" | "unknown"
- confidence: integer 0-100
- keywords: at most 10 lowercase terms, most important first

Priority guidance: "urgent" only for blockers or data loss; "high" for
enterprise customers or widely-felt pain; engagement score above 70 means
the mention resonated widely.

FEEDBACK:
Source: {source}
Metadata: {metadata}
Engagement score: {engagement_score}
Title: {title}
Content: {content}"#;

/// System prompt for clustering — enforces a single JSON object.
pub const CLUSTER_SYSTEM: &str =
    "You are a product-feedback analyst grouping related customer mentions \
    into themes for ticket triage. \
    You MUST respond with valid JSON only — a single object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Clustering prompt template. Replace `{items}` before sending.
pub const CLUSTER_PROMPT_TEMPLATE: &str = r#"Group the following classified feedback items into 3-7 named themes.

Return a JSON object with this EXACT schema:
{
  "themes": [
    {"theme": "export reliability", "item_ids": ["reddit-abc-0", "twitter-xyz-0"]}
  ]
}

Rules:
1. Every item id you reference MUST be copied exactly from the list below
2. NEVER put items with different categories in the same theme
3. Theme names are short noun phrases (2-4 words)
4. An item belongs to at most one theme; leave an item out if nothing fits

ITEMS:
{items}"#;

/// System prompt for ticket drafting — enforces a single JSON object.
pub const DRAFT_SYSTEM: &str =
    "You are a product-feedback analyst writing issue-tracker tickets from \
    classified customer feedback. \
    You MUST respond with valid JSON only — a single object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent details absent from the feedback.";

/// Drafting prompt template. Replace `{source}`, `{title}`, `{content}`,
/// `{category}`, `{priority}`, `{sentiment}`, `{keywords}` before sending.
pub const DRAFT_PROMPT_TEMPLATE: &str = r###"Write an issue-tracker ticket for this classified feedback.

Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "Fix: export hangs on large dashboards",
  "description": "## Context\n...markdown body...",
  "suggested_labels": ["bug", "high", "export"],
  "suggested_priority": "high"
}

Rules:
1. Title: under 70 characters, action-oriented, prefixed by the work type
   (Fix:/Add:/Address:/Document:/Note:/Review:)
2. Description: markdown with sections for context, a direct user quote,
   classification details, and a source link when available
3. suggested_priority must be one of "urgent" | "high" | "medium" | "low"
4. Quote the user verbatim — do not paraphrase inside the quote block

FEEDBACK:
Source: {source}
Title: {title}
Content: {content}
Category: {category} | Priority: {priority} | Sentiment: {sentiment}
Keywords: {keywords}"###;
