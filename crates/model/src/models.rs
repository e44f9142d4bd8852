/// Short names accepted in configuration, mapped to full model ids.
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("opus", "claude-opus-4-1-20250805"),
    ("sonnet", "claude-sonnet-4-5-20250929"),
    ("haiku", "claude-haiku-4-5-20251001"),
];

pub const DEFAULT_MODEL: &str = "opus";

/// Resolve an alias (case-insensitive) to a model id; other values pass through.
pub fn resolve_model(name: &str) -> String {
    let trimmed = name.trim();
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
        .map_or_else(|| trimmed.to_string(), |(_, id)| (*id).to_string())
}

/// Whether the model accepts the 1M-token context beta header.
pub fn supports_1m_context(model_id: &str) -> bool {
    model_id.contains("sonnet-4")
}
