/// Landing page that embeds the anonymous session tokens.
pub const DEFAULT_LANDING_URL: &str = "https://www.meta.ai/";
/// GraphQL endpoint accepting the terms-of-service handshake.
pub const DEFAULT_HANDSHAKE_URL: &str = "https://www.meta.ai/api/graphql/";
/// GraphQL endpoint accepting prompts and source lookups.
pub const DEFAULT_GRAPHQL_URL: &str = "https://graph.meta.ai/graphql?locale=user";

/// Trim an endpoint override, falling back to `default` when blank.
pub fn endpoint_or_default(input: &str, default: &'static str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        default.to_owned()
    } else {
        trimmed.to_owned()
    }
}
