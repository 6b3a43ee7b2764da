use looks_core::ResolvedLook;

use crate::error::EngineError;

/// Theme named by the active look.
pub fn active_theme(active: Option<&ResolvedLook>) -> Option<&str> {
    active.and_then(ResolvedLook::theme)
}

/// Stable hex key identifying the active look and its merged config, for
/// callers that cache output per look.
pub fn cache_context(active: Option<&ResolvedLook>) -> Result<String, EngineError> {
    let bytes = rmp_serde::to_vec(&active).map_err(|e| EngineError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
