//! The identifier leaf: UUID parsing and rendering under the leniency policy.

use uuid::Uuid;

use crate::error::DecodeError;
use crate::options::Options;

/// The identifier substituted for tolerated empty or malformed text.
pub const DEFAULT_IDENTIFIER: Uuid = Uuid::nil();

/// Parses identifier text in any form `uuid` accepts (hyphenated, simple,
/// braced or URN).
pub fn parse_identifier(text: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(text)
}

/// Renders an identifier in its canonical lowercase hyphenated form.
pub fn render_identifier(id: &Uuid) -> String {
    id.hyphenated().to_string()
}

/// Converts identifier text, substituting [`DEFAULT_IDENTIFIER`] where the
/// options allow it.
pub fn identifier_from_text(text: &str, options: Options) -> Result<Uuid, DecodeError> {
    if text.is_empty() && options.allows_empty() {
        return Ok(DEFAULT_IDENTIFIER);
    }
    match parse_identifier(text) {
        Ok(id) => Ok(id),
        Err(_) if options.allows_invalid() => Ok(DEFAULT_IDENTIFIER),
        Err(source) => Err(DecodeError::IdentifierFormat {
            text: text.to_owned(),
            source,
        }),
    }
}
