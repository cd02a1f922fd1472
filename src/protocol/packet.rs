//! Raw command tokenizer.
//!
//! Grammar: `<verb> <target_id> <action> <member> <args...>`, tokens split on
//! ASCII whitespace. A double-quoted token may contain whitespace and keeps
//! its quotes, so `"100"` and `100` remain distinguishable in the packet and
//! are only equated by the args-matching rule.

use serde::Serialize;

use crate::error::ProtocolError;

use super::IDOF_VERB;

/// A parsed RDO command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RdoPacket {
    /// Command verb (`call`, `get`, `set`, `idof`, ...).
    pub verb: String,
    /// Object the command is addressed to.
    pub target_id: Option<String>,
    /// Action token following the target.
    pub action: Option<String>,
    /// Remote member (method or property) name.
    pub member: Option<String>,
    /// Remaining tokens in order, quotes preserved.
    pub args: Vec<String>,
}

impl RdoPacket {
    /// Parses a raw command string.
    ///
    /// `idof <name>` commands carry no explicit member; the member is set to
    /// `idof` so object-id exchanges can be keyed by member like any other
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Empty`] for blank input and
    /// [`ProtocolError::UnterminatedQuote`] when a quoted token never closes.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut tokens = tokenize(raw)?.into_iter();
        let verb = tokens.next().ok_or(ProtocolError::Empty)?;
        let target_id = tokens.next();

        if verb.eq_ignore_ascii_case(IDOF_VERB) {
            return Ok(Self {
                verb: IDOF_VERB.to_string(),
                target_id: target_id.map(|t| strip_quotes(&t).to_string()),
                action: None,
                member: Some(IDOF_VERB.to_string()),
                args: tokens.collect(),
            });
        }

        let action = tokens.next();
        let member = tokens.next();
        Ok(Self {
            verb,
            target_id,
            action,
            member,
            args: tokens.collect(),
        })
    }

    /// Returns the member name, or an empty string when absent.
    #[must_use]
    pub fn member_name(&self) -> &str {
        self.member.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for RdoPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb)?;
        // idof's member is implied by the verb
        let member = if self.verb == IDOF_VERB {
            &None
        } else {
            &self.member
        };
        for field in [&self.target_id, &self.action, member]
            .into_iter()
            .flatten()
        {
            write!(f, " {field}")?;
        }
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Strips one pair of surrounding double quotes, if present.
#[must_use]
pub fn strip_quotes(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

fn tokenize(raw: &str) -> Result<Vec<String>, ProtocolError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote_start: Option<usize> = None;

    for (offset, ch) in raw.char_indices() {
        match ch {
            '"' => {
                current.push(ch);
                quote_start = match quote_start {
                    Some(_) => None,
                    None => Some(offset),
                };
            }
            c if c.is_ascii_whitespace() && quote_start.is_none() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if let Some(offset) = quote_start {
        return Err(ProtocolError::UnterminatedQuote { offset });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_call() {
        let packet = RdoPacket::parse(r#"call obj do RDOSetPrice 0 "100""#).unwrap();
        assert_eq!(packet.verb, "call");
        assert_eq!(packet.target_id.as_deref(), Some("obj"));
        assert_eq!(packet.action.as_deref(), Some("do"));
        assert_eq!(packet.member.as_deref(), Some("RDOSetPrice"));
        assert_eq!(packet.args, vec!["0".to_string(), "\"100\"".to_string()]);
    }

    #[test]
    fn quoted_token_keeps_whitespace() {
        let packet = RdoPacket::parse(r#"call 12 sel RDOSetName "New Town""#).unwrap();
        assert_eq!(packet.args, vec!["\"New Town\"".to_string()]);
    }

    #[test]
    fn trailing_fields_are_optional() {
        let packet = RdoPacket::parse("get 42").unwrap();
        assert_eq!(packet.verb, "get");
        assert_eq!(packet.target_id.as_deref(), Some("42"));
        assert!(packet.action.is_none());
        assert!(packet.member.is_none());
        assert!(packet.args.is_empty());
    }

    #[test]
    fn idof_sets_member() {
        let packet = RdoPacket::parse(r#"idof "DirectoryServer""#).unwrap();
        assert_eq!(packet.verb, "idof");
        assert_eq!(packet.target_id.as_deref(), Some("DirectoryServer"));
        assert_eq!(packet.member.as_deref(), Some("idof"));
        assert!(packet.action.is_none());
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let packet = RdoPacket::parse("  call   obj\tdo  Refresh ").unwrap();
        assert_eq!(packet.member.as_deref(), Some("Refresh"));
        assert!(packet.args.is_empty());
    }

    #[test]
    fn empty_command_is_rejected() {
        assert_eq!(RdoPacket::parse("   "), Err(ProtocolError::Empty));
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        assert_eq!(
            RdoPacket::parse(r#"call obj do Set "abc"#),
            Err(ProtocolError::UnterminatedQuote { offset: 16 })
        );
    }

    #[test]
    fn display_round_trips_tokens() {
        let raw = r#"call obj do RDOSetPrice 0 "100""#;
        assert_eq!(RdoPacket::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn strip_quotes_only_removes_matching_pair() {
        assert_eq!(strip_quotes("\"100\""), "100");
        assert_eq!(strip_quotes("100"), "100");
        assert_eq!(strip_quotes("\"100"), "\"100");
        assert_eq!(strip_quotes("\"\""), "");
    }
}
