//! Email address parsing (RFC 5322 §3.4).

/// A parsed email address.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com (Support)"` → `display_name = "Support"`, `address = "user@example.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty). Still RFC 2047 encoded
    /// if the header was; decoding is the caller's job.
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

/// Characters that force a display name to be quoted (RFC 5322 `specials`).
const SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

impl EmailAddress {
    /// Parse a single mailbox from a header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    /// - `"user@domain.com (Display Name)"`
    ///
    /// Comments are removed; a comment is used as the display name only when
    /// there is no phrase before the angle address.
    pub fn parse(raw: &str) -> Self {
        let (stripped, comment) = strip_comments(raw);
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            return Self {
                display_name: String::new(),
                address: String::new(),
            };
        }

        // "Display Name <address>" or "<address>"
        if let Some((angle_start, angle_end)) = find_angle_addr(trimmed) {
            let addr = trimmed[angle_start + 1..angle_end].trim();
            // Drop an obsolete source route ("@a,@b:user@host")
            let addr = match addr.rfind(':') {
                Some(pos) if addr.starts_with('@') => &addr[pos + 1..],
                _ => addr,
            };
            let mut display_name = unquote(&trimmed[..angle_start]);
            if display_name.is_empty() {
                display_name = comment;
            }
            return Self {
                display_name,
                address: addr.trim().to_string(),
            };
        }

        // Bare address, possibly with a quoted local part
        Self {
            display_name: comment,
            address: unquote_local_part(trimmed),
        }
    }

    /// Parse a comma-separated list of addresses.
    ///
    /// Handles quoted commas (`"Last, First" <a@b.com>, other@c.com`),
    /// commas inside comments and angle brackets, and group syntax
    /// (`Team: a@b.com, c@d.com;`), whose members are flattened into the list.
    /// Entries with an empty address are dropped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut escaped = false;
        let mut comment_depth = 0usize;
        let mut in_angle = false;

        let mut flush = |current: &mut String| {
            let addr = Self::parse(current);
            if !addr.address.trim().is_empty() {
                results.push(addr);
            }
            current.clear();
        };

        for ch in raw.chars() {
            if escaped {
                escaped = false;
                current.push(ch);
                continue;
            }
            match ch {
                '\\' if in_quotes || comment_depth > 0 => {
                    escaped = true;
                    current.push(ch);
                }
                '"' if comment_depth == 0 => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '(' if !in_quotes => {
                    comment_depth += 1;
                    current.push(ch);
                }
                ')' if !in_quotes && comment_depth > 0 => {
                    comment_depth -= 1;
                    current.push(ch);
                }
                '<' if !in_quotes && comment_depth == 0 => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes && comment_depth == 0 => {
                    in_angle = false;
                    current.push(ch);
                }
                // Group name: everything so far is the label, not an address
                ':' if !in_quotes && comment_depth == 0 && !in_angle => current.clear(),
                ',' | ';' if !in_quotes && comment_depth == 0 && !in_angle => flush(&mut current),
                _ => current.push(ch),
            }
        }

        // Last segment
        flush(&mut current);

        results
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    ///
    /// Names containing RFC 5322 specials are double-quoted with `\` and `"`
    /// escaped, so the output parses back to the same pair.
    pub fn display(&self) -> String {
        let name = self.display_name.trim();
        if name.is_empty() {
            return self.address.clone();
        }
        if name.contains(SPECIALS) {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\" <{}>", self.address)
        } else {
            format!("{name} <{}>", self.address)
        }
    }
}

/// Remove `( … )` comments that are outside quoted strings.
///
/// Returns the remaining text and the trimmed text of the comments, joined
/// with a space.
fn strip_comments(s: &str) -> (String, String) {
    let mut rest = String::with_capacity(s.len());
    let mut comment = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            escaped = false;
            if depth > 0 {
                comment.push(ch);
            } else {
                rest.push(ch);
            }
            continue;
        }
        match ch {
            '\\' if in_quotes || depth > 0 => {
                escaped = true;
                if depth == 0 {
                    rest.push(ch);
                }
            }
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                rest.push(ch);
            }
            '(' if !in_quotes => {
                if depth > 0 {
                    comment.push(ch);
                } else if !comment.is_empty() {
                    comment.push(' ');
                }
                depth += 1;
            }
            ')' if !in_quotes && depth > 0 => {
                depth -= 1;
                if depth > 0 {
                    comment.push(ch);
                }
            }
            _ if depth > 0 => comment.push(ch),
            _ => rest.push(ch),
        }
    }

    (rest, comment.trim().to_string())
}

/// Locate the last `<…>` pair that is not inside a quoted string.
fn find_angle_addr(s: &str) -> Option<(usize, usize)> {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = None;
    let mut found = None;

    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => start = Some(i),
            '>' if !in_quotes => {
                if let Some(st) = start.take() {
                    found = Some((st, i));
                }
            }
            _ => {}
        }
    }
    found
}

/// Turn a phrase into plain text: strip surrounding quotes, unescape
/// quoted-pairs and collapse whitespace.
fn unquote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    let mut in_quotes = false;

    for ch in s.trim().chars() {
        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ => out.push(ch),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"john doe"@example.com` keeps its quotes only if the local part needs them.
fn unquote_local_part(s: &str) -> String {
    if s.starts_with('"') {
        if let Some(at) = s.rfind('@') {
            let local = unquote(&s[..at]);
            if !local.contains(char::is_whitespace) && !local.contains(SPECIALS) {
                return format!("{local}{}", &s[at..]);
            }
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_angle_address() {
        let addr = EmailAddress::parse("<user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("User One <user1@example.com>");
        assert_eq!(addr.address, "user1@example.com");
        assert_eq!(addr.display_name, "User One");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Last, First\" <user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "Last, First");
    }

    #[test]
    fn test_parse_quoted_name_with_escapes() {
        let addr = EmailAddress::parse(r#""The \"Boss\"" <boss@example.com>"#);
        assert_eq!(addr.display_name, "The \"Boss\"");
        assert_eq!(addr.address, "boss@example.com");
    }

    #[test]
    fn test_parse_trailing_comment_as_name() {
        let addr = EmailAddress::parse("support@example.com (Help Desk)");
        assert_eq!(addr.address, "support@example.com");
        assert_eq!(addr.display_name, "Help Desk");
    }

    #[test]
    fn test_comment_does_not_override_phrase() {
        let addr = EmailAddress::parse("Alice <alice@example.com> (work)");
        assert_eq!(addr.display_name, "Alice");
        assert_eq!(addr.address, "alice@example.com");
    }

    #[test]
    fn test_parse_list() {
        let list =
            EmailAddress::parse_list("User One <a@b.com>, User Two <c@d.com>, plain@addr.com");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].address, "a@b.com");
        assert_eq!(list[1].display_name, "User Two");
        assert_eq!(list[2].address, "plain@addr.com");
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Last, First\" <a@b.com>, other@c.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Last, First");
        assert_eq!(list[0].address, "a@b.com");
    }

    #[test]
    fn test_parse_list_with_comma_in_comment() {
        let list = EmailAddress::parse_list("a@b.com (Doe, John), c@d.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Doe, John");
        assert_eq!(list[1].address, "c@d.com");
    }

    #[test]
    fn test_parse_list_group_syntax() {
        let list = EmailAddress::parse_list("Team: a@b.com, Bob <c@d.com>;, solo@e.com");
        let addrs: Vec<&str> = list.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(addrs, vec!["a@b.com", "c@d.com", "solo@e.com"]);
    }

    #[test]
    fn test_parse_list_drops_empty_entries() {
        assert!(EmailAddress::parse_list("undisclosed-recipients:;").is_empty());
        assert_eq!(EmailAddress::parse_list(" , a@b.com ,, ").len(), 1);
    }

    #[test]
    fn test_display_with_name() {
        let addr = EmailAddress {
            display_name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_quotes_specials() {
        let addr = EmailAddress {
            display_name: "Last, First".to_string(),
            address: "lf@example.com".to_string(),
        };
        assert_eq!(addr.display(), "\"Last, First\" <lf@example.com>");
    }

    #[test]
    fn test_display_without_name() {
        let addr = EmailAddress {
            display_name: String::new(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "alice@example.com");
    }

    #[test]
    fn test_parse_empty() {
        let addr = EmailAddress::parse("");
        assert_eq!(addr.address, "");
    }
}
