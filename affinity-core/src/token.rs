//! RFC 2617 subset (de)serialization for `Authorization` headers:
//! `Scheme key1="v1", key2="v2", …`.

use crate::error::AffinityError;

/// A parsed `Authorization` header: a scheme name and its ordered parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    scheme: String,
    params: Vec<(String, String)>,
}

impl Token {
    /// Build a token from a scheme name and ordered `(key, value)` parameters.
    pub fn new(scheme: impl Into<String>, params: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            scheme: scheme.into(),
            params: params.into_iter().collect(),
        }
    }

    /// The scheme name (e.g. `"Affinity"`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Look up a parameter's value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Iterate over the parameters in serialization order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a header value of the form `Scheme key1="v1", key2=v2`.
    ///
    /// Quoted values accept `\"` as an escaped literal quote. Unquoted values run to the
    /// next top-level comma (or end of input) and are trimmed of surrounding whitespace.
    pub fn parse(header: &str) -> Result<Self, AffinityError> {
        let header = header.trim();
        let (scheme, rest) = header
            .split_once(char::is_whitespace)
            .ok_or_else(|| AffinityError::ParseError(format!("missing scheme in header {header:?}")))?;
        if scheme.is_empty() {
            return Err(AffinityError::ParseError("empty scheme in header".into()));
        }

        let mut params = Vec::new();
        let mut chars = rest.trim_start().chars().peekable();

        while chars.peek().is_some() {
            let key = take_until(&mut chars, '=')
                .trim()
                .to_string();
            if key.is_empty() {
                return Err(AffinityError::ParseError(format!("empty parameter name in header {header:?}")));
            }
            match chars.next() {
                Some('=') => {}
                _ => return Err(AffinityError::ParseError(format!("missing '=' after {key:?}"))),
            }

            let value = match chars.peek() {
                Some('"') => {
                    chars.next();
                    parse_quoted(&mut chars, header)?
                }
                _ => take_until(&mut chars, ',').trim().to_string(),
            };
            params.push((key, value));

            skip_whitespace(&mut chars);
            match chars.peek() {
                Some(',') => {
                    chars.next();
                    skip_whitespace(&mut chars);
                }
                Some(_) => {
                    return Err(AffinityError::ParseError(format!(
                        "expected ',' between parameters in header {header:?}"
                    )))
                }
                None => break,
            }
        }

        Ok(Self {
            scheme: scheme.to_string(),
            params,
        })
    }

    /// Serialize back to `Scheme key=value, …`, quoting every value and escaping any `"`
    /// it contains.
    pub fn serialize(&self) -> String {
        let mut out = self.scheme.clone();
        out.push(' ');
        let rendered: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", v.replace('"', "\\\"")))
            .collect();
        out.push_str(&rendered.join(", "));
        out
    }
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars>) {
    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }
}

fn take_until(chars: &mut std::iter::Peekable<std::str::Chars>, stop: char) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c == stop {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn parse_quoted(chars: &mut std::iter::Peekable<std::str::Chars>, header: &str) -> Result<String, AffinityError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(AffinityError::ParseError(format!("unterminated quoted value in {header:?}"))),
            },
            Some('"') => return Ok(out),
            Some(c) => out.push(c),
            None => return Err(AffinityError::ParseError(format!("unterminated quoted value in {header:?}"))),
        }
    }
}
