// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use super::error::code::ErrorCode;
use super::error::MailBoardError;
use mail_parser::{Addr as MimeAddr, Address as MimeAddress};
use poem::error::ResponseError;
use poem::{Error, Response};
use poem_openapi::Object;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

pub mod auth;
pub mod error;
pub mod log;
pub mod signal;
pub mod timeout;

#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize, Object)]
pub struct Addr {
    /// The optional display name associated with the email address (e.g., "John Doe").
    /// If `None`, no display name is specified.
    pub name: Option<String>,
    /// The optional email address (e.g., "john.doe@example.com").
    /// If `None`, the address is unavailable, though typically at least one of `name` or `address` is provided.
    pub address: Option<String>,
}

impl Addr {
    pub fn parse(s: &str) -> Self {
        let re = Regex::new(r#"(?:(?P<name>.*)\s*)?<(?P<email>[^<>]+)>"#).unwrap();
        if let Some(caps) = re.captures(s) {
            let name: Option<String> = caps.name("name").map(|m| m.as_str().trim().into());
            let email: Option<String> = caps.name("email").map(|m| m.as_str().trim().into());
            Addr {
                name: name.filter(|n| !n.is_empty()),
                address: email,
            }
        } else {
            let s_trimmed = s.trim();
            Addr {
                name: None,
                address: if s_trimmed.is_empty() {
                    None
                } else {
                    Some(s_trimmed.into())
                },
            }
        }
    }
}

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => write!(f, "{} <{}>", name, address),
            (None, Some(address)) => write!(f, "<{}>", address),
            (Some(name), None) => write!(f, "{}", name),
            (None, None) => write!(f, ""),
        }
    }
}

impl<'x> From<&MimeAddr<'x>> for Addr {
    fn from(original: &MimeAddr<'x>) -> Self {
        Addr {
            name: original.name.as_ref().map(|s| s.to_string()),
            address: original.address.as_ref().map(|s| s.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddrVec(pub Vec<Addr>);

impl Deref for AddrVec {
    type Target = Vec<Addr>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'x> From<&MimeAddress<'x>> for AddrVec {
    fn from(original: &MimeAddress<'x>) -> Self {
        let vec = match original {
            MimeAddress::List(addrs) => addrs.iter().map(Addr::from).collect(),
            MimeAddress::Group(groups) => groups
                .iter()
                .flat_map(|group| group.addresses.iter().map(Addr::from))
                .collect(),
        };
        AddrVec(vec)
    }
}

#[inline]
fn create_mailboard_error(message: &str, code: ErrorCode) -> MailBoardError {
    MailBoardError::Generic {
        message: message.into(),
        location: snafu::Location::default(),
        code,
    }
}

#[inline]
pub fn create_api_error_response(message: &str, code: ErrorCode) -> Error {
    let mailboard_error = create_mailboard_error(message, code);
    Error::from(mailboard_error)
}

impl ResponseError for MailBoardError {
    fn status(&self) -> poem::http::StatusCode {
        match self {
            MailBoardError::Generic { code, .. } => code.status(),
        }
    }

    fn as_response(&self) -> Response {
        match self {
            MailBoardError::Generic { message, code, .. } => {
                let body = serde_json::json!({
                    "message": message,
                    "code": *code as u32,
                });
                Response::builder()
                    .status(code.status())
                    .content_type("application/json")
                    .body(body.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_name_form() {
        let addr = Addr::parse("Jane Poster <jane@forum.example>");
        assert_eq!(addr.name.as_deref(), Some("Jane Poster"));
        assert_eq!(addr.address.as_deref(), Some("jane@forum.example"));
    }

    #[test]
    fn parses_bare_address() {
        let addr = Addr::parse("jane@forum.example");
        assert_eq!(addr.name, None);
        assert_eq!(addr.address.as_deref(), Some("jane@forum.example"));
    }
}
