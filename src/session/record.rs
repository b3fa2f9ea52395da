use crate::config::Config;
use crate::identity::{AttributeValue, Attributes, Authentication};
use std::fmt::Write;
use std::net::IpAddr;
use thiserror::Error;

const LINE_TERMINATOR: &str = "\r\n";
const ATTRIBUTE_PREFIX: &str = "ATTR_";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("configuration option 'username' is not set")]
    UsernameNotConfigured,

    #[error(
        "the user doesn't have an attribute named '{name}'; this attribute is expected to contain the {purpose}"
    )]
    MissingAttribute { name: String, purpose: &'static str },

    #[error("attribute '{0}' contains a line break")]
    InvalidAttribute(String),
}

/// What mod_auth_memcookie reads back from memcached to authorize requests.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    pub user_name: AttributeValue,
    pub groups: AttributeValue,
    pub remote_ip: String,
    pub attributes: Attributes,
}

impl SessionRecord {
    pub fn from_authentication(
        cfg: &Config,
        authentication: &Authentication,
        remote_ip: IpAddr,
    ) -> Result<Self, Error> {
        let attributes = &authentication.attributes;

        let username = cfg.username_attribute().ok_or(Error::UsernameNotConfigured)?;
        let user_name = required(attributes, username, "username")?;

        let groups = match cfg.groups_attribute() {
            Some(groups) => required(attributes, groups, "groups the user is a member of")?,
            None => AttributeValue::empty(),
        };

        for (name, value) in attributes {
            if has_line_break(name) || value.values().into_iter().any(has_line_break) {
                return Err(Error::InvalidAttribute(name.clone()));
            }
        }

        Ok(Self {
            user_name,
            groups,
            remote_ip: remote_ip.to_string(),
            attributes: attributes.clone(),
        })
    }

    /// One CRLF-terminated `key=value` line per entry: `UserName`, `Groups`, `RemoteIP`, then
    /// `ATTR_<name>` in attribute name order.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: &dyn std::fmt::Display| {
            let _ = write!(out, "{key}={value}{LINE_TERMINATOR}");
        };

        line("UserName", &self.user_name);
        line("Groups", &self.groups);
        line("RemoteIP", &self.remote_ip);
        for (name, value) in &self.attributes {
            line(&format!("{ATTRIBUTE_PREFIX}{name}"), value);
        }
        out
    }
}

fn required(attributes: &Attributes, name: &str, purpose: &'static str) -> Result<AttributeValue, Error> {
    attributes.get(name).cloned().ok_or_else(|| Error::MissingAttribute {
        name: name.to_string(),
        purpose,
    })
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}
