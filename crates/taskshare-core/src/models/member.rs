use serde::{Deserialize, Serialize};

/// A person belonging to a group.
///
/// `id` is stable across sessions and is the only field the cache interprets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: Option<bool>,
}

impl Member {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            avatar_url: None,
            is_admin: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_deserializes_camel_case_fields() {
        let json = r#"{"id":"u1","name":"Ada","avatarUrl":"https://x/a.png","isAdmin":true}"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(member.id, "u1");
        assert_eq!(member.avatar_url.as_deref(), Some("https://x/a.png"));
        assert!(member.is_admin());
    }

    #[test]
    fn test_member_optional_fields_default_to_none() {
        let member: Member = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(member, Member::new("u2"));
        assert!(!member.is_admin());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(Member::new("u3").display_name(), "u3");
        assert_eq!(Member::new("u3").with_name("  ").display_name(), "u3");
        assert_eq!(Member::new("u3").with_name("Grace").display_name(), "Grace");
    }
}
