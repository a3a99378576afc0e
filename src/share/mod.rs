//! Share grants: slug-addressed, read-only access to one resource subtree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ModuleKind;

pub mod store;

/// A persisted share grant.
///
/// A share scopes anonymous access to a single resource (`name`) of one
/// module (`kind`) and an explicit allow-list of items inside it. The slug is
/// the only handle a guest ever holds; it is generated server-side and never
/// changes. Records are immutable: replacing a grant means deleting and
/// recreating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub name: String,
    pub items: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Share {
    /// Returns true if the record is complete enough to be persisted: slug,
    /// name and at least one non-empty allow-list entry.
    pub fn is_valid(&self) -> bool {
        !self.slug.is_empty() && !self.name.is_empty() && self.items.iter().any(|i| !i.is_empty())
    }

    /// Returns true if the share grants access to `item` inside `name`.
    ///
    /// Items are matched exactly; this is the rule for gallery images and for
    /// listing-level filtering.
    pub fn includes(&self, name: &str, item: &str) -> bool {
        self.name == name && self.items.iter().any(|i| i == item)
    }

    /// Returns true if the share grants access to the hierarchical `path`.
    ///
    /// The path must stay inside the granted subtree (`name`) and must equal
    /// an allow-listed entry or extend one across a `/` boundary. Both checks
    /// are required so a malformed record can never authorize an access
    /// outside its own subtree.
    pub fn includes_path(&self, path: &str) -> bool {
        if !segment_prefixed(path, &self.name) {
            return false;
        }

        self.items.iter().any(|item| segment_prefixed(path, item))
    }

    /// Returns true if the grant carries an expiry that has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

// "/a/bc" is not inside "/a/b"; only whole segments count.
fn segment_prefixed(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery_share() -> Share {
        Share {
            slug: "bar".to_string(),
            kind: ModuleKind::Gallery,
            name: "foo".to_string(),
            items: vec!["test.jpg".to_string()],
            expires_at: None,
        }
    }

    #[test]
    fn is_valid_requires_slug_name_and_items() {
        let mut share = gallery_share();
        assert!(share.is_valid());

        share.items.clear();
        assert!(!share.is_valid());

        let mut share = gallery_share();
        share.items = vec![String::new()];
        assert!(!share.is_valid());

        let mut share = gallery_share();
        share.name.clear();
        assert!(!share.is_valid());

        let mut share = gallery_share();
        share.slug.clear();
        assert!(!share.is_valid());
    }

    #[test]
    fn includes_matches_name_and_item_exactly() {
        let share = gallery_share();
        assert!(share.includes("foo", "test.jpg"));
        assert!(!share.includes("bar", "test.jpg"));
        assert!(!share.includes("foo", "test2.jpg"));
        assert!(!share.includes("foo", "test"));
    }

    #[test]
    fn includes_path_requires_subtree_and_allow_list() {
        let share = Share {
            slug: "baz".to_string(),
            kind: ModuleKind::Files,
            name: "/test1".to_string(),
            items: vec!["/test1/inner".to_string()],
            expires_at: None,
        };

        assert!(share.includes_path("/test1/inner"));
        assert!(share.includes_path("/test1/inner/foo"));
        assert!(!share.includes_path("/test1/other"));
        assert!(!share.includes_path("/test1/innermost"));
        assert!(!share.includes_path("/test2/inner"));
        assert!(!share.includes_path("/foo"));
    }

    #[test]
    fn includes_path_rejects_items_outside_the_granted_subtree() {
        let share = Share {
            slug: "baz".to_string(),
            kind: ModuleKind::Files,
            name: "/test1".to_string(),
            items: vec!["/elsewhere".to_string()],
            expires_at: None,
        };

        assert!(!share.includes_path("/elsewhere"));
        assert!(!share.includes_path("/elsewhere/foo"));
    }

    #[test]
    fn expiry_checks_use_the_provided_clock() {
        let mut share = gallery_share();
        let now = Utc::now();

        assert!(!share.is_expired_at(now));
        share.expires_at = Some(now - chrono::Duration::hours(1));
        assert!(share.is_expired_at(now));
        share.expires_at = Some(now + chrono::Duration::hours(1));
        assert!(!share.is_expired_at(now));
    }

    #[test]
    fn json_shape_matches_the_wire_format() {
        let share = gallery_share();
        let json = serde_json::to_value(&share).unwrap();
        assert_eq!(json["slug"], "bar");
        assert_eq!(json["type"], "gallery");
        assert_eq!(json["name"], "foo");
        assert_eq!(json["items"][0], "test.jpg");
        assert!(json["expires_at"].is_null());

        let parsed: Share = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, share);
    }
}
