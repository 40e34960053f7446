use serde::Serialize;

use crate::policy::Located;
use crate::types::ActionType;

/// Rendered state of one social button. Each fragment is scoped to a single
/// (repository, action type) pair so several can update on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub repository_id: String,
    pub action_type: ActionType,
    pub active: bool,
    pub count: i64,
    /// Endpoint the button posts to (and deletes from, when active).
    pub url: String,
}

impl Fragment {
    pub(crate) fn new(located: &Located, action_type: ActionType, active: bool, count: i64) -> Self {
        Self {
            repository_id: located.repository.id.clone(),
            action_type,
            active,
            count,
            url: format!(
                "{}/action?action_type={}",
                located.owner.repository_path(&located.repository),
                action_type
            ),
        }
    }

    /// CSS class unique to this repository and action type.
    #[must_use]
    pub fn scope(&self) -> String {
        format!("repository-{}-{}-button", self.repository_id, self.action_type)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.active {
            undo_label(self.action_type)
        } else {
            label(self.action_type)
        }
    }

    /// Button markup for the repository page. Slugs and ids are restricted to
    /// URL-safe characters, so nothing here needs escaping.
    #[must_use]
    pub fn to_html(&self) -> String {
        let active = if self.active { " active" } else { "" };
        let method = if self.active { "delete" } else { "post" };
        format!(
            "<button class=\"btn btn-social {scope}{active}\" data-url=\"{url}\" \
             data-method=\"{method}\" data-label=\"{label}\" data-undo-label=\"{undo}\">\
             <span class=\"social-label\">{current}</span> \
             <span class=\"social-count\">{count}</span></button>",
            scope = self.scope(),
            url = self.url,
            label = label(self.action_type),
            undo = undo_label(self.action_type),
            current = self.label(),
            count = self.count,
        )
    }

    /// Script response swapping the button into its new state.
    #[must_use]
    pub fn to_script(&self) -> String {
        let attr = if self.active { "data-undo-label" } else { "data-label" };
        let method = if self.active { "delete" } else { "post" };
        format!(
            "(function() {{\n\
             \x20 var btn = $(\".{scope}\");\n\
             \x20 btn.find(\".social-label\").text(btn.attr(\"{attr}\"));\n\
             \x20 btn.find(\".social-count\").text(\"{count}\");\n\
             \x20 btn.attr(\"data-method\", \"{method}\");\n\
             \x20 btn.toggleClass(\"active\", {active});\n\
             }})();\n",
            scope = self.scope(),
            count = self.count,
            active = self.active,
        )
    }
}

fn label(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Star => "Star",
        ActionType::Watch => "Watch",
    }
}

fn undo_label(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Star => "Unstar",
        ActionType::Watch => "Unwatch",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{Owner, Privacy, Repository, User};

    fn located() -> Located {
        let owner = Owner::User(User {
            id: "u-1".to_string(),
            slug: "alice".to_string(),
            name: "Alice".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        let repository = Repository {
            id: "r-1".to_string(),
            owner_id: "u-1".to_string(),
            name: "Handbook".to_string(),
            slug: "handbook".to_string(),
            description: None,
            privacy: Privacy::Public,
            has_toc: true,
            stars_count: 0,
            watches_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        Located { owner, repository }
    }

    #[test]
    fn test_scope_is_per_repository_and_type() {
        let loc = located();
        let star = Fragment::new(&loc, ActionType::Star, false, 0);
        let watch = Fragment::new(&loc, ActionType::Watch, false, 0);

        assert_eq!(star.scope(), "repository-r-1-star-button");
        assert_eq!(watch.scope(), "repository-r-1-watch-button");
        assert_eq!(star.url, "/alice/handbook/action?action_type=star");
    }

    #[test]
    fn test_script_uses_undo_label_when_active() {
        let script = Fragment::new(&located(), ActionType::Star, true, 3).to_script();

        assert!(script.contains("$(\".repository-r-1-star-button\")"));
        assert!(script.contains("btn.attr(\"data-undo-label\")"));
        assert!(script.contains(".text(\"3\")"));
    }

    #[test]
    fn test_script_uses_label_when_inactive() {
        let script = Fragment::new(&located(), ActionType::Watch, false, 0).to_script();

        assert!(script.contains("btn.attr(\"data-label\")"));
        assert!(!script.contains("data-undo-label"));
    }

    #[test]
    fn test_html_shows_current_label() {
        let html = Fragment::new(&located(), ActionType::Watch, true, 2).to_html();

        assert!(html.contains("repository-r-1-watch-button active"));
        assert!(html.contains("<span class=\"social-label\">Unwatch</span>"));
        assert!(html.contains("data-label=\"Watch\""));
    }
}
