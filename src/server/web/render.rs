use axum::http::StatusCode;

use crate::policy::{Abilities, Located};
use crate::social::Fragment;
use crate::types::{Doc, Owner};

/// Escapes text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} - BookLab</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

pub struct RepositoryPage<'a> {
    pub located: &'a Located,
    pub abilities: Abilities,
    pub docs: &'a [Doc],
    pub social: &'a [Fragment],
}

pub fn repository_page(page: &RepositoryPage<'_>) -> String {
    let owner = &page.located.owner;
    let repository = &page.located.repository;
    let path = owner.repository_path(repository);

    let mut body = String::from("<div class=\"reponav\">\n");
    body.push_str(&format!(
        "<h1 class=\"repo-title\"><a href=\"/{owner_slug}\">{owner_name}</a> / \
         <a href=\"{path}\">{name}</a>",
        owner_slug = owner.slug(),
        owner_name = escape_html(owner.name()),
        name = escape_html(&repository.name),
    ));
    if repository.is_private() {
        body.push_str(" <span class=\"label label-private\">Private</span>");
    }
    body.push_str("</h1>\n");

    if repository.has_toc {
        body.push_str(&format!(
            "<a class=\"reponav-item reponav-item-docs\" href=\"{path}\">Docs</a>\n"
        ));
    }
    if page.abilities.administer {
        body.push_str(&format!(
            "<a class=\"reponav-item reponav-item-settings\" href=\"{path}/settings\">Settings</a>\n"
        ));
    }
    body.push_str("<div class=\"social-buttons\">\n");
    for fragment in page.social {
        body.push_str(&fragment.to_html());
        body.push('\n');
    }
    body.push_str("</div>\n</div>\n");

    if let Some(description) = &repository.description {
        body.push_str(&format!(
            "<p class=\"repo-description\">{}</p>\n",
            escape_html(description)
        ));
    }

    if page.abilities.edit {
        body.push_str(&format!(
            "<a class=\"btn btn-create-doc\" href=\"{path}/docs/new\">New doc</a>\n"
        ));
    }

    let items: String = page
        .docs
        .iter()
        .map(|doc| {
            format!(
                "<li class=\"toc-item\"><a class=\"item-link\" href=\"{path}/{slug}\">{title}</a></li>\n",
                slug = doc.slug,
                title = escape_html(&doc.title),
            )
        })
        .collect();
    let list_class = if repository.has_toc {
        "repo-toc"
    } else {
        "repository-docs"
    };
    body.push_str(&format!("<ul class=\"{list_class}\">\n{items}</ul>"));

    layout(&repository.name, &body)
}

pub fn new_repository_page(owners: &[Owner]) -> String {
    let options: String = owners
        .iter()
        .map(|owner| {
            format!(
                "<option value=\"{id}\">{slug}</option>\n",
                id = escape_html(owner.id()),
                slug = escape_html(owner.slug()),
            )
        })
        .collect();

    let body = format!(
        "<h1>New repository</h1>\n\
         <form class=\"new-repository\" action=\"/repositories\" method=\"post\">\n\
         <select name=\"owner_id\">\n{options}</select>\n\
         <input type=\"text\" name=\"name\" placeholder=\"Name\">\n\
         <input type=\"text\" name=\"slug\" placeholder=\"Path\">\n\
         <textarea name=\"description\"></textarea>\n\
         <label><input type=\"radio\" name=\"privacy\" value=\"public\" checked> Public</label>\n\
         <label><input type=\"radio\" name=\"privacy\" value=\"private\"> Private</label>\n\
         <button type=\"submit\" class=\"btn btn-primary\">Create repository</button>\n\
         </form>"
    );

    layout("New repository", &body)
}

pub fn doc_page(located: &Located, doc: &Doc) -> String {
    let path = located.owner.repository_path(&located.repository);

    let paragraphs = doc
        .body
        .as_deref()
        .unwrap_or_default()
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>\n", escape_html(p)))
        .collect::<String>();

    let body = format!(
        "<div class=\"doc-header\"><a class=\"repo-link\" href=\"{path}\">{repo}</a></div>\n\
         <h1 class=\"doc-title\">{title}</h1>\n\
         <div class=\"doc-body\">\n{paragraphs}</div>",
        repo = escape_html(&located.repository.name),
        title = escape_html(&doc.title),
    );

    layout(&doc.title, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<div class=\"error\"><h1>{code}</h1><p>{message}</p></div>",
        code = status.as_u16(),
        message = escape_html(message),
    );
    layout(status.canonical_reason().unwrap_or("Error"), &body)
}
