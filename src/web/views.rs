//! HTML pages.
//!
//! Pages are built with plain string interpolation; every user-controlled
//! value goes through [`html_escape`] first.

use crate::core::Record;
use axum::http::StatusCode;

const STYLE: &str = r#"
        body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 56rem; color: #222; }
        nav a { margin-right: 1rem; }
        table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
        th, td { border-bottom: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left; }
        form.record label { display: block; margin-top: 0.6rem; }
        .muted { color: #777; }
        .error { color: #a00; }
"#;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render the base layout with content.
pub fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Student Scores</title>
    <style>{STYLE}</style>
</head>
<body>
    <nav>
        <a href="/">Home</a>
        <a href="/read">Records</a>
        <a href="/create">Add record</a>
    </nav>
    <h1>{title}</h1>
    {content}
</body>
</html>"#,
        title = html_escape(title),
    )
}

pub fn index() -> String {
    layout(
        "Student Scores",
        r#"<p>Keep track of student scores.</p>
    <ul>
        <li><a href="/read">Browse and filter records</a></li>
        <li><a href="/create">Add a new record</a></li>
    </ul>"#,
    )
}

/// Record listing. `query` is the submitted filter line, echoed back into the form.
pub fn read(records: &[Record], query: Option<&str>) -> String {
    let rows = if records.is_empty() {
        r#"<tr><td colspan="5" class="muted">No records.</td></tr>"#.to_string()
    } else {
        records.iter().map(record_row).collect::<Vec<_>>().join("\n")
    };

    let content = format!(
        r#"<form method="post" action="/read">
        <label for="fsql">Filter</label>
        <input type="text" id="fsql" name="fsql" value="{query}" placeholder="score&gt;=80">
        <button type="submit">Search</button>
        <span class="muted">one of name, id, score with =, &lt;, &gt;, &lt;=, &gt;=; leave empty to sort by id</span>
    </form>
    <table>
        <thead><tr><th>Name</th><th>ID</th><th>Score</th><th>Created</th><th></th></tr></thead>
        <tbody>
        {rows}
        </tbody>
    </table>"#,
        query = html_escape(query.unwrap_or_default()),
    );

    layout("Records", &content)
}

fn record_row(record: &Record) -> String {
    let key = record.record_id.to_string();
    format!(
        r#"<tr>
            <td>{name}</td><td>{id}</td><td>{score}</td><td>{created}</td>
            <td><a href="/edit/{key}">edit</a> <a href="/delete/{key}">delete</a></td>
        </tr>"#,
        name = html_escape(&record.name),
        id = html_escape(&record.id),
        score = html_escape(&record.score),
        created = record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn record_form(action: &str, name: &str, id: &str, score: &str, submit: &str) -> String {
    format!(
        r#"<form class="record" method="post" action="{action}">
        <label>Name <input type="text" name="fname" value="{name}"></label>
        <label>ID <input type="text" name="fid" value="{id}"></label>
        <label>Score <input type="text" name="fscore" value="{score}"></label>
        <p><button type="submit">{submit}</button></p>
    </form>"#,
        action = html_escape(action),
        name = html_escape(name),
        id = html_escape(id),
        score = html_escape(score),
    )
}

pub fn create() -> String {
    layout("Add record", &record_form("/create", "", "", "", "Create"))
}

pub fn edit(record: &Record) -> String {
    let action = format!("/edit/{}", record.record_id);
    layout(
        "Edit record",
        &record_form(&action, &record.name, &record.id, &record.score, "Save"),
    )
}

pub fn error(status: StatusCode, message: &str) -> String {
    let content = format!(
        r#"<p class="error">{message}</p>
    <p class="muted">{status}</p>
    <p><a href="/read">Back to records</a></p>"#,
        message = html_escape(message),
        status = status,
    );
    layout("Error", &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RecordDraft, RecordId};
    use chrono::Utc;

    fn record(name: &str) -> Record {
        Record::from_draft(RecordId::new(), RecordDraft::new(name, "7", "88"), Utc::now())
    }

    #[test]
    fn test_escapes_markup() {
        assert_eq!(
            html_escape(r#"<b a="x">&'"#),
            "&lt;b a=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_read_page_lists_records_with_links() {
        let ann = record("Ann");
        let page = read(std::slice::from_ref(&ann), Some("score>=80"));
        assert!(page.contains("<td>Ann</td>"));
        assert!(page.contains(&format!("/edit/{}", ann.record_id)));
        assert!(page.contains(&format!("/delete/{}", ann.record_id)));
        assert!(page.contains(r#"value="score&gt;=80""#));
    }

    #[test]
    fn test_read_page_escapes_record_fields() {
        let page = read(&[record("<script>alert(1)</script>")], None);
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_empty_listing_says_so() {
        assert!(read(&[], None).contains("No records."));
    }

    #[test]
    fn test_edit_form_is_prefilled() {
        let bo = record("Bo");
        let page = edit(&bo);
        assert!(page.contains(r#"name="fname" value="Bo""#));
        assert!(page.contains(r#"name="fid" value="7""#));
        assert!(page.contains(r#"name="fscore" value="88""#));
        assert!(page.contains(&format!(r#"action="/edit/{}""#, bo.record_id)));
    }

    #[test]
    fn test_error_page_shows_status_and_message() {
        let page = error(StatusCode::NOT_FOUND, "record not found");
        assert!(page.contains("record not found"));
        assert!(page.contains("404 Not Found"));
    }
}
