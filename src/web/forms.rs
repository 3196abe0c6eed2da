use super::WebError;
use crate::core::RecordDraft;
use serde::Deserialize;

pub const MAX_FIELD_LEN: usize = 256;

/// Create/edit form body. Absent fields are stored as empty text.
#[derive(Debug, Default, Deserialize)]
pub struct RecordForm {
    pub fname: Option<String>,
    pub fid: Option<String>,
    pub fscore: Option<String>,
}

impl RecordForm {
    pub fn into_draft(self) -> Result<RecordDraft, WebError> {
        Ok(RecordDraft {
            name: bounded("fname", self.fname)?,
            id: bounded("fid", self.fid)?,
            score: bounded("fscore", self.fscore)?,
        })
    }
}

/// Read-page filter form body.
#[derive(Debug, Default, Deserialize)]
pub struct QueryForm {
    pub fsql: Option<String>,
}

impl QueryForm {
    pub fn into_line(self) -> Result<String, WebError> {
        bounded("fsql", self.fsql)
    }
}

fn bounded(field: &str, value: Option<String>) -> Result<String, WebError> {
    let value = value.unwrap_or_default();
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(WebError::Input(format!(
            "{} must be at most {} characters",
            field, MAX_FIELD_LEN
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_become_empty() {
        let draft = RecordForm {
            fname: Some("Bo".to_string()),
            ..Default::default()
        }
        .into_draft()
        .unwrap();
        assert_eq!(draft, RecordDraft::new("Bo", "", ""));
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let draft = RecordForm {
            fname: Some(" Bo ".to_string()),
            fid: Some("007".to_string()),
            fscore: Some("ninety".to_string()),
        }
        .into_draft()
        .unwrap();
        assert_eq!(draft, RecordDraft::new(" Bo ", "007", "ninety"));
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let err = RecordForm {
            fscore: Some("9".repeat(MAX_FIELD_LEN + 1)),
            ..Default::default()
        }
        .into_draft()
        .unwrap_err();
        assert!(matches!(err, WebError::Input(message) if message.starts_with("fscore")));
    }

    #[test]
    fn test_absent_query_is_empty_line() {
        assert_eq!(QueryForm::default().into_line().unwrap(), "");
    }
}
