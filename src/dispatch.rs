use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::app::AppError;
use crate::cli::PatchBody;

/// Parse a patch template from `--json` or `--file` (`-` reads stdin).
pub fn parse_patch<T: DeserializeOwned>(body: &PatchBody) -> Result<T, AppError> {
    let raw = read_patch_body(body)?;
    Ok(serde_json::from_str(&raw)?)
}

fn read_patch_body(body: &PatchBody) -> Result<String, AppError> {
    match (&body.json, &body.file) {
        (Some(inline), _) => Ok(inline.clone()),
        (None, Some(path)) if path == Path::new("-") => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
        (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
        (None, None) => Err(AppError::Structural(
            "a patch body is required; pass --json or --file".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_patch;
    use crate::app::{AppError, ErrorKind};
    use crate::cli::PatchBody;
    use crate::domain::patch::{Field, RowPatchTemplate};

    #[test]
    fn parses_inline_json_with_null_as_unchanged() {
        let body = PatchBody {
            json: Some(
                r#"{"id":3,"title":null,"taskList":[{"id":10,"size":null,"position":4}]}"#
                    .to_string(),
            ),
            file: None,
        };
        let patch: RowPatchTemplate = parse_patch(&body).expect("patch should parse");
        assert_eq!(patch.id, 3);
        assert!(patch.title.is_unchanged());
        assert_eq!(patch.task_patches()[0].position, Field::Set(4));
        assert!(patch.task_patches()[0].size.is_unchanged());
    }

    #[test]
    fn reads_body_from_file() {
        let path = std::env::temp_dir().join(format!("tpm-patch-{}.json", uuid::Uuid::now_v7()));
        std::fs::write(&path, r#"{"id":1,"title":""}"#).expect("body should be writable");
        let body = PatchBody {
            json: None,
            file: Some(path.clone()),
        };
        let patch: RowPatchTemplate = parse_patch(&body).expect("patch should parse");
        assert_eq!(patch.title, Field::Set(String::new()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn malformed_or_missing_bodies_are_rejected() {
        let malformed = PatchBody {
            json: Some("{\"title\":\"no id\"}".to_string()),
            file: None,
        };
        let err = parse_patch::<RowPatchTemplate>(&malformed).expect_err("id is required");
        assert_eq!(err.kind(), ErrorKind::StructuralInvalid);

        let missing = PatchBody {
            json: None,
            file: Some(std::env::temp_dir().join("tpm-does-not-exist.json")),
        };
        assert!(matches!(
            parse_patch::<RowPatchTemplate>(&missing),
            Err(AppError::Io(_))
        ));
    }
}
