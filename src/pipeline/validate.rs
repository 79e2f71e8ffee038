//! Client-side validation of a candidate file.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. a file is present
//! 2. the declared media type is allowed, or failing that the extension is
//! 3. size ≤ limit (strictly greater is rejected)
//! 4. size > 0
//!
//! A rejected file never reaches the network.

use crate::error::ValidationError;
use crate::pipeline::input::FileMeta;

/// Media types accepted without looking at the extension.
pub const ALLOWED_MEDIA_TYPES: [&str; 4] = ["audio/mpeg", "audio/wav", "audio/x-wav", "audio/mp3"];

/// Extensions accepted when the media type is absent or not recognised.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Default upload limit: 100 MiB.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate `file` against the allow-lists and `max_size`.
pub fn validate(file: Option<&FileMeta>, max_size: u64) -> Result<(), ValidationError> {
    let file = file.ok_or(ValidationError::NoFile)?;

    if !is_allowed_type(file) {
        return Err(ValidationError::UnsupportedType);
    }

    if file.size > max_size {
        return Err(ValidationError::TooLarge {
            size: file.size,
            limit: max_size,
        });
    }

    if file.size == 0 {
        return Err(ValidationError::Empty);
    }

    Ok(())
}

/// Media type first; the extension is only consulted when that fails.
fn is_allowed_type(file: &FileMeta) -> bool {
    let type_ok = file.media_type.as_deref().is_some_and(|t| {
        ALLOWED_MEDIA_TYPES
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(t.trim()))
    });

    type_ok || ALLOWED_EXTENSIONS.contains(&extension(&file.name).as_str())
}

/// Lowercased text after the last `.`; a name without a dot is its own extension.
pub fn extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, media_type: Option<&str>, size: u64) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            media_type: media_type.map(str::to_string),
            size,
        }
    }

    #[test]
    fn missing_file() {
        assert_eq!(validate(None, MAX_FILE_SIZE), Err(ValidationError::NoFile));
    }

    #[test]
    fn media_type_short_circuits_extension() {
        for ext in ["mp3", "txt", "bin", ""] {
            let name = format!("clip.{ext}");
            let f = meta(&name, Some("audio/mpeg"), 10);
            assert_eq!(validate(Some(&f), MAX_FILE_SIZE), Ok(()), "name {name}");
        }
    }

    #[test]
    fn every_allowed_media_type_is_accepted() {
        for t in ALLOWED_MEDIA_TYPES {
            let f = meta("noext", Some(t), 1);
            assert_eq!(validate(Some(&f), MAX_FILE_SIZE), Ok(()), "type {t}");
        }
    }

    #[test]
    fn extension_fallback() {
        let f = meta("take.WAV", Some("application/octet-stream"), 10);
        assert_eq!(validate(Some(&f), MAX_FILE_SIZE), Ok(()));
        let f = meta("take.mp3", None, 10);
        assert_eq!(validate(Some(&f), MAX_FILE_SIZE), Ok(()));
    }

    #[test]
    fn unrecognised_type_and_extension_rejected() {
        let f = meta("notes.txt", Some("text/plain"), 10);
        let err = validate(Some(&f), MAX_FILE_SIZE).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedType);
        assert_eq!(err.to_string(), "Only MP3 or WAV files are allowed.");
    }

    #[test]
    fn size_limit_is_inclusive() {
        let f = meta("a.wav", None, MAX_FILE_SIZE);
        assert_eq!(validate(Some(&f), MAX_FILE_SIZE), Ok(()));

        let f = meta("a.wav", None, MAX_FILE_SIZE + 1);
        let err = validate(Some(&f), MAX_FILE_SIZE).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert_eq!(err.to_string(), "File size exceeds 100MB limit.");
    }

    #[test]
    fn empty_file_rejected() {
        let f = meta("a.mp3", Some("audio/mpeg"), 0);
        assert_eq!(validate(Some(&f), MAX_FILE_SIZE), Err(ValidationError::Empty));
    }

    #[test]
    fn type_checked_before_size() {
        let f = meta("huge.txt", None, MAX_FILE_SIZE * 2);
        assert_eq!(
            validate(Some(&f), MAX_FILE_SIZE),
            Err(ValidationError::UnsupportedType)
        );
    }

    #[test]
    fn extension_rules() {
        assert_eq!(extension("a.b.MP3"), "mp3");
        assert_eq!(extension("wav"), "wav");
        assert_eq!(extension("trailing."), "");
    }
}
