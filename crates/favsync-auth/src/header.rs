use crate::AuthError;

/// Extracts the token from an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>`: the scheme is case-sensitive,
/// separated by one space, and the token may not itself contain whitespace.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] for `None` and
/// [`AuthError::MalformedHeader`] for any other shape.
pub fn parse_bearer(value: Option<&str>) -> Result<&str, AuthError> {
    let value = value.ok_or(AuthError::MissingHeader)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None)
            if !token.is_empty() && !token.contains(char::is_whitespace) =>
        {
            Ok(token)
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bearer_token() {
        assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_distinct() {
        assert!(matches!(parse_bearer(None), Err(AuthError::MissingHeader)));
    }

    #[test]
    fn rejects_other_shapes() {
        for value in [
            "",
            "Bearer",
            "Bearer ",
            "bearer abc",
            "Basic abc",
            "Bearer  abc",
            "Bearer abc def",
            "Bearer abc\t",
        ] {
            assert!(
                matches!(parse_bearer(Some(value)), Err(AuthError::MalformedHeader)),
                "accepted {value:?}"
            );
        }
    }
}
