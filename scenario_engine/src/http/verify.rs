//! Assertions over a captured response.

use crate::diff::semantic_diff;
use crate::error::{ScenarioError, ScenarioResult};

use super::simulator::CapturedResponse;

impl CapturedResponse {
    /// Asserts the status code matches exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::StatusMismatch`], including the body, on a
    /// different status.
    pub fn assert_status(&self, expected: u16) -> ScenarioResult<()> {
        let actual = self.status();
        if actual != expected {
            return Err(ScenarioError::StatusMismatch {
                expected,
                actual,
                body: self.body.trim().to_owned(),
            });
        }
        Ok(())
    }

    /// Asserts the first value of header `name` equals `expected`.
    ///
    /// An absent header reads as the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::HeaderMismatch`] on a different value.
    pub fn assert_header(&self, name: &str, expected: &str) -> ScenarioResult<()> {
        let actual = self.header(name).unwrap_or_default();
        if actual != expected {
            return Err(ScenarioError::HeaderMismatch {
                name: name.to_owned(),
                expected: expected.to_owned(),
                actual,
            });
        }
        Ok(())
    }

    /// Asserts header `name` is not present at all, even with an empty value.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::HeaderPresent`] when the header exists.
    pub fn assert_header_absent(&self, name: &str) -> ScenarioResult<()> {
        match self.header(name) {
            Some(value) => Err(ScenarioError::HeaderPresent {
                name: name.to_owned(),
                value,
            }),
            None => Ok(()),
        }
    }

    /// Asserts the content type, then compares bodies semantically.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::ContentTypeMismatch`] before any body
    /// comparison when the content type differs, and
    /// [`ScenarioError::BodyMismatch`] when the bodies differ.
    pub fn assert_body(&self, content_type: &str, expected: &str) -> ScenarioResult<()> {
        let actual_type = self.header("content-type").unwrap_or_default();
        if actual_type != content_type {
            return Err(ScenarioError::ContentTypeMismatch {
                expected: content_type.to_owned(),
                actual: actual_type,
                body: self.body.trim().to_owned(),
            });
        }
        if let Some(diff) = semantic_diff(expected, &self.body) {
            return Err(ScenarioError::BodyMismatch { diff });
        }
        Ok(())
    }

    /// Asserts the body is exactly empty.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::BodyNotEmpty`] otherwise.
    pub fn assert_body_empty(&self) -> ScenarioResult<()> {
        if !self.body.is_empty() {
            return Err(ScenarioError::BodyNotEmpty {
                body: self.body.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use rstest::{fixture, rstest};

    #[fixture]
    fn response() -> CapturedResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-empty", HeaderValue::from_static(""));
        CapturedResponse {
            status: StatusCode::BAD_REQUEST,
            headers,
            body: r#"{"error": "key and url are required"}"#.to_owned(),
        }
    }

    #[rstest]
    fn status_mismatch_includes_body(response: CapturedResponse) {
        response.assert_status(400).expect("status matches");
        let err = response.assert_status(200).expect_err("status differs");
        assert!(err.to_string().contains("key and url are required"), "{err}");
    }

    #[rstest]
    fn absent_header_reads_as_empty(response: CapturedResponse) {
        response.assert_header("location", "").expect("absent reads as empty");
        let err = response
            .assert_header("location", "http://example.com")
            .expect_err("absent header");
        assert!(matches!(err, ScenarioError::HeaderMismatch { .. }));
    }

    #[rstest]
    fn empty_header_counts_as_present(response: CapturedResponse) {
        let err = response.assert_header_absent("x-empty").expect_err("present");
        assert!(matches!(err, ScenarioError::HeaderPresent { ref value, .. } if value.is_empty()));
        response.assert_header_absent("location").expect("absent");
    }

    #[rstest]
    fn body_comparison_is_semantic(response: CapturedResponse) {
        response
            .assert_body("application/json", "{\n  \"error\":\"key and url are required\"\n}")
            .expect("bodies equivalent");
    }

    #[rstest]
    fn content_type_is_checked_before_body(response: CapturedResponse) {
        let err = response
            .assert_body("text/html", r#"{"error": "key and url are required"}"#)
            .expect_err("content type differs");
        assert!(matches!(err, ScenarioError::ContentTypeMismatch { .. }));
    }

    #[rstest]
    fn empty_body_assertion_is_exact(response: CapturedResponse) {
        assert!(matches!(
            response.assert_body_empty(),
            Err(ScenarioError::BodyNotEmpty { .. })
        ));
        CapturedResponse::default()
            .assert_body_empty()
            .expect("default body is empty");
    }
}
