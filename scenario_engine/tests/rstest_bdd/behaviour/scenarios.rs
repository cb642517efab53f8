//! Binds the engine's feature files to the step registry.

use crate::fixtures::{HttpContext, VerificationContext, http_context, verification_context};
use rstest_bdd_macros::scenarios;

scenarios!(
    "tests/features/record_verification.feature",
    fixtures = [verification_context: VerificationContext]
);
scenarios!(
    "tests/features/http_simulation.feature",
    fixtures = [http_context: HttpContext]
);
