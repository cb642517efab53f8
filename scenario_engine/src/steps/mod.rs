//! Binds step text to engine operations.
//!
//! A [`StepRegistry`] is an ordered list of anchored patterns. The first
//! pattern matching a step's text wins, so patterns are written to be
//! mutually exclusive rather than relying on order.

use std::fmt;

use regex::Regex;

use crate::context::ScenarioContext;
use crate::error::{ScenarioError, ScenarioResult};
use crate::fixture::{insert_many, insert_one};
use crate::record::{verify_absence, verify_record};

/// Header injected by the remote-address step.
pub const FORWARDED_FOR: &str = "X-Forwarded-For";

/// One step of a scenario: its text plus an optional data table or
/// docstring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Step text without its keyword.
    pub text: String,
    /// Attached data table rows.
    pub table: Option<Vec<Vec<String>>>,
    /// Attached docstring.
    pub docstring: Option<String>,
}

impl Step {
    /// Creates a step with no attachments.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches a data table.
    #[must_use]
    pub fn with_table<R, C>(mut self, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.table = Some(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }

    /// Attaches a docstring.
    #[must_use]
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// Returns the attached table.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::MissingTable`] when none is attached.
    pub fn table(&self) -> ScenarioResult<&[Vec<String>]> {
        self.table
            .as_deref()
            .ok_or_else(|| ScenarioError::MissingTable {
                text: self.text.clone(),
            })
    }

    /// Returns the attached docstring.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::MissingDocstring`] when none is attached.
    pub fn docstring(&self) -> ScenarioResult<&str> {
        self.docstring
            .as_deref()
            .ok_or_else(|| ScenarioError::MissingDocstring {
                text: self.text.clone(),
            })
    }

    /// Reads the attached table as `name | value` rows.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::MissingTable`] without a table and
    /// [`ScenarioError::InvalidArgument`] when a row does not have exactly
    /// two cells.
    pub fn pairs(&self) -> ScenarioResult<Vec<(String, String)>> {
        self.table()?
            .iter()
            .map(|row| match row.as_slice() {
                [name, value] => Ok((name.clone(), value.clone())),
                other => Err(ScenarioError::invalid_argument(
                    &self.text,
                    format!("expected two cells per row, got {}", other.len()),
                )),
            })
            .collect()
    }
}

/// Captures and attachments handed to a step function.
#[derive(Debug)]
pub struct StepArgs<'a> {
    step: &'a Step,
    captures: Vec<String>,
}

impl StepArgs<'_> {
    /// Returns the step being run.
    #[must_use]
    pub const fn step(&self) -> &Step {
        self.step
    }

    /// Returns the `index`-th capture group (zero-based).
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidArgument`] when the pattern has no such
    /// group.
    pub fn capture(&self, index: usize) -> ScenarioResult<&str> {
        self.captures
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                ScenarioError::invalid_argument(&self.step.text, format!("missing capture {index}"))
            })
    }
}

type StepFn = Box<dyn Fn(&mut ScenarioContext, &StepArgs<'_>) -> ScenarioResult<()> + Send + Sync>;
type HookFn = Box<dyn Fn(&mut ScenarioContext) + Send + Sync>;

struct StepDefinition {
    pattern: Regex,
    run: StepFn,
}

/// Ordered step patterns with their operations, plus scenario hooks.
#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
    before: Vec<HookFn>,
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .field("before_hooks", &self.before.len())
            .finish()
    }
}

impl StepRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the standard fixture, HTTP and record
    /// vocabulary, with a hook that resets HTTP state before each scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidPattern`] if a built-in pattern fails
    /// to compile.
    pub fn standard() -> ScenarioResult<Self> {
        let mut registry = Self::new();
        registry.before_each(|ctx| ctx.http.reset());
        registry
            .register(r#"a record exists in "([^"]+)" with:"#, record_exists)?
            .register(r#"records exist in "([^"]+)":"#, records_exist)?
            .register(r#"the client's remote address is "([^"]+)""#, remote_address)?
            .register(r#"the client does a ([A-Z]+) request to "([^"]+)""#, request)?
            .register(
                r#"the client does a ([A-Z]+) request to "([^"]+)" with the following data:"#,
                request_with_data,
            )?
            .register(
                r#"the client does a ([A-Z]+) request to "([^"]+)" with the following headers:"#,
                request_with_headers,
            )?
            .register(r"the response code should be (\d{3})(?: \([^)]+\))?", status_is)?
            .register(r#"the response header "([^"]+)" should be "([^"]*)""#, header_is)?
            .register(r#"the response header "([^"]+)" should be not set"#, header_absent)?
            .register(
                r#"the response body should be the following "([^"]+)":"#,
                body_is,
            )?
            .register("the response body should be empty", body_empty)?
            .register(r#"this record exists in "([^"]+)":"#, record_matches)?
            .register(r#"no record exists in "([^"]+)" with id "([^"]*)""#, record_absent)?;
        Ok(registry)
    }

    /// Appends a pattern. Patterns are anchored at both ends.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidPattern`] when the pattern does not
    /// compile.
    pub fn register<F>(&mut self, pattern: &str, run: F) -> ScenarioResult<&mut Self>
    where
        F: Fn(&mut ScenarioContext, &StepArgs<'_>) -> ScenarioResult<()> + Send + Sync + 'static,
    {
        let anchored = format!(
            "{}{}{}",
            if pattern.starts_with('^') { "" } else { "^" },
            pattern,
            if pattern.ends_with('$') { "" } else { "$" }
        );
        let compiled = Regex::new(&anchored).map_err(|source| ScenarioError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        self.definitions.push(StepDefinition {
            pattern: compiled,
            run: Box::new(run),
        });
        Ok(self)
    }

    /// Adds a hook run before every scenario.
    pub fn before_each<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ScenarioContext) + Send + Sync + 'static,
    {
        self.before.push(Box::new(hook));
        self
    }

    /// Runs every before-scenario hook in registration order.
    pub fn before_scenario(&self, ctx: &mut ScenarioContext) {
        for hook in &self.before {
            hook(ctx);
        }
    }

    /// Iterates over registered patterns in order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .map(|definition| definition.pattern.as_str())
    }

    /// Lists every pattern matching `text`; more than one means the
    /// vocabulary is ambiguous for that text.
    #[must_use]
    pub fn matching_patterns(&self, text: &str) -> Vec<&str> {
        self.definitions
            .iter()
            .filter(|definition| definition.pattern.is_match(text))
            .map(|definition| definition.pattern.as_str())
            .collect()
    }

    /// Runs the first definition matching `step`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UndefinedStep`] when nothing matches, or the
    /// error raised by the step's operation.
    pub fn run(&self, ctx: &mut ScenarioContext, step: &Step) -> ScenarioResult<()> {
        for definition in &self.definitions {
            let Some(captures) = definition.pattern.captures(&step.text) else {
                continue;
            };
            let args = StepArgs {
                step,
                captures: captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_owned()))
                    .collect(),
            };
            tracing::trace!(step = %step.text, pattern = definition.pattern.as_str(), "running step");
            return (definition.run)(ctx, &args);
        }
        Err(ScenarioError::UndefinedStep {
            text: step.text.clone(),
        })
    }
}

fn record_exists(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    let pairs = args.step().pairs()?;
    insert_one(ctx.store(), args.capture(0)?, &pairs)
}

fn records_exist(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    insert_many(ctx.store(), args.capture(0)?, args.step().table()?)
}

fn remote_address(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    ctx.http.set_default_header(FORWARDED_FOR, args.capture(0)?)
}

fn request(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    ctx.http
        .dispatch(args.capture(0)?, args.capture(1)?, &[], None)
        .map(|_| ())
}

fn request_with_data(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    let body = args.step().docstring()?;
    ctx.http
        .dispatch(args.capture(0)?, args.capture(1)?, &[], Some(body))
        .map(|_| ())
}

fn request_with_headers(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    let headers = args.step().pairs()?;
    ctx.http
        .dispatch(args.capture(0)?, args.capture(1)?, &headers, None)
        .map(|_| ())
}

fn status_is(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    let raw = args.capture(0)?;
    let expected = raw.parse::<u16>().map_err(|err| {
        ScenarioError::invalid_argument(&args.step().text, format!("status {raw:?}: {err}"))
    })?;
    ctx.http.response()?.assert_status(expected)
}

fn header_is(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    ctx.http
        .response()?
        .assert_header(args.capture(0)?, args.capture(1)?)
}

fn header_absent(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    ctx.http.response()?.assert_header_absent(args.capture(0)?)
}

fn body_is(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    ctx.http
        .response()?
        .assert_body(args.capture(0)?, args.step().docstring()?)
}

fn body_empty(ctx: &mut ScenarioContext, _args: &StepArgs<'_>) -> ScenarioResult<()> {
    ctx.http.response()?.assert_body_empty()
}

fn record_matches(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    let pairs = args.step().pairs()?;
    verify_record(ctx.store(), args.capture(0)?, &pairs)
}

fn record_absent(ctx: &mut ScenarioContext, args: &StepArgs<'_>) -> ScenarioResult<()> {
    verify_absence(ctx.store(), args.capture(0)?, args.capture(1)?)
}
