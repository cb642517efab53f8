//! Runs Gherkin feature files through a [`StepRegistry`].
//!
//! Each scenario gets a fresh [`ScenarioContext`] from a caller-supplied
//! factory, so scenarios never share a store. Steps run strictly in order and
//! a scenario stops at its first failing step.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use gherkin::GherkinEnv;

use crate::config::RunnerConfig;
use crate::context::ScenarioContext;
use crate::error::{ScenarioError, ScenarioResult};
use crate::steps::{Step, StepRegistry};

/// The failing step of a scenario and why it failed.
#[derive(Debug)]
pub struct StepFailure {
    /// Keyword and text of the failing step, or `<setup>` when the context
    /// could not be built.
    pub step: String,
    /// The error that ended the scenario.
    pub error: ScenarioError,
}

/// Result of one scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Name of the enclosing feature.
    pub feature: String,
    /// Scenario name.
    pub scenario: String,
    /// Failure details, or `None` when every step passed.
    pub failure: Option<StepFailure>,
}

impl ScenarioOutcome {
    /// Whether the scenario passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Results of a feature run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Outcomes in execution order.
    pub outcomes: Vec<ScenarioOutcome>,
    /// Scenarios skipped by tag or because they are outlines.
    pub skipped: usize,
}

impl RunSummary {
    /// Number of passing scenarios.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed()).count()
    }

    /// Number of failing scenarios.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// Whether no scenario failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn merge(&mut self, other: Self) {
        self.outcomes.extend(other.outcomes);
        self.skipped += other.skipped;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} scenarios ({} passed, {} failed, {} skipped)",
            self.outcomes.len() + self.skipped,
            self.passed(),
            self.failed(),
            self.skipped
        )?;
        for outcome in &self.outcomes {
            if let Some(failure) = &outcome.failure {
                writeln!(
                    f,
                    "FAILED {} / {}\n  step: {}\n  error: {}",
                    outcome.feature, outcome.scenario, failure.step, failure.error
                )?;
            }
        }
        Ok(())
    }
}

/// Executes feature files against a step registry.
#[derive(Debug)]
pub struct FeatureRunner {
    registry: StepRegistry,
    exclude_tags: Vec<String>,
}

impl FeatureRunner {
    /// Creates a runner excluding the default `wip` and `todo` tags.
    #[must_use]
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            exclude_tags: RunnerConfig::default().exclude_tags,
        }
    }

    /// Replaces the excluded tags. A leading `@` is ignored.
    #[must_use]
    pub fn exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tags = tags.into_iter().map(|tag| bare_tag(&tag.into())).collect();
        self
    }

    /// Runs the features named by `config`, or nothing when it asks to skip.
    ///
    /// The configured tags replace the runner's own exclusions for this run.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::FeatureParse`] when a feature cannot be read
    /// or parsed.
    pub fn run_configured<F>(&self, config: &RunnerConfig, factory: F) -> ScenarioResult<RunSummary>
    where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        if config.skip {
            tracing::info!("feature run skipped by configuration");
            return Ok(RunSummary::default());
        }
        let exclude: Vec<String> = config.exclude_tags.iter().map(|tag| bare_tag(tag)).collect();
        self.run_path_excluding(&config.features, &exclude, factory)
    }

    /// Runs one feature file, or every `.feature` file below a directory in
    /// path order.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::FeatureParse`] when a feature cannot be read
    /// or parsed.
    pub fn run_path<F>(&self, path: &Utf8Path, factory: F) -> ScenarioResult<RunSummary>
    where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        self.run_path_excluding(path, &self.exclude_tags, factory)
    }

    /// Runs feature source text.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::FeatureParse`] when the text is not valid
    /// Gherkin.
    pub fn run_source<F>(&self, source: &str, mut factory: F) -> ScenarioResult<RunSummary>
    where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        let feature = gherkin::Feature::parse(source, GherkinEnv::default()).map_err(|err| {
            ScenarioError::FeatureParse {
                path: Utf8PathBuf::from("<inline>"),
                message: err.to_string(),
            }
        })?;
        Ok(self.run_feature(&feature, &self.exclude_tags, &mut factory))
    }

    fn run_path_excluding<F>(
        &self,
        path: &Utf8Path,
        exclude: &[String],
        mut factory: F,
    ) -> ScenarioResult<RunSummary>
    where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        let mut summary = RunSummary::default();
        for file in feature_files(path)? {
            tracing::debug!(path = %file, "parsing feature");
            let feature = gherkin::Feature::parse_path(file.as_std_path(), GherkinEnv::default())
                .map_err(|err| ScenarioError::FeatureParse {
                    path: file.clone(),
                    message: err.to_string(),
                })?;
            summary.merge(self.run_feature(&feature, exclude, &mut factory));
        }
        Ok(summary)
    }

    fn run_feature<F>(
        &self,
        feature: &gherkin::Feature,
        exclude: &[String],
        factory: &mut F,
    ) -> RunSummary
    where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        let mut summary = RunSummary::default();
        let background: Vec<&gherkin::Step> = feature
            .background
            .iter()
            .flat_map(|background| &background.steps)
            .collect();
        let plan = ScenarioPlan {
            feature,
            exclude,
            tags: &feature.tags,
            background: &background,
        };
        for scenario in &feature.scenarios {
            self.run_scenario(&plan, scenario, factory, &mut summary);
        }
        for rule in &feature.rules {
            let mut rule_background = background.clone();
            rule_background.extend(rule.background.iter().flat_map(|background| &background.steps));
            let tags: Vec<String> = feature.tags.iter().chain(&rule.tags).cloned().collect();
            let plan = ScenarioPlan {
                feature,
                exclude,
                tags: &tags,
                background: &rule_background,
            };
            for scenario in &rule.scenarios {
                self.run_scenario(&plan, scenario, factory, &mut summary);
            }
        }
        summary
    }

    fn run_scenario<F>(
        &self,
        plan: &ScenarioPlan<'_>,
        scenario: &gherkin::Scenario,
        factory: &mut F,
        summary: &mut RunSummary,
    ) where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        if let Some(tag) = plan
            .tags
            .iter()
            .chain(&scenario.tags)
            .map(|tag| bare_tag(tag))
            .find(|tag| plan.exclude.contains(tag))
        {
            tracing::debug!(scenario = %scenario.name, tag = %tag, "skipping tagged scenario");
            summary.skipped += 1;
            return;
        }
        if !scenario.examples.is_empty() {
            tracing::warn!(scenario = %scenario.name, "scenario outlines are not supported; skipping");
            summary.skipped += 1;
            return;
        }

        let failure = self.execute(plan.background, &scenario.steps, factory);
        let feature = &plan.feature.name;
        match &failure {
            None => tracing::info!(feature = %feature, scenario = %scenario.name, "scenario passed"),
            Some(failure) => tracing::warn!(
                feature = %feature,
                scenario = %scenario.name,
                step = %failure.step,
                error = %failure.error,
                "scenario failed"
            ),
        }
        summary.outcomes.push(ScenarioOutcome {
            feature: feature.clone(),
            scenario: scenario.name.clone(),
            failure,
        });
    }

    fn execute<F>(
        &self,
        background: &[&gherkin::Step],
        steps: &[gherkin::Step],
        factory: &mut F,
    ) -> Option<StepFailure>
    where
        F: FnMut() -> ScenarioResult<ScenarioContext>,
    {
        let mut ctx = match factory() {
            Ok(ctx) => ctx,
            Err(error) => {
                return Some(StepFailure {
                    step: "<setup>".to_owned(),
                    error,
                });
            }
        };
        self.registry.before_scenario(&mut ctx);
        for step in background.iter().copied().chain(steps) {
            if let Err(error) = self.registry.run(&mut ctx, &convert_step(step)) {
                return Some(StepFailure {
                    step: format!("{} {}", step.keyword.trim(), step.value),
                    error,
                });
            }
        }
        None
    }
}

/// What a scenario inherits from its feature and rule.
struct ScenarioPlan<'a> {
    feature: &'a gherkin::Feature,
    exclude: &'a [String],
    tags: &'a [String],
    background: &'a [&'a gherkin::Step],
}

fn convert_step(step: &gherkin::Step) -> Step {
    Step {
        text: step.value.trim().to_owned(),
        table: step.table.as_ref().map(|table| {
            table
                .rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.trim().to_owned()).collect())
                .collect()
        }),
        docstring: step.docstring.as_deref().map(normalise_docstring),
    }
}

fn bare_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_owned()
}

/// Strips the newline after the opening delimiter, the common indentation
/// and trailing blank lines from a docstring.
#[must_use]
pub fn normalise_docstring(raw: &str) -> String {
    let body = raw
        .strip_prefix("\r\n")
        .or_else(|| raw.strip_prefix('\n'))
        .unwrap_or(raw);
    let lines: Vec<&str> = body.lines().collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let dedented: Vec<String> = lines
        .iter()
        .map(|line| line.chars().skip(indent).collect::<String>())
        .collect();
    dedented.join("\n").trim_end().to_owned()
}

fn feature_files(path: &Utf8Path) -> ScenarioResult<Vec<Utf8PathBuf>> {
    let io_error = |err: std::io::Error| ScenarioError::FeatureParse {
        path: path.to_owned(),
        message: err.to_string(),
    };
    if path.is_file() {
        return Ok(vec![path.to_owned()]);
    }
    let mut files = Vec::new();
    for item in path.read_dir_utf8().map_err(io_error)? {
        let entry = item.map_err(io_error)?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            files.extend(feature_files(entry_path)?);
        } else if entry_path.extension() == Some("feature") {
            files.push(entry_path.to_owned());
        }
    }
    files.sort();
    Ok(files)
}
