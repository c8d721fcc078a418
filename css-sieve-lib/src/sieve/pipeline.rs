use crate::error::SieveError;
use crate::style::owned_css::OwnedStylesheet;
use log::debug;

/// What a sieve run did to a stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SieveReport {
    /// Style rules dropped because none of their selectors matched.
    pub rules_removed: usize,
    /// Style rules kept with a shorter selector list.
    pub rules_rewritten: usize,
    /// Individual selectors dropped from rules that survived.
    pub selectors_removed: usize,
    /// Rules, at-rules and declarations removed for being empty.
    pub empty_removed: usize,
    /// Unreferenced at-rules removed, as `@name prelude`.
    pub unused_removed: Vec<String>,
}

/// One pass over a stylesheet.
pub trait Stage {
    fn name(&self) -> &'static str;

    fn run(&self, sheet: &mut OwnedStylesheet, report: &mut SieveReport) -> Result<(), SieveError>;
}

/// Stages applied in order; the first error aborts the run.
#[derive(Default)]
pub struct Pipeline<'a> {
    stages: Vec<Box<dyn Stage + 'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new() -> Self {
        Pipeline { stages: Vec::new() }
    }

    pub fn stage(mut self, stage: impl Stage + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(&self, sheet: &mut OwnedStylesheet) -> Result<SieveReport, SieveError> {
        let mut report = SieveReport::default();
        for stage in &self.stages {
            debug!("running stage: {}", stage.name());
            stage.run(sheet, &mut report)?;
        }
        Ok(report)
    }
}
