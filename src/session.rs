use std::collections::BTreeSet;

use log::info;

use crate::error::ComplianceError;
use crate::evaluation::{evaluate_spaces, SpaceEvaluation};
use crate::model::{Model, Space};
use crate::program::{BuildingProgram, ComplianceThresholds};
use crate::results::IlluminanceResults;
use crate::scoring::{score, ScoreReport};
use crate::tools::sky::SimulationRequest;

/// Steps of an evaluation, in the only order they may happen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    NotStarted,
    SpacesSelected,
    RuleEvaluated,
    SimulationSubmitted,
    ResultsDownloaded,
    Scored,
}

impl Stage {
    /// Stage that must have been reached before entering this one.
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::NotStarted => None,
            Stage::SpacesSelected => Some(Stage::NotStarted),
            Stage::RuleEvaluated => Some(Stage::SpacesSelected),
            Stage::SimulationSubmitted => Some(Stage::RuleEvaluated),
            Stage::ResultsDownloaded => Some(Stage::SimulationSubmitted),
            Stage::Scored => Some(Stage::ResultsDownloaded),
        }
    }
}

/// Occupied areas picked by the user.
///
/// Names are first staged from a keyword search, then added to the selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    staged: Vec<String>,
    selected: Vec<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the lower-cased names of all spaces starting with `keyword`.
    pub fn stage_search(&mut self, model: &Model, keyword: &str) -> &[String] {
        let keyword = keyword.trim().to_lowercase();
        self.staged = model
            .spaces
            .iter()
            .map(|space| space.display_name.to_lowercase())
            .filter(|name| name.starts_with(&keyword))
            .collect();
        &self.staged
    }

    pub fn staged(&self) -> &[String] {
        &self.staged
    }

    /// Move the staged names into the selection.
    pub fn add_staged(&mut self) {
        self.selected.append(&mut self.staged);
    }

    pub fn add<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected.extend(names.into_iter().map(Into::into));
    }

    pub fn clear(&mut self) {
        self.staged.clear();
        self.selected.clear();
    }

    /// Selected names without repetitions, sorted.
    pub fn unique(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|name| name.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Spaces of the model matching the unique selected names.
    pub fn resolve<'m>(&self, model: &'m Model) -> Result<Vec<&'m Space>, ComplianceError> {
        let names = self.unique();
        if names.is_empty() {
            return Err(ComplianceError::EmptySelection);
        }
        names
            .iter()
            .map(|name| {
                model
                    .space(name)
                    .ok_or_else(|| ComplianceError::UnknownSpace(name.clone()))
            })
            .collect()
    }
}

/// One evaluation of a building model.
///
/// Stages only move forward one at a time. Going back to an earlier stage (selecting
/// other spaces, evaluating again, attaching new results) drops everything derived
/// after it.
#[derive(Debug)]
pub struct Session<'m> {
    model: &'m Model,
    program: BuildingProgram,
    thresholds: ComplianceThresholds,
    tolerance: f64,
    stage: Stage,
    spaces: Vec<&'m Space>,
    evaluations: Vec<SpaceEvaluation>,
    requests: Vec<SimulationRequest>,
    results: Option<IlluminanceResults>,
    report: Option<ScoreReport>,
}

impl<'m> Session<'m> {
    /// Start a session. Programs without thresholds are rejected here.
    pub fn new(
        model: &'m Model,
        program: BuildingProgram,
        thresholds: ComplianceThresholds,
        tolerance: f64,
    ) -> Result<Self, ComplianceError> {
        program.thresholds()?;
        if thresholds.program != program {
            return Err(ComplianceError::InvalidThresholds {
                program,
                reason: format!("thresholds are defined for {}", thresholds.program),
            });
        }
        Ok(Session {
            model,
            program,
            thresholds,
            tolerance,
            stage: Stage::NotStarted,
            spaces: vec![],
            evaluations: vec![],
            requests: vec![],
            results: None,
            report: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn spaces(&self) -> &[&'m Space] {
        &self.spaces
    }

    pub fn evaluations(&self) -> &[SpaceEvaluation] {
        &self.evaluations
    }

    pub fn requests(&self) -> &[SimulationRequest] {
        &self.requests
    }

    pub fn results(&self) -> Option<&IlluminanceResults> {
        self.results.as_ref()
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    fn check(&self, to: Stage) -> Result<(), ComplianceError> {
        match to.previous() {
            Some(required) if self.stage < required => Err(ComplianceError::InvalidTransition {
                from: self.stage,
                to,
            }),
            _ => Ok(()),
        }
    }

    fn enter(&mut self, to: Stage) -> Result<(), ComplianceError> {
        self.check(to)?;
        if self.stage >= to {
            self.discard_after(to);
        }
        info!("Session stage {:?} -> {:?}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    fn discard_after(&mut self, stage: Stage) {
        if stage < Stage::Scored {
            self.report = None;
        }
        if stage < Stage::ResultsDownloaded {
            self.results = None;
        }
        if stage < Stage::SimulationSubmitted {
            self.requests.clear();
        }
        if stage < Stage::RuleEvaluated {
            self.evaluations.clear();
        }
        if stage < Stage::SpacesSelected {
            self.spaces.clear();
        }
    }

    /// Drop all progress.
    pub fn reset(&mut self) {
        self.discard_after(Stage::NotStarted);
        self.stage = Stage::NotStarted;
    }

    pub fn select_spaces(
        &mut self,
        selection: &SelectionState,
    ) -> Result<&[&'m Space], ComplianceError> {
        let spaces = selection.resolve(self.model)?;
        self.enter(Stage::SpacesSelected)?;
        self.spaces = spaces;
        Ok(&self.spaces)
    }

    pub fn evaluate(&mut self) -> Result<&[SpaceEvaluation], ComplianceError> {
        self.check(Stage::RuleEvaluated)?;
        let evaluations =
            evaluate_spaces(self.spaces.iter().copied(), self.program, self.tolerance)?;
        self.enter(Stage::RuleEvaluated)?;
        self.evaluations = evaluations;
        Ok(&self.evaluations)
    }

    pub fn submit_simulation(
        &mut self,
        requests: Vec<SimulationRequest>,
    ) -> Result<(), ComplianceError> {
        self.enter(Stage::SimulationSubmitted)?;
        self.requests = requests;
        Ok(())
    }

    /// Attach downloaded results. Every selected space needs all six timepoints.
    pub fn attach_results(&mut self, results: IlluminanceResults) -> Result<(), ComplianceError> {
        self.check(Stage::ResultsDownloaded)?;
        results.check_complete(self.spaces.iter().map(|space| space.display_name.as_str()))?;
        self.enter(Stage::ResultsDownloaded)?;
        self.results = Some(results);
        Ok(())
    }

    pub fn score(&mut self) -> Result<&ScoreReport, ComplianceError> {
        self.check(Stage::Scored)?;
        let results = self
            .results
            .as_ref()
            .ok_or(ComplianceError::InvalidTransition {
                from: self.stage,
                to: Stage::Scored,
            })?;
        let report = score(
            self.program,
            &self.thresholds,
            self.spaces.iter().copied(),
            results,
        )?;
        self.enter(Stage::Scored)?;
        Ok(self.report.insert(report))
    }
}
