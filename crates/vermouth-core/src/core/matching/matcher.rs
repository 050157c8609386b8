use crate::core::models::fragment::Fragment;
use crate::core::templates::Template;
use bit_set::BitSet;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{trace, warn};

/// Default bound on candidate bindings tried per template.
pub const DEFAULT_STEP_LIMIT: usize = 100_000;

/// A successful template match.
#[derive(Debug, Clone)]
pub struct Match {
    pub template: Arc<Template>,
    /// Fragment-local atom bound to each role, indexed like the template roles.
    pub assignment: Vec<Option<usize>>,
}

impl Match {
    pub fn atom_for_role(&self, role: usize) -> Option<usize> {
        self.assignment.get(role).copied().flatten()
    }

    /// Fragment-local atoms bound to some role.
    pub fn matched_atoms(&self) -> BitSet {
        self.assignment.iter().flatten().copied().collect()
    }
}

/// How close a template came to matching a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCoverage {
    pub template: String,
    pub matched_required: usize,
    pub total_required: usize,
    /// Required roles left unbound in the best partial assignment.
    pub missing: Vec<String>,
}

impl PartialCoverage {
    pub(crate) fn is_better_than(&self, other: &PartialCoverage) -> bool {
        let ratio = |p: &PartialCoverage| {
            if p.total_required == 0 {
                1.0
            } else {
                p.matched_required as f64 / p.total_required as f64
            }
        };
        ratio(self) > ratio(other)
            || (ratio(self) == ratio(other) && self.missing.len() < other.missing.len())
    }
}

impl fmt::Display for PartialCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched {}/{} required roles",
            self.template, self.matched_required, self.total_required
        )?;
        if !self.missing.is_empty() {
            write!(f, ", missing {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("No template matches {fragment}{}", best_suffix(.best))]
    NoMatchingTemplate {
        fragment: String,
        best: Option<PartialCoverage>,
    },
}

fn best_suffix(best: &Option<PartialCoverage>) -> String {
    best.as_ref()
        .map(|b| format!(" (closest: {b})"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubgraphMatcher {
    step_limit: usize,
}

impl Default for SubgraphMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_LIMIT)
    }
}

impl SubgraphMatcher {
    pub fn new(step_limit: usize) -> Self {
        Self { step_limit }
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Tries the templates in order and returns the first match.
    pub fn match_first(
        &self,
        templates: &[Arc<Template>],
        fragment: &Fragment<'_>,
    ) -> Result<Match, MatchError> {
        let mut best: Option<PartialCoverage> = None;
        for template in templates {
            match self.match_template(template, fragment) {
                Ok(assignment) => {
                    return Ok(Match {
                        template: Arc::clone(template),
                        assignment,
                    });
                }
                Err(partial) => {
                    if best.as_ref().is_none_or(|b| partial.is_better_than(b)) {
                        best = Some(partial);
                    }
                }
            }
        }
        Err(MatchError::NoMatchingTemplate {
            fragment: fragment.label(),
            best,
        })
    }

    /// Searches for a complete assignment of `template` onto `fragment`.
    /// On failure returns the best coverage reached.
    pub fn match_template(
        &self,
        template: &Template,
        fragment: &Fragment<'_>,
    ) -> Result<Vec<Option<usize>>, PartialCoverage> {
        self.match_template_where(template, fragment, |_, _| true)
    }

    /// Like [`match_template`](Self::match_template), but a role may only
    /// bind the fragment-local atoms for which `admissible(role, atom)` holds.
    pub fn match_template_where<F>(
        &self,
        template: &Template,
        fragment: &Fragment<'_>,
        admissible: F,
    ) -> Result<Vec<Option<usize>>, PartialCoverage>
    where
        F: Fn(usize, usize) -> bool,
    {
        let mut state = MatchState::new(template, fragment, &admissible);

        let unreachable: Vec<usize> = state
            .order
            .iter()
            .copied()
            .filter(|&role| template.role(role).is_required() && state.candidates[role].is_empty())
            .collect();
        if !unreachable.is_empty() {
            trace!(
                template = template.name(),
                fragment = %fragment.label(),
                missing = unreachable.len(),
                "Required roles have no candidate atoms."
            );
            return Err(state.coverage_missing(&unreachable));
        }

        match state.search(self.step_limit) {
            SearchOutcome::Complete => Ok(state.assignment),
            SearchOutcome::Exhausted => Err(state.best_coverage()),
            SearchOutcome::StepLimit => {
                warn!(
                    template = template.name(),
                    fragment = %fragment.label(),
                    step_limit = self.step_limit,
                    "Template search exceeded its step limit."
                );
                Err(state.best_coverage())
            }
        }
    }
}

enum SearchOutcome {
    Complete,
    Exhausted,
    StepLimit,
}

struct Frame {
    depth: usize,
    next: usize,
    bound: Option<usize>,
    skipped: bool,
}

impl Frame {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            next: 0,
            bound: None,
            skipped: false,
        }
    }
}

struct MatchState<'t, 'f, 'a> {
    template: &'t Template,
    fragment: &'f Fragment<'a>,
    order: Vec<usize>,
    candidates: Vec<Vec<usize>>,
    assignment: Vec<Option<usize>>,
    used: BitSet,
    required_bound: usize,
    best_required: usize,
    best_assignment: Vec<Option<usize>>,
}

impl<'t, 'f, 'a> MatchState<'t, 'f, 'a> {
    fn new(
        template: &'t Template,
        fragment: &'f Fragment<'a>,
        admissible: &dyn Fn(usize, usize) -> bool,
    ) -> Self {
        let roles = template.roles();

        let mut order: Vec<usize> = (0..roles.len()).collect();
        order.sort_by_key(|&r| (!roles[r].is_required(), Reverse(roles[r].priority), r));

        let candidates = (0..roles.len())
            .map(|role| {
                let mut candidates = Self::candidates_for(template, fragment, role);
                candidates.retain(|&local| admissible(role, local));
                candidates
            })
            .collect();

        Self {
            template,
            fragment,
            order,
            candidates,
            assignment: vec![None; roles.len()],
            used: BitSet::with_capacity(fragment.len()),
            required_bound: 0,
            best_required: 0,
            best_assignment: vec![None; roles.len()],
        }
    }

    fn candidates_for(template: &Template, fragment: &Fragment<'_>, role: usize) -> Vec<usize> {
        let spec = template.role(role);
        let required_neighbors = template
            .neighbors(role)
            .iter()
            .filter(|&&n| template.role(n).is_required())
            .count();

        let (mut named, rest): (Vec<usize>, Vec<usize>) = (0..fragment.len())
            .filter(|&local| {
                fragment.atom(local).is_some_and(|atom| atom.element == spec.element)
                    && fragment.residue_offset(local) == spec.residue
                    && fragment.degree(local) >= required_neighbors
            })
            .partition(|&local| {
                fragment
                    .atom(local)
                    .is_some_and(|atom| spec.accepts_name(atom.name.trim()))
            });
        named.extend(rest);
        named
    }

    fn search(&mut self, step_limit: usize) -> SearchOutcome {
        if self.order.is_empty() {
            return SearchOutcome::Complete;
        }

        let mut stack = vec![Frame::new(0)];
        let mut steps = 0usize;

        while let Some(frame) = stack.last_mut() {
            steps += 1;
            if steps > step_limit {
                return SearchOutcome::StepLimit;
            }

            let role = self.order[frame.depth];
            if let Some(atom) = frame.bound.take() {
                self.unbind(role, atom);
            }

            let mut advanced = false;
            while frame.next < self.candidates[role].len() {
                let atom = self.candidates[role][frame.next];
                frame.next += 1;
                if self.used.contains(atom) || !self.is_consistent(role, atom) {
                    continue;
                }
                self.bind(role, atom);
                if self.forward_check(role, atom) {
                    frame.bound = Some(atom);
                    advanced = true;
                    break;
                }
                self.unbind(role, atom);
            }

            if !advanced && !frame.skipped && !self.template.role(role).is_required() {
                frame.skipped = true;
                advanced = true;
            }

            if !advanced {
                stack.pop();
                continue;
            }

            let depth = frame.depth + 1;
            if depth == self.order.len() {
                return SearchOutcome::Complete;
            }
            stack.push(Frame::new(depth));
        }

        SearchOutcome::Exhausted
    }

    fn bind(&mut self, role: usize, atom: usize) {
        self.assignment[role] = Some(atom);
        self.used.insert(atom);
        if self.template.role(role).is_required() {
            self.required_bound += 1;
            if self.required_bound > self.best_required {
                self.best_required = self.required_bound;
                self.best_assignment.clone_from(&self.assignment);
            }
        }
    }

    fn unbind(&mut self, role: usize, atom: usize) {
        self.assignment[role] = None;
        self.used.remove(atom);
        if self.template.role(role).is_required() {
            self.required_bound -= 1;
        }
    }

    /// Every pattern edge to an already bound role must be a bond.
    fn is_consistent(&self, role: usize, atom: usize) -> bool {
        self.template.neighbors(role).iter().all(|&neighbor| {
            self.assignment[neighbor].is_none_or(|other| self.fragment.has_edge(atom, other))
        })
    }

    /// Every unbound required neighbor must keep a free candidate bonded to `atom`.
    fn forward_check(&self, role: usize, atom: usize) -> bool {
        self.template.neighbors(role).iter().all(|&neighbor| {
            self.assignment[neighbor].is_some()
                || !self.template.role(neighbor).is_required()
                || self.candidates[neighbor]
                    .iter()
                    .any(|&c| !self.used.contains(c) && self.fragment.has_edge(atom, c))
        })
    }

    fn coverage_missing(&self, missing: &[usize]) -> PartialCoverage {
        let total_required = self.template.required_count();
        PartialCoverage {
            template: self.template.name().to_string(),
            matched_required: total_required - missing.len(),
            total_required,
            missing: missing
                .iter()
                .map(|&r| self.template.role(r).name.clone())
                .collect(),
        }
    }

    fn best_coverage(&self) -> PartialCoverage {
        let missing: Vec<usize> = (0..self.template.roles().len())
            .filter(|&r| self.template.role(r).is_required() && self.best_assignment[r].is_none())
            .collect();
        let mut coverage = self.coverage_missing(&missing);
        coverage.matched_required = self.best_required;
        coverage
    }
}
