//! Several queries combined through set operations on their match sets.
use std::fmt::{self, Display, Formatter};

use crate::arena::{Arena, ArenaId};
use crate::error::CompileError;
use crate::ir::Query;

pub type PlanId = ArenaId<PlanEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperator {
    Intersection,
    Union,
    Difference,
}

impl Display for SetOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SetOperator::Intersection => write!(f, "intersect"),
            SetOperator::Union => write!(f, "union"),
            SetOperator::Difference => write!(f, "diff"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEntry {
    Query(Query),
    Operation(SetOperator, PlanId, PlanId),
}

/// Queries and operations in dependency order, plus the entry whose matches
/// are the result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    entries: Arena<PlanEntry>,
    goal: PlanId,
}

impl ExecutionPlan {
    pub fn of_query(query: Query) -> Self {
        let mut entries = Arena::default();
        let goal = entries.alloc(PlanEntry::Query(query));
        Self { entries, goal }
    }

    pub fn entries(&self) -> impl Iterator<Item = (PlanId, &PlanEntry)> {
        self.entries.iter()
    }

    pub fn entry(&self, id: PlanId) -> Option<&PlanEntry> {
        self.entries.get(id)
    }

    pub fn goal(&self) -> PlanId {
        self.goal
    }

    pub fn queries(&self) -> impl Iterator<Item = &Query> {
        self.entries.iter().filter_map(|(_, entry)| match entry {
            PlanEntry::Query(query) => Some(query),
            PlanEntry::Operation(..) => None,
        })
    }

    /// The query of a plan consisting of exactly that query.
    pub fn single_query(&self) -> Option<&Query> {
        match (self.entries.len(), self.entries.get(self.goal)) {
            (1, Some(PlanEntry::Query(query))) => Some(query),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct PlanBuilder {
    entries: Arena<PlanEntry>,
    goal: Option<PlanId>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_query(&mut self, query: Query) -> PlanId {
        self.entries.alloc(PlanEntry::Query(query))
    }

    pub fn add_operation(&mut self, lhs: PlanId, operator: SetOperator, rhs: PlanId) -> PlanId {
        self.entries.alloc(PlanEntry::Operation(operator, lhs, rhs))
    }

    pub fn set_goal(&mut self, goal: PlanId) -> &mut Self {
        self.goal = Some(goal);
        self
    }

    /// Without an explicit goal, a plan with one query results in that query
    /// and any other plan in its last operation.
    pub fn build(self) -> Result<ExecutionPlan, CompileError> {
        let (first_query, single_query) = {
            let mut queries = self
                .entries
                .iter()
                .filter(|(_, entry)| matches!(entry, PlanEntry::Query(_)))
                .map(|(id, _)| id);
            let first_query = queries.next().ok_or(CompileError::EmptyPlan)?;
            (first_query, queries.next().is_none())
        };

        for (id, entry) in self.entries.iter() {
            if let PlanEntry::Operation(_, lhs, rhs) = entry
                && let Some(unknown) = [*lhs, *rhs].into_iter().find(|operand| operand.index() >= id.index())
            {
                return Err(CompileError::UnknownPlanEntry(unknown));
            }
        }

        let last_operation = self
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, PlanEntry::Operation(..)))
            .map(|(id, _)| id)
            .last();

        let goal = match self.goal {
            Some(goal) if self.entries.get(goal).is_none() => return Err(CompileError::UnknownPlanEntry(goal)),
            Some(goal) => goal,
            None if single_query => first_query,
            None => last_operation.unwrap_or(first_query),
        };

        Ok(ExecutionPlan {
            entries: self.entries,
            goal,
        })
    }
}
