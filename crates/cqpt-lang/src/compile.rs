use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::emit::Emitter;
use crate::error::CompileError;
use crate::ir::Query;
use crate::linearize::Linearizer;
use crate::names::{self, QUERY_ALPHABET};
use crate::ordering::OrderingModel;
use crate::placement::Placement;
use crate::plan::{ExecutionPlan, PlanEntry, PlanId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Maximum number of alternatives a pattern may consist of.
    pub candidate_limit: Option<usize>,
    /// Structure matches must lie within, such as `s` for sentences.
    pub span: Option<SmolStr>,
}

/// Lowers queries to CQP.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles `query` to a single CQP pattern with one alternative per
    /// admissible token order.
    pub fn compile(&self, query: &Query) -> Result<String, CompileError> {
        let placement = Placement::new(query)?;
        let model = OrderingModel::new(query)?;
        let linearizer = Linearizer::new(&model)?;

        let pattern = Emitter::new(query, &placement)
            .emit_all(linearizer.candidates(), self.options.candidate_limit)?;

        Ok(match &self.options.span {
            Some(span) => format!("{pattern} within {span}"),
            None => pattern,
        })
    }

    /// Compiles a plan. A plan of one query is just that query's pattern;
    /// otherwise every entry becomes a named CQP statement, followed by one
    /// printing the goal.
    pub fn compile_plan(&self, plan: &ExecutionPlan) -> Result<String, CompileError> {
        if let Some(query) = plan.single_query() {
            return self.compile(query);
        }

        let mut names: FxHashMap<PlanId, SmolStr> = FxHashMap::default();
        let mut fresh = names::from_alphabet(QUERY_ALPHABET);
        let mut statements = Vec::new();

        for (id, entry) in plan.entries() {
            let name = fresh.next().unwrap_or_default();
            let statement = match entry {
                PlanEntry::Query(query) => format!("{name} = {};", self.compile(query)?),
                PlanEntry::Operation(operator, lhs, rhs) => {
                    let name_of = |id: &PlanId| names.get(id).ok_or(CompileError::UnknownPlanEntry(*id));
                    format!("{name} = {operator} {} {};", name_of(lhs)?, name_of(rhs)?)
                }
            };
            statements.push(statement);
            names.insert(id, name);
        }

        let goal = names
            .get(&plan.goal())
            .ok_or(CompileError::UnknownPlanEntry(plan.goal()))?;
        statements.push(format!("cat {goal};"));

        tracing::debug!(statements = statements.len(), "compiled execution plan");
        Ok(statements.join("\n"))
    }
}
