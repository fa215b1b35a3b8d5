//! Strict partial order over the tokens of a query, per connected component.
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::Dfs;
use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::ir::{Identifier, OrderConstraint, OrderKind, Query};

/// Tokens connected through dependencies or order constraints, together with
/// the transitive closure of their order constraints.
///
/// Tokens are addressed by their position in [`Component::tokens`].
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    tokens: Vec<Identifier>,
    constraints: Vec<OrderConstraint>,
    precedes: Vec<Vec<bool>>,
    successors: Vec<Option<usize>>,
}

impl Component {
    fn new(tokens: Vec<Identifier>, constraints: Vec<OrderConstraint>) -> Result<Self, CompileError> {
        let position = tokens
            .iter()
            .enumerate()
            .map(|(i, identifier)| (*identifier, i))
            .collect::<FxHashMap<_, _>>();
        let n = tokens.len();

        // Node `i` of the graph is token `i` of the component.
        let mut graph: DiGraph<Identifier, ()> = DiGraph::with_capacity(n, constraints.len());
        for identifier in &tokens {
            graph.add_node(*identifier);
        }
        for constraint in &constraints {
            graph.add_edge(
                NodeIndex::new(position[&constraint.before]),
                NodeIndex::new(position[&constraint.after]),
                (),
            );
        }

        let mut scc_of = vec![0; n];
        for (scc, nodes) in tarjan_scc(&graph).into_iter().enumerate() {
            for node in nodes {
                scc_of[node.index()] = scc;
            }
        }

        // An edge lies on a cycle iff both ends share a strongly connected component.
        let cyclic = constraints
            .iter()
            .filter(|constraint| scc_of[position[&constraint.before]] == scc_of[position[&constraint.after]])
            .copied()
            .collect::<Vec<_>>();
        if !cyclic.is_empty() {
            return Err(CompileError::InconsistentOrdering(cyclic));
        }

        let precedes = graph
            .node_indices()
            .map(|start| {
                let mut reachable = vec![false; n];
                let mut dfs = Dfs::new(&graph, start);
                while let Some(node) = dfs.next(&graph) {
                    if node != start {
                        reachable[node.index()] = true;
                    }
                }
                reachable
            })
            .collect::<Vec<_>>();

        let mut successors: Vec<Option<(usize, OrderConstraint)>> = vec![None; n];
        let mut predecessors: Vec<Option<(usize, OrderConstraint)>> = vec![None; n];
        for constraint in constraints.iter().filter(|c| c.kind == OrderKind::Immediate) {
            let (before, after) = (position[&constraint.before], position[&constraint.after]);
            link(&mut successors, before, after, constraint)?;
            link(&mut predecessors, after, before, constraint)?;
        }

        Ok(Self {
            tokens,
            constraints,
            precedes,
            successors: successors.into_iter().map(|s| s.map(|(to, _)| to)).collect(),
        })
    }

    pub fn tokens(&self) -> &[Identifier] {
        &self.tokens
    }

    /// Order constraints between tokens of this component, in query order.
    pub fn constraints(&self) -> &[OrderConstraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether token `a` must occur somewhere before token `b`.
    pub fn precedes(&self, a: usize, b: usize) -> bool {
        self.precedes[a][b]
    }

    /// The token that must directly follow token `a`, if any.
    pub fn successor(&self, a: usize) -> Option<usize> {
        self.successors[a]
    }

    /// Whether token `a` must directly follow some other token.
    pub fn has_predecessor(&self, a: usize) -> bool {
        self.successors.contains(&Some(a))
    }
}

fn link(
    slots: &mut [Option<(usize, OrderConstraint)>],
    from: usize,
    to: usize,
    constraint: &OrderConstraint,
) -> Result<(), CompileError> {
    match slots[from] {
        Some((other, previous)) if other != to => {
            Err(CompileError::InconsistentOrdering(vec![previous, *constraint]))
        }
        _ => {
            slots[from] = Some((to, *constraint));
            Ok(())
        }
    }
}

/// The ordering of a whole query: its components ordered by first token.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingModel {
    components: Vec<Component>,
}

impl OrderingModel {
    pub fn new(query: &Query) -> Result<Self, CompileError> {
        let identifiers = query.identifiers();
        let index = identifiers
            .iter()
            .enumerate()
            .map(|(i, identifier)| (*identifier, i))
            .collect::<FxHashMap<_, _>>();

        let mut sets = UnionFind::<usize>::new(identifiers.len());
        for dependency in query.dependencies() {
            sets.union(index[&dependency.governor], index[&dependency.dependent]);
        }
        for constraint in query.constraints() {
            sets.union(index[&constraint.before], index[&constraint.after]);
        }

        let mut groups: Vec<Vec<Identifier>> = Vec::new();
        let mut group_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut group_of = Vec::with_capacity(identifiers.len());
        for (i, identifier) in identifiers.iter().enumerate() {
            let group = *group_of_root.entry(sets.find(i)).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(*identifier);
            group_of.push(group);
        }

        let mut constraints = vec![Vec::new(); groups.len()];
        for constraint in query.constraints() {
            constraints[group_of[index[&constraint.before]]].push(*constraint);
        }

        let components = groups
            .into_iter()
            .zip(constraints)
            .map(|(tokens, constraints)| Component::new(tokens, constraints))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            tokens = identifiers.len(),
            components = components.len(),
            "built ordering model"
        );

        Ok(Self { components })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }
}
