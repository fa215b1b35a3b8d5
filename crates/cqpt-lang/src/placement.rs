//! Merges token-local and free-floating predicates into one predicate per
//! token, setting aside predicates that relate several tokens.
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CompileError;
use crate::ir::{Identifier, Predicate, Query};

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    merged: FxHashMap<Identifier, Predicate>,
    deferred: Vec<Predicate>,
}

impl Placement {
    /// Places every predicate of `query`.
    ///
    /// Free-floating predicates are placed before token-declared ones, so the
    /// merged conjunction of a token lists them first.
    pub fn new(query: &Query) -> Result<Self, CompileError> {
        let known = query.identifiers().into_iter().collect::<FxHashSet<_>>();

        let floating = query.predicates().iter().map(|predicate| {
            if predicate.has_local_attributes() {
                Err(CompileError::UnanchoredPredicate(predicate.clone()))
            } else {
                Ok(predicate.clone())
            }
        });
        let declared = query.tokens().iter().filter_map(|token| {
            token
                .predicate
                .as_ref()
                .map(|predicate| Ok(predicate.raise_onto(token.identifier)))
        });

        let mut slots: FxHashMap<Identifier, Vec<Predicate>> = FxHashMap::default();
        let mut deferred = Vec::new();

        for predicate in floating.chain(declared) {
            let predicate = predicate?;
            let mut owners = predicate.referenced_identifiers().into_iter().collect::<Vec<_>>();
            owners.sort();

            if let Some(unknown) = owners.iter().find(|owner| !known.contains(owner)) {
                return Err(CompileError::UnknownIdentifier(*unknown));
            }

            match owners.as_slice() {
                [] => return Err(CompileError::UnanchoredPredicate(predicate)),
                [owner] => slots.entry(*owner).or_default().push(predicate.lower_onto(*owner)),
                _ => deferred.push(predicate.normalize()),
            }
        }

        let merged = slots
            .into_iter()
            .filter_map(|(identifier, predicates)| {
                Predicate::all(predicates).map(|predicate| (identifier, predicate.normalize()))
            })
            .collect::<FxHashMap<_, _>>();

        tracing::debug!(
            placed = merged.len(),
            deferred = deferred.len(),
            "placed predicates"
        );

        Ok(Self { merged, deferred })
    }

    /// The merged local predicate of a token, with attributes of the token
    /// itself written without owner.
    pub fn predicate(&self, identifier: Identifier) -> Option<&Predicate> {
        self.merged.get(&identifier)
    }

    /// Predicates over attributes of two or more tokens, still in raised
    /// form. They are placed per candidate by the emitter.
    pub fn deferred(&self) -> &[Predicate] {
        &self.deferred
    }
}
