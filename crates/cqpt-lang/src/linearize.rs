//! Enumeration of every token sequence a query can be matched as.
//!
//! Each component of the ordering model is split into blocks: maximal runs of
//! tokens chained by immediate constraints. A linear extension of a component
//! is an order of its blocks respecting the partial order, and a candidate is
//! one extension per component, interleaved block by block.
use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::ir::Identifier;
use crate::ordering::{Component, OrderingModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gap {
    /// The next token follows without any token in between.
    Adjacent,
    /// Any number of tokens may occur in between.
    Unbounded,
}

/// One total order over every token of a query.
///
/// `gaps[i]` is the gap between `tokens[i]` and `tokens[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub tokens: Vec<Identifier>,
    pub gaps: Vec<Gap>,
}

impl Candidate {
    pub fn position(&self, identifier: Identifier) -> Option<usize> {
        self.tokens.iter().position(|token| *token == identifier)
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.iter().join(" "))
    }
}

#[derive(Debug, Clone)]
struct Layout {
    blocks: Vec<Vec<Identifier>>,
    /// `required[x][y]`: block `x` must be placed before block `y`.
    required: Vec<Vec<bool>>,
}

impl Layout {
    fn new(component: &Component) -> Self {
        let heads = (0..component.len()).filter(|token| !component.has_predecessor(*token));
        let chains = heads
            .map(|head| {
                let mut chain = vec![head];
                while let Some(next) = chain.last().and_then(|last| component.successor(*last)) {
                    chain.push(next);
                }
                chain
            })
            .collect::<Vec<_>>();

        let required: Vec<Vec<bool>> = chains
            .iter()
            .enumerate()
            .map(|(i, x)| {
                chains
                    .iter()
                    .enumerate()
                    .map(|(j, y)| {
                        i != j && x.iter().cartesian_product(y.iter()).any(|(a, b)| component.precedes(*a, *b))
                    })
                    .collect()
            })
            .collect();

        let blocks: Vec<Vec<Identifier>> = chains
            .into_iter()
            .map(|chain| chain.into_iter().map(|token| component.tokens()[token]).collect())
            .collect();

        Self { blocks, required }
    }

    fn extensions(&self) -> Extensions<'_> {
        Extensions::new(self)
    }

    /// Number of linear extensions, counted over the placed-block sets.
    fn extension_count(&self) -> u128 {
        fn count(layout: &Layout, placed: &mut Vec<bool>, memo: &mut FxHashMap<Vec<bool>, u128>) -> u128 {
            if placed.iter().all(|p| *p) {
                return 1;
            }
            if let Some(known) = memo.get(&*placed) {
                return *known;
            }
            let mut total = 0u128;
            for block in 0..layout.blocks.len() {
                if !placed[block] && layout.ready(block, placed) {
                    placed[block] = true;
                    total = total.saturating_add(count(layout, placed, memo));
                    placed[block] = false;
                }
            }
            memo.insert(placed.clone(), total);
            total
        }

        count(self, &mut vec![false; self.blocks.len()], &mut FxHashMap::default())
    }

    fn ready(&self, block: usize, placed: &[bool]) -> bool {
        (0..self.blocks.len()).all(|other| placed[other] || !self.required[other][block])
    }
}

/// Linear extensions of one component as block orders, in lexicographic
/// order of block index.
#[derive(Debug, Clone)]
struct Extensions<'a> {
    layout: &'a Layout,
    order: Vec<usize>,
    placed: Vec<bool>,
    next: Vec<usize>,
    done: bool,
}

impl<'a> Extensions<'a> {
    fn new(layout: &'a Layout) -> Self {
        let len = layout.blocks.len();
        Self {
            layout,
            order: Vec::with_capacity(len),
            placed: vec![false; len],
            next: vec![0; len + 1],
            done: false,
        }
    }

    fn pop(&mut self) {
        if let Some(block) = self.order.pop() {
            self.placed[block] = false;
        }
    }
}

impl Iterator for Extensions<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.layout.blocks.len();
        if self.done {
            return None;
        }
        if len > 0 && self.order.len() == len {
            self.pop();
        }

        loop {
            let depth = self.order.len();
            if depth == len {
                if len == 0 {
                    self.done = true;
                }
                return Some(self.order.clone());
            }

            let found = (self.next[depth]..len)
                .find(|block| !self.placed[*block] && self.layout.ready(*block, &self.placed));
            match found {
                Some(block) => {
                    self.next[depth] = block + 1;
                    self.next[depth + 1] = 0;
                    self.order.push(block);
                    self.placed[block] = true;
                }
                None if depth == 0 => {
                    self.done = true;
                    return None;
                }
                None => self.pop(),
            }
        }
    }
}

/// Enumerates the candidates of a query.
#[derive(Debug, Clone)]
pub struct Linearizer {
    layouts: Vec<Layout>,
}

impl Linearizer {
    pub fn new(model: &OrderingModel) -> Result<Self, CompileError> {
        let layouts = model
            .components()
            .iter()
            .map(|component| {
                let layout = Layout::new(component);
                if layout.extensions().next().is_none() {
                    return Err(CompileError::InconsistentOrdering(component.constraints().to_vec()));
                }
                Ok(layout)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            components = layouts.len(),
            blocks = layouts.iter().map(|layout| layout.blocks.len()).sum::<usize>(),
            "prepared linearization"
        );

        Ok(Self { layouts })
    }

    /// A fresh lazy sequence of all candidates, in a stable order.
    pub fn candidates(&self) -> Candidates<'_> {
        Candidates::new(&self.layouts)
    }

    /// Exact number of candidates, saturating at `usize::MAX`.
    ///
    /// Runs in time exponential in the number of blocks per component, but
    /// does not enumerate the candidates themselves.
    pub fn count(&self) -> usize {
        let extensions = self
            .layouts
            .iter()
            .fold(1u128, |acc, layout| acc.saturating_mul(layout.extension_count()));

        let mut placed = 0u128;
        let mut interleavings = 1u128;
        for layout in &self.layouts {
            let blocks = layout.blocks.len() as u128;
            placed += blocks;
            interleavings = interleavings.saturating_mul(binomial(placed, blocks));
        }

        usize::try_from(extensions.saturating_mul(interleavings)).unwrap_or(usize::MAX)
    }
}

fn binomial(n: u128, k: u128) -> u128 {
    let k = k.min(n - k);
    (0..k).fold(1u128, |acc, i| match acc.checked_mul(n - i) {
        Some(product) => product / (i + 1),
        None => u128::MAX,
    })
}

/// Lazy iterator over the candidates of a [`Linearizer`].
///
/// Iterates the product of per-component extensions, last component fastest,
/// and for each combination every interleaving of the components' blocks.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    layouts: &'a [Layout],
    extensions: Vec<Extensions<'a>>,
    current: Vec<Vec<usize>>,
    interleaving: Vec<usize>,
    exhausted: bool,
}

impl<'a> Candidates<'a> {
    fn new(layouts: &'a [Layout]) -> Self {
        let mut extensions = layouts.iter().map(Layout::extensions).collect::<Vec<_>>();
        let current = extensions.iter_mut().map(|extensions| extensions.next()).collect::<Option<Vec<_>>>();
        let interleaving = layouts
            .iter()
            .enumerate()
            .flat_map(|(component, layout)| std::iter::repeat_n(component, layout.blocks.len()))
            .collect();

        Self {
            layouts,
            extensions,
            exhausted: current.is_none(),
            current: current.unwrap_or_default(),
            interleaving,
        }
    }

    fn assemble(&self) -> Candidate {
        let mut cursors = vec![0; self.layouts.len()];
        let mut tokens = Vec::new();
        let mut gaps = Vec::new();

        for component in &self.interleaving {
            let block = &self.layouts[*component].blocks[self.current[*component][cursors[*component]]];
            cursors[*component] += 1;

            for (i, token) in block.iter().enumerate() {
                if !tokens.is_empty() {
                    gaps.push(if i == 0 { Gap::Unbounded } else { Gap::Adjacent });
                }
                tokens.push(*token);
            }
        }

        Candidate { tokens, gaps }
    }

    fn advance(&mut self) {
        if next_permutation(&mut self.interleaving) {
            return;
        }

        for component in (0..self.layouts.len()).rev() {
            if let Some(extension) = self.extensions[component].next() {
                self.current[component] = extension;
                return;
            }

            self.extensions[component] = self.layouts[component].extensions();
            match self.extensions[component].next() {
                Some(extension) => self.current[component] = extension,
                None => break,
            }
        }

        self.exhausted = true;
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let candidate = self.assemble();
        self.advance();
        tracing::trace!(%candidate, "candidate");
        Some(candidate)
    }
}

/// Rearranges `items` into the next greater permutation. Returns `false`
/// and leaves `items` sorted once the last permutation has been passed.
fn next_permutation(items: &mut [usize]) -> bool {
    let Some(pivot) = (1..items.len()).rev().find(|i| items[i - 1] < items[*i]) else {
        items.sort_unstable();
        return false;
    };
    let pivot = pivot - 1;
    let Some(swap) = (pivot + 1..items.len()).rev().find(|i| items[*i] > items[pivot]) else {
        return false;
    };
    items.swap(pivot, swap);
    items[pivot + 1..].reverse();
    true
}
