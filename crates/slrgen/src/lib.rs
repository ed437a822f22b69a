//! SLR(1) parse table generation.
//!
//! The pipeline runs strictly in sequence: the grammar is augmented, the
//! FIRST/FOLLOW sets and the canonical LR(0) collection are computed, and
//! both are combined into the action/goto table. Conflicts never abort the
//! pipeline; they are resolved by fixed rules and reported with the table.

pub mod first_sets;
pub mod grammar;
pub mod lr0;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;

use self::{
    first_sets::{FirstSets, FollowSets},
    grammar::{AugmentedGrammar, Grammar, GrammarError},
    lr0::LR0Automaton,
    table::ParseTable,
};

/// Everything derived from a grammar on the way to its parse table.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub grammar: AugmentedGrammar,
    pub first_sets: FirstSets,
    pub follow_sets: FollowSets,
    pub automaton: LR0Automaton,
    pub table: ParseTable,
}

/// Compute the SLR(1) parse table from the specified grammar.
///
/// Fails only when the grammar has no nonterminal to start from.
pub fn compute(g: Grammar) -> Result<Analysis, GrammarError> {
    let span = tracing::trace_span!("compute");
    let _entered = span.enter();

    let grammar = g.augment()?;
    let first_sets = FirstSets::new(grammar.original());
    let follow_sets = FollowSets::new(grammar.original(), &first_sets);
    let automaton = lr0::lr0(&grammar);
    let table = table::generate(&grammar, &automaton, &follow_sets);

    Ok(Analysis {
        grammar,
        first_sets,
        follow_sets,
        automaton,
        table,
    })
}
