//! Calculation of FIRST and FOLLOW sets.
//!
//! Both sets are computed as global fixpoints: every production of the
//! grammar is revisited until no set changes during a full pass, so mutually
//! recursive nonterminals always reach their least solution.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, SymbolNames, TerminalID},
    types::{Map, Set, TerminalSet},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    first_sets: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new(g: &Grammar) -> Self {
        let span = tracing::trace_span!("first_sets");
        let _entered = span.enter();

        let mut this = Self {
            nulls: Set::default(),
            first_sets: g
                .nonterminals()
                .map(|(id, _)| (id, TerminalSet::default()))
                .collect(),
        };

        let mut passes = 0;
        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;
            for (_, p) in g.productions() {
                let (added, nullable) = this.first_of(&p.right);
                changed |= this.first_sets[&p.left].union_with(&added);
                if nullable {
                    changed |= this.nulls.insert(p.left);
                }
            }
        }
        tracing::debug!("FIRST sets converged after {} passes", passes);

        this
    }

    /// `First(n)`, without the epsilon marker.
    pub fn get(&self, n: NonterminalID) -> &TerminalSet {
        &self.first_sets[&n]
    }

    /// Whether `n` derives the empty string, i.e. `ε ∈ First(n)`.
    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nulls.contains(&n)
    }

    /// `First(X1 X2 ... Xk)` and whether the whole sequence is nullable.
    pub fn first_of(&self, symbols: &[SymbolID]) -> (TerminalSet, bool) {
        let mut res = TerminalSet::default();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    res.insert(*t);
                    return (res, false);
                }
                SymbolID::N(n) => {
                    if let Some(first) = self.first_sets.get(n) {
                        res.union_with(first);
                    }
                    if !self.is_nullable(*n) {
                        return (res, false);
                    }
                }
            }
        }
        (res, true)
    }

    pub fn display<'g, G: SymbolNames>(&'g self, g: &'g G) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, first) in &self.first_sets {
                write!(f, "FIRST({}) = {{", g.nonterminal_name(*n))?;
                let mut terminals: Vec<&str> = first.iter().map(|t| g.terminal_name(t)).collect();
                if self.is_nullable(*n) {
                    terminals.push(crate::grammar::EPSILON);
                }
                if !terminals.is_empty() {
                    f.write_str(" ")?;
                    crate::util::write_joined(f, ", ", terminals)?;
                    f.write_str(" ")?;
                }
                writeln!(f, "}}")?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct FollowSets {
    follow_sets: Map<NonterminalID, TerminalSet>,
    // FOLLOW of the synthetic start symbol.
    accept: TerminalSet,
}

impl FollowSets {
    pub fn new(g: &Grammar, first_sets: &FirstSets) -> Self {
        let span = tracing::trace_span!("follow_sets");
        let _entered = span.enter();

        let mut follow_sets: Map<NonterminalID, TerminalSet> = g
            .nonterminals()
            .map(|(id, _)| (id, TerminalSet::default()))
            .collect();
        if let Some(start) = g.start_symbol() {
            follow_sets[&start].insert(TerminalID::EOI);
        }

        let mut passes = 0;
        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;
            for (_, p) in g.productions() {
                for (i, symbol) in p.right.iter().enumerate() {
                    let SymbolID::N(x) = *symbol else {
                        continue;
                    };
                    // N -> alpha X beta
                    let (mut added, nullable) = first_sets.first_of(&p.right[i + 1..]);
                    if nullable && x != p.left {
                        added.union_with(&follow_sets[&p.left]);
                    }
                    changed |= follow_sets[&x].union_with(&added);
                }
            }
        }
        tracing::debug!("FOLLOW sets converged after {} passes", passes);

        Self {
            follow_sets,
            accept: Some(TerminalID::EOI).into_iter().collect(),
        }
    }

    pub fn get(&self, n: NonterminalID) -> &TerminalSet {
        match n {
            NonterminalID::START => &self.accept,
            n => &self.follow_sets[&n],
        }
    }

    pub fn display<'g, G: SymbolNames>(&'g self, g: &'g G) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, follow) in &self.follow_sets {
                write!(f, "FOLLOW({}) = {{", g.nonterminal_name(*n))?;
                if !follow.is_empty() {
                    f.write_str(" ")?;
                    crate::util::write_joined(f, ", ", follow.iter().map(|t| g.terminal_name(t)))?;
                    f.write_str(" ")?;
                }
                writeln!(f, "}}")?;
            }
            Ok(())
        })
    }
}
