//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{fmt, fs, io, path::Path};

/// The reserved name of the end-of-input marker.
pub const END_MARKER: &str = "$";

/// The spelling used for the empty right-hand side in dumps and grammar text.
pub const EPSILON: &str = "ε";

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self(0);
    const OFFSET: u16 = 1;

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);
impl NonterminalID {
    /// The synthetic start symbol introduced by augmentation.
    pub const START: Self = Self(0);
    const OFFSET: u16 = 1;

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

/// The identifier of a production rule.
///
/// User productions are numbered from 1 in input order; the number also
/// decides which reduction survives a reduce/reduce conflict.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u16);
impl ProductionID {
    /// The augmented production `Start' -> Start`.
    pub const ACCEPT: Self = Self(0);
    const OFFSET: u16 = 1;

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "P#Accept"),
            _ => write!(f, "P#{:03}", self.0),
        }
    }
}

/// The type that represents a production rule in grammar.
///
/// An empty `right` is the only representation of an epsilon production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
}
impl Production {
    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g, G: SymbolNames>(&'g self, g: &'g G) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminal_name(self.left))?;
            if self.right.is_empty() {
                return f.write_str(EPSILON);
            }
            for (i, r) in self.right.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                f.write_str(g.symbol_name(*r))?;
            }
            Ok(())
        })
    }
}

/// Name lookup shared by the plain and the augmented grammar.
pub trait SymbolNames {
    fn terminal_name(&self, id: TerminalID) -> &str;
    fn nonterminal_name(&self, id: NonterminalID) -> &str;

    fn symbol_name(&self, id: SymbolID) -> &str {
        match id {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, String>,
    pub nonterminals: Map<NonterminalID, String>,
    pub productions: Map<ProductionID, Production>,
    alternatives: Map<NonterminalID, Vec<ProductionID>>,
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        let rules = crate::syntax::parse(source)?;
        Grammar::define(|g| {
            for rule in rules {
                g.rule(&rule.left, rule.alternatives)?;
            }
            Ok(())
        })
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            rules: Map::default(),
        };
        f(&mut def)?;
        Ok(def.end())
    }

    /// Return the original start symbol, i.e. the first nonterminal in input order.
    pub fn start_symbol(&self) -> Option<NonterminalID> {
        self.nonterminals.keys().next().copied()
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &str)> + '_ {
        self.terminals.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &str)> + '_ {
        self.nonterminals.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn productions(&self) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions.iter().map(|(id, p)| (*id, p))
    }

    /// Return the productions of `n` in input order.
    pub fn productions_of(
        &self,
        n: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.alternatives
            .get(&n)
            .map_or(&[][..], |ids| &ids[..])
            .iter()
            .map(move |id| (*id, &self.productions[id]))
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    pub fn is_nonterminal(&self, name: &str) -> bool {
        self.nonterminal_id(name).is_some()
    }

    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .iter()
            .find_map(|(id, n)| (n == name).then_some(*id))
    }

    pub fn nonterminal_id(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .iter()
            .find_map(|(id, n)| (n == name).then_some(*id))
    }

    /// Add the synthetic start production `Start' -> Start`.
    pub fn augment(self) -> Result<AugmentedGrammar, GrammarError> {
        let start_symbol = self.start_symbol().ok_or(GrammarError::Empty)?;

        let mut start_name = format!("{}'", self.nonterminals[&start_symbol]);
        while self.is_nonterminal(&start_name) || self.terminal_id(&start_name).is_some() {
            start_name.push('\'');
        }
        tracing::debug!("augmented start symbol: {}", start_name);

        Ok(AugmentedGrammar {
            original: self,
            start_name,
            start_symbol,
            accept: Production {
                left: NonterminalID::START,
                right: vec![SymbolID::N(start_symbol)],
            },
        })
    }
}

impl SymbolNames for Grammar {
    fn terminal_name(&self, id: TerminalID) -> &str {
        self.terminals.get(&id).map_or("<unknown>", String::as_str)
    }
    fn nonterminal_name(&self, id: NonterminalID) -> &str {
        self.nonterminals.get(&id).map_or("<unknown>", String::as_str)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        crate::util::write_joined(f, ", ", self.terminals.values())?;
        write!(f, "\n#### nonterminals: ")?;
        crate::util::write_joined(f, ", ", self.nonterminals.values())?;
        writeln!(f, "\n#### productions:")?;
        for (id, p) in &self.productions {
            writeln!(f, "- {:?}: {}", id, p.display(self))?;
        }
        Ok(())
    }
}

/// A grammar extended by the production `Start' -> Start`.
///
/// The original grammar is kept as is; the synthetic start symbol and its
/// production are answered by this wrapper.
#[derive(Debug, Clone)]
pub struct AugmentedGrammar {
    original: Grammar,
    start_name: String,
    start_symbol: NonterminalID,
    accept: Production,
}

impl AugmentedGrammar {
    pub fn original(&self) -> &Grammar {
        &self.original
    }

    /// The start symbol of the original grammar.
    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    /// The name of the synthetic start symbol.
    pub fn start_name(&self) -> &str {
        &self.start_name
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        match id {
            ProductionID::ACCEPT => &self.accept,
            id => self.original.production(id),
        }
    }

    /// Iterate all productions, starting with the augmented one.
    pub fn productions(&self) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        Some((ProductionID::ACCEPT, &self.accept))
            .into_iter()
            .chain(self.original.productions())
    }

    pub fn productions_of(
        &self,
        n: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        let accept = (n == NonterminalID::START).then_some((ProductionID::ACCEPT, &self.accept));
        accept.into_iter().chain(self.original.productions_of(n))
    }

    /// Iterate all nonterminals, starting with the synthetic start symbol.
    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &str)> + '_ {
        Some((NonterminalID::START, self.start_name.as_str()))
            .into_iter()
            .chain(self.original.nonterminals())
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &str)> + '_ {
        self.original.terminals()
    }
}

impl SymbolNames for AugmentedGrammar {
    fn terminal_name(&self, id: TerminalID) -> &str {
        self.original.terminal_name(id)
    }
    fn nonterminal_name(&self, id: NonterminalID) -> &str {
        match id {
            NonterminalID::START => &self.start_name,
            id => self.original.nonterminal_name(id),
        }
    }
}

impl fmt::Display for AugmentedGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        crate::util::write_joined(f, ", ", self.terminals().map(|(_, name)| name))?;
        write!(f, "\n#### nonterminals: ")?;
        crate::util::write_joined(f, ", ", self.nonterminals().map(|(_, name)| name))?;
        writeln!(f, "\n#### productions:")?;
        for (id, p) in self.productions() {
            writeln!(f, "- {:?}: {}", id, p.display(self))?;
        }
        Ok(())
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    rules: Map<String, Vec<Vec<String>>>,
}

impl GrammarDef {
    /// Specify the alternatives of a nonterminal symbol.
    ///
    /// Calling this again with the same `left` appends to its alternatives.
    /// Every symbol that never appears on a left-hand side is a terminal.
    pub fn rule<I, A, S>(&mut self, left: &str, alternatives: I) -> Result<(), GrammarError>
    where
        I: IntoIterator<Item = A>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        verify_symbol(left)?;
        let slot = self.rules.entry(left.to_owned()).or_default();
        for alternative in alternatives {
            let right = alternative
                .into_iter()
                .map(|s| {
                    let s = s.as_ref();
                    verify_symbol(s)?;
                    Ok(s.to_owned())
                })
                .collect::<Result<Vec<_>, GrammarError>>()?;
            if slot.contains(&right) {
                return Err(GrammarError::malformed(format!(
                    "duplicate production rule detected: {} -> {}",
                    left,
                    if right.is_empty() {
                        EPSILON.to_owned()
                    } else {
                        right.join(" ")
                    }
                )));
            }
            slot.push(right);
        }
        Ok(())
    }

    fn end(self) -> Grammar {
        let mut nonterminals = Map::default();
        for (i, name) in self.rules.keys().enumerate() {
            let id = NonterminalID(NonterminalID::OFFSET + i as u16);
            nonterminals.insert(id, name.clone());
        }
        let nonterminal_ids: Map<&str, NonterminalID> = nonterminals
            .iter()
            .map(|(id, name)| (name.as_str(), *id))
            .collect();

        let mut terminals = Map::default();
        terminals.insert(TerminalID::EOI, END_MARKER.to_owned());
        let mut terminal_ids: Map<&str, TerminalID> = Map::default();

        let mut productions = Map::default();
        let mut alternatives: Map<NonterminalID, Vec<ProductionID>> = Map::default();
        let mut next_production = ProductionID::OFFSET;
        for (left, rights) in &self.rules {
            let left = nonterminal_ids[left.as_str()];
            let ids = alternatives.entry(left).or_default();
            for right in rights {
                let right = right
                    .iter()
                    .map(|symbol| match nonterminal_ids.get(symbol.as_str()) {
                        Some(n) => SymbolID::N(*n),
                        None => {
                            let next = TerminalID(TerminalID::OFFSET + terminal_ids.len() as u16);
                            let t = *terminal_ids.entry(symbol.as_str()).or_insert(next);
                            terminals.entry(t).or_insert_with(|| symbol.clone());
                            SymbolID::T(t)
                        }
                    })
                    .collect();

                let id = ProductionID(next_production);
                next_production += 1;
                productions.insert(id, Production { left, right });
                ids.push(id);
            }
        }

        Grammar {
            terminals,
            nonterminals,
            productions,
            alternatives,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(#[from] io::Error),

    /// A production could not be split into its left- and right-hand side,
    /// or uses a symbol name that is not allowed.
    #[error("malformed grammar: {}", msg)]
    Malformed { msg: String },

    /// The grammar has no nonterminal symbol to start from.
    #[error("the grammar is empty: there is no nonterminal symbol to start from")]
    Empty,
}
impl GrammarError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed { msg: msg.into() }
    }
}

fn verify_symbol(s: &str) -> Result<(), GrammarError> {
    if s.is_empty() {
        return Err(GrammarError::malformed("the symbol name must not be empty"));
    }
    if s.chars().any(char::is_whitespace) {
        return Err(GrammarError::malformed(format!(
            "the symbol name `{}' must not contain whitespace",
            s
        )));
    }
    if s == END_MARKER {
        return Err(GrammarError::malformed(format!(
            "`{}' is reserved for the end of input",
            END_MARKER
        )));
    }
    if s == EPSILON {
        return Err(GrammarError::malformed(format!(
            "`{}' is not a symbol; the empty production is an empty alternative",
            EPSILON
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_grammar() -> Grammar {
        Grammar::define(|g| {
            g.rule("E", [vec!["E", "+", "T"], vec!["T"]])?;
            g.rule("T", [vec!["T", "*", "F"], vec!["F"]])?;
            g.rule("F", [vec!["(", "E", ")"], vec!["id"]])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn classify_symbols() {
        let g = expr_grammar();
        eprintln!("{}", g);

        let names: Vec<_> = g.nonterminals().map(|(_, name)| name).collect();
        assert_eq!(names, ["E", "T", "F"]);
        let names: Vec<_> = g.terminals().map(|(_, name)| name).collect();
        assert_eq!(names, ["$", "+", "*", "(", ")", "id"]);

        assert!(g.is_nonterminal("T"));
        assert!(!g.is_nonterminal("id"));
        assert_eq!(g.start_symbol(), g.nonterminal_id("E"));
        assert_eq!(g.terminal_id("$"), Some(TerminalID::EOI));
    }

    #[test]
    fn productions_keep_input_order() {
        let g = expr_grammar();
        let t = g.nonterminal_id("T").unwrap();
        let rendered: Vec<_> = g
            .productions_of(t)
            .map(|(_, p)| p.display(&g).to_string())
            .collect();
        assert_eq!(rendered, ["T -> T * F", "T -> F"]);

        let ids: Vec<_> = g.productions().map(|(id, _)| id.into_raw()).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn repeated_left_hand_side_appends() {
        let g = Grammar::define(|g| {
            g.rule("S", [vec!["a"]])?;
            g.rule("A", [vec!["b"]])?;
            g.rule("S", [vec!["A"], vec![]])?;
            Ok(())
        })
        .unwrap();
        let s = g.nonterminal_id("S").unwrap();
        let rendered: Vec<_> = g
            .productions_of(s)
            .map(|(_, p)| p.display(&g).to_string())
            .collect();
        assert_eq!(rendered, ["S -> a", "S -> A", "S -> ε"]);
    }

    #[test]
    fn empty_alternative_is_epsilon() {
        let g = Grammar::define(|g| g.rule("A", [vec!["a"], vec![]])).unwrap();
        let (_, p) = g.productions().nth(1).unwrap();
        assert!(p.is_empty());
        assert_eq!(g.terminals.len(), 2);
    }

    #[test]
    fn reject_reserved_symbols() {
        let err = Grammar::define(|g| g.rule("S", [vec!["a", "$"]])).unwrap_err();
        assert!(matches!(err, GrammarError::Malformed { .. }));

        let err = Grammar::define(|g| g.rule("S", [vec![EPSILON]])).unwrap_err();
        assert!(matches!(err, GrammarError::Malformed { .. }));

        let err = Grammar::define(|g| g.rule("", [vec!["a"]])).unwrap_err();
        assert!(matches!(err, GrammarError::Malformed { .. }));
    }

    #[test]
    fn reject_duplicate_production() {
        let err = Grammar::define(|g| g.rule("S", [vec!["a"], vec!["a"]])).unwrap_err();
        assert!(matches!(err, GrammarError::Malformed { .. }));
    }

    #[test]
    fn augment_adds_single_start_production() {
        let g = expr_grammar().augment().unwrap();
        eprintln!("{}", g);

        assert_eq!(g.start_name(), "E'");
        assert!(!g.original().is_nonterminal(g.start_name()));

        let accepts: Vec<_> = g
            .productions()
            .filter(|(_, p)| p.left == NonterminalID::START)
            .collect();
        assert_eq!(accepts.len(), 1);
        let (id, accept) = accepts[0];
        assert_eq!(id, ProductionID::ACCEPT);
        assert_eq!(accept.right, [SymbolID::N(g.start_symbol())]);
        assert_eq!(accept.display(&g).to_string(), "E' -> E");
        assert_eq!(
            g.productions().count(),
            g.original().productions().count() + 1
        );
    }

    #[test]
    fn augmented_start_name_avoids_collisions() {
        let g = Grammar::define(|g| {
            g.rule("S", [vec!["S'", "x"]])?;
            g.rule("S'", [vec!["S''"]])?;
            Ok(())
        })
        .unwrap()
        .augment()
        .unwrap();
        assert_eq!(g.start_name(), "S'''");
    }

    #[test]
    fn augment_empty_grammar() {
        let g = Grammar::define(|_| Ok(())).unwrap();
        assert!(matches!(g.augment(), Err(GrammarError::Empty)));
    }
}
