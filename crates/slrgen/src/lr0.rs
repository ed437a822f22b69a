//! LR(0) automaton.

use crate::{
    grammar::{AugmentedGrammar, NonterminalID, ProductionID, SymbolID, SymbolNames, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl StateID {
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

/// The LR(0) item, a.k.a. LR item core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub index: u16,
}
impl LR0Item {
    pub fn new(production: ProductionID, index: u16) -> Self {
        Self { production, index }
    }

    /// The symbol right after the marker, if any.
    pub fn next_symbol(&self, g: &AugmentedGrammar) -> Option<SymbolID> {
        let production = g.production(self.production);
        production.right.get(usize::from(self.index)).copied()
    }

    /// Whether the marker has reached the end of the production.
    pub fn is_complete(&self, g: &AugmentedGrammar) -> bool {
        usize::from(self.index) == g.production(self.production).right.len()
    }

    pub fn display<'g>(&'g self, g: &'g AugmentedGrammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "{} -> [", g.nonterminal_name(production.left))?;
            for (i, r) in production.right.iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*r))?;
            }
            if production.right.len() == usize::from(self.index) {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

/// A set of LR(0) items.
///
/// Items are kept sorted, so two sets compare and hash equal exactly when
/// they contain the same items.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ItemSet {
    items: BTreeSet<LR0Item>,
}

impl ItemSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn contains(&self, item: &LR0Item) -> bool {
        self.items.contains(item)
    }
    pub fn insert(&mut self, item: LR0Item) -> bool {
        self.items.insert(item)
    }
    pub fn iter(&self) -> impl Iterator<Item = &LR0Item> + '_ {
        self.items.iter()
    }
}

impl FromIterator<LR0Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = LR0Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Expand `items` until every nonterminal after a marker has its
/// productions added with the marker at the start.
pub fn closure(g: &AugmentedGrammar, mut items: ItemSet) -> ItemSet {
    let mut pending: VecDeque<LR0Item> = items.iter().copied().collect();
    while let Some(item) = pending.pop_front() {
        let Some(SymbolID::N(n)) = item.next_symbol(g) else {
            continue;
        };
        for (id, _) in g.productions_of(n) {
            let new_item = LR0Item::new(id, 0);
            if items.insert(new_item) {
                pending.push_back(new_item);
            }
        }
    }
    items
}

/// Advance the marker over `symbol` and take the closure of the result.
///
/// Returns an empty set when no item in `items` expects `symbol`.
pub fn goto(g: &AugmentedGrammar, items: &ItemSet, symbol: SymbolID) -> ItemSet {
    let advanced: ItemSet = items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(|item| LR0Item {
            index: item.index + 1,
            ..*item
        })
        .collect();
    if advanced.is_empty() {
        return advanced;
    }
    closure(g, advanced)
}

#[derive(Debug, Clone)]
pub struct LR0State {
    pub items: ItemSet,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
}

impl LR0State {
    /// The target of the transition on `symbol`, if one exists.
    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        match symbol {
            SymbolID::T(t) => self.shifts.get(&t).copied(),
            SymbolID::N(n) => self.gotos.get(&n).copied(),
        }
    }

    /// Iterate the items whose marker is at the end of the production.
    pub fn complete_items<'a>(
        &'a self,
        g: &'a AugmentedGrammar,
    ) -> impl Iterator<Item = &'a LR0Item> + 'a {
        self.items.iter().filter(move |item| item.is_complete(g))
    }

    pub fn display<'g>(&'g self, g: &'g AugmentedGrammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## items:")?;
            for item in self.items.iter() {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminal_name(*t), to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminal_name(*n), to)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
}

impl LR0Automaton {
    pub fn state(&self, id: StateID) -> &LR0State {
        &self.states[&id]
    }

    pub fn transition(&self, from: StateID, symbol: SymbolID) -> Option<StateID> {
        self.states.get(&from)?.transition(symbol)
    }

    pub fn display<'g>(&'g self, g: &'g AugmentedGrammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the LR(0) automaton based on the specified grammar.
///
/// States are numbered in the order the breadth-first traversal discovers
/// them, starting from the closure of `Start' -> . Start`.
pub fn lr0(g: &AugmentedGrammar) -> LR0Automaton {
    let span = tracing::trace_span!("lr0");
    let _entered = span.enter();

    let mut state_id = {
        let mut next_state_id = 0;
        move || {
            let id = StateID(next_state_id);
            next_state_id += 1;
            id
        }
    };

    let initial = closure(
        g,
        Some(LR0Item::new(ProductionID::ACCEPT, 0))
            .into_iter()
            .collect(),
    );

    // canonical item set -> state id
    let mut known = Map::<ItemSet, StateID>::default();
    let mut pending_states = VecDeque::<(StateID, ItemSet)>::new();
    let start = state_id();
    known.insert(initial.clone(), start);
    pending_states.push_back((start, initial));

    let mut states = Map::<StateID, LR0State>::default();
    while let Some((current, items)) = pending_states.pop_front() {
        let symbols: Set<SymbolID> = items.iter().filter_map(|item| item.next_symbol(g)).collect();

        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for symbol in symbols {
            let new_items = goto(g, &items, symbol);
            debug_assert!(!new_items.is_empty());
            let next = match known.get(&new_items) {
                Some(id) => *id,
                None => {
                    let id = state_id();
                    known.insert(new_items.clone(), id);
                    pending_states.push_back((id, new_items));
                    id
                }
            };
            match symbol {
                SymbolID::T(t) => {
                    shifts.insert(t, next);
                }
                SymbolID::N(n) => {
                    gotos.insert(n, next);
                }
            }
        }

        states.insert(
            current,
            LR0State {
                items,
                shifts,
                gotos,
            },
        );
    }
    states.sort_keys();
    tracing::debug!("LR(0) automaton: {} states", states.len());

    LR0Automaton { states }
}
