//! Calculation of SLR(1) parse table with conflict detection.

use crate::{
    first_sets::FollowSets,
    grammar::{AugmentedGrammar, NonterminalID, ProductionID, SymbolNames, TerminalID},
    lr0::{LR0Automaton, StateID},
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone)]
pub struct ParseTable {
    pub states: Map<StateID, ParseTableRow>,
    /// Every cell that had more than one candidate action, ordered by
    /// state and lookahead.
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g AugmentedGrammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Action::Shift(n) => write!(f, "shift({:?})", n),
            Action::Reduce(p) => write!(f, "reduce({})", g.production(*p).display(g)),
            Action::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    /// The completed augmented production competes with a reduction on `$`.
    AcceptReduce,
}

/// Competing actions found for one table cell.
///
/// The cell is still filled with `resolved`, picked by these rules:
/// accept wins over shift, shift wins over reduce, and among reductions the
/// lowest numbered production (the earliest one in the input) wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: TerminalID,
    pub shift: Option<StateID>,
    /// Sorted by production id.
    pub reduces: Vec<ProductionID>,
    pub accept: bool,
    pub resolved: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        if self.accept {
            ConflictKind::AcceptReduce
        } else if self.shift.is_some() {
            ConflictKind::ShiftReduce
        } else {
            ConflictKind::ReduceReduce
        }
    }

    /// All competing actions, in resolution order.
    pub fn actions(&self) -> Vec<Action> {
        let accept = self.accept.then_some(Action::Accept);
        let shift = self.shift.map(Action::Shift);
        accept
            .into_iter()
            .chain(shift)
            .chain(self.reduces.iter().copied().map(Action::Reduce))
            .collect()
    }

    pub fn display<'g>(&'g self, g: &'g AugmentedGrammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let kind = match self.kind() {
                ConflictKind::ShiftReduce => "shift/reduce",
                ConflictKind::ReduceReduce => "reduce/reduce",
                ConflictKind::AcceptReduce => "accept/reduce",
            };
            write!(
                f,
                "{} conflict in state {:?} on {}: ",
                kind,
                self.state,
                g.terminal_name(self.lookahead)
            )?;
            for (i, action) in self.actions().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", action.display(g))?;
            }
            write!(f, " (chose {})", self.resolved.display(g))
        })
    }
}

impl ParseTable {
    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.states.get(&state)?.actions.get(&lookahead).copied()
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&symbol).copied()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// The terminals that label at least one action, ordered by id.
    pub fn terminals(&self) -> Vec<TerminalID> {
        let mut terminals: Vec<_> = self
            .states
            .values()
            .flat_map(|row| row.actions.keys().copied())
            .collect();
        terminals.sort();
        terminals.dedup();
        terminals
    }

    /// The nonterminals that label at least one goto, ordered by id.
    pub fn nonterminals(&self) -> Vec<NonterminalID> {
        let mut nonterminals: Vec<_> = self
            .states
            .values()
            .flat_map(|row| row.gotos.keys().copied())
            .collect();
        nonterminals.sort();
        nonterminals.dedup();
        nonterminals
    }

    pub fn display<'g>(&'g self, g: &'g AugmentedGrammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, row)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## actions")?;
                for (token, action) in &row.actions {
                    writeln!(f, "- {} => {}", g.terminal_name(*token), action.display(g))?;
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &row.gotos {
                    writeln!(f, "- {} => goto({:?})", g.nonterminal_name(*symbol), goto)?;
                }
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n#### conflicts")?;
                for conflict in &self.conflicts {
                    writeln!(f, "- {}", conflict.display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// Build the SLR(1) table: shifts and gotos from the automaton transitions,
/// reductions on the FOLLOW set of the reduced nonterminal.
pub fn generate(g: &AugmentedGrammar, lr0: &LR0Automaton, follow: &FollowSets) -> ParseTable {
    let span = tracing::trace_span!("table");
    let _entered = span.enter();

    let mut states = Map::default();
    let mut conflicts = vec![];
    for (&id, lr0_state) in &lr0.states {
        #[derive(Default)]
        struct PendingAction {
            shift: Option<StateID>,
            reduces: Vec<ProductionID>,
            accept: bool,
        }
        let mut pending_actions = Map::<TerminalID, PendingAction>::default();
        for (&t, &next) in &lr0_state.shifts {
            pending_actions.entry(t).or_default().shift.replace(next);
        }
        for item in lr0_state.complete_items(g) {
            if item.production == ProductionID::ACCEPT {
                pending_actions.entry(TerminalID::EOI).or_default().accept = true;
                continue;
            }
            let left = g.production(item.production).left;
            for t in follow.get(left).iter() {
                pending_actions
                    .entry(t)
                    .or_default()
                    .reduces
                    .push(item.production);
            }
        }
        pending_actions.sort_keys();

        let mut actions = Map::default();
        for (lookahead, mut pending) in pending_actions {
            pending.reduces.sort();
            pending.reduces.dedup();

            let resolved = if pending.accept {
                Action::Accept
            } else if let Some(next) = pending.shift {
                Action::Shift(next)
            } else {
                match pending.reduces.first() {
                    Some(reduce) => Action::Reduce(*reduce),
                    None => continue,
                }
            };

            let candidates = usize::from(pending.accept)
                + usize::from(pending.shift.is_some())
                + pending.reduces.len();
            if candidates > 1 {
                let conflict = Conflict {
                    state: id,
                    lookahead,
                    shift: pending.shift,
                    reduces: pending.reduces,
                    accept: pending.accept,
                    resolved,
                };
                tracing::warn!("{}", conflict.display(g));
                conflicts.push(conflict);
            }

            actions.insert(lookahead, resolved);
        }

        let gotos = lr0_state.gotos.clone();
        states.insert(id, ParseTableRow { actions, gotos });
    }
    tracing::debug!(
        "SLR(1) table: {} states, {} conflicts",
        states.len(),
        conflicts.len()
    );

    ParseTable { states, conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        first_sets::FirstSets,
        grammar::{Grammar, SymbolID},
    };

    fn build(source: &str) -> (AugmentedGrammar, LR0Automaton, ParseTable) {
        let g = Grammar::from_str(source).unwrap().augment().unwrap();
        let first = FirstSets::new(g.original());
        let follow = FollowSets::new(g.original(), &first);
        let lr0 = crate::lr0::lr0(&g);
        let table = generate(&g, &lr0, &follow);
        eprintln!("{}", table.display(&g));
        (g, lr0, table)
    }

    fn t(g: &AugmentedGrammar, name: &str) -> TerminalID {
        g.original().terminal_id(name).unwrap()
    }

    fn n(g: &AugmentedGrammar, name: &str) -> NonterminalID {
        g.original().nonterminal_id(name).unwrap()
    }

    #[test]
    fn expression_grammar_has_no_conflicts() {
        let (g, lr0, table) = build("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id");
        assert!(!table.has_conflicts());
        assert_eq!(table.states.len(), 12);

        let Some(Action::Shift(next)) = table.action(StateID::START, t(&g, "id")) else {
            panic!("state 0 must shift on `id'");
        };
        let items: Vec<_> = lr0
            .state(next)
            .items
            .iter()
            .map(|item| item.display(&g).to_string())
            .collect();
        assert_eq!(items, ["F -> [ id . ]"]);

        let f = g.original().nonterminal_id("F").unwrap();
        let (reduce_f, _) = g.original().productions_of(f).nth(1).unwrap();
        for lookahead in ["+", "*", ")", "$"] {
            assert_eq!(
                table.action(next, t(&g, lookahead)),
                Some(Action::Reduce(reduce_f))
            );
        }
        assert_eq!(table.action(next, t(&g, "id")), None);
        assert_eq!(table.action(next, t(&g, "(")), None);
    }

    #[test]
    fn accept_on_end_marker() {
        let (g, _, table) = build("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id");
        let Some(after_e) = table.goto(StateID::START, n(&g, "E")) else {
            panic!("state 0 must have a goto on E");
        };
        assert_eq!(table.action(after_e, TerminalID::EOI), Some(Action::Accept));
        assert!(matches!(
            table.action(after_e, t(&g, "+")),
            Some(Action::Shift(..))
        ));
    }

    #[test]
    fn shifts_and_gotos_follow_transitions() {
        let (g, lr0, table) = build("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id");
        for (id, state) in &lr0.states {
            for (t, next) in &state.shifts {
                assert_eq!(table.action(*id, *t), Some(Action::Shift(*next)));
            }
            for (n, next) in &state.gotos {
                assert_eq!(table.goto(*id, *n), Some(*next));
                assert_eq!(lr0.transition(*id, SymbolID::N(*n)), Some(*next));
            }
        }
        let names: Vec<_> = table
            .nonterminals()
            .into_iter()
            .map(|n| g.nonterminal_name(n).to_owned())
            .collect();
        assert_eq!(names, ["E", "T", "F"]);
        assert_eq!(table.terminals().len(), 6);
    }

    #[test]
    fn epsilon_production_reduces_on_follow() {
        let (g, _, table) = build("S -> A B\nA -> a | ε\nB -> b");
        assert!(!table.has_conflicts());

        let a = n(&g, "A");
        let (epsilon, p) = g.original().productions_of(a).nth(1).unwrap();
        assert!(p.is_empty());

        assert_eq!(
            table.action(StateID::START, t(&g, "b")),
            Some(Action::Reduce(epsilon))
        );
        assert!(matches!(
            table.action(StateID::START, t(&g, "a")),
            Some(Action::Shift(..))
        ));
        assert_eq!(table.action(StateID::START, TerminalID::EOI), None);
    }

    const DANGLING_ELSE: &str = "\
S -> if E then S | if E then S else S | other
E -> cond
";

    #[test]
    fn dangling_else_is_reported() {
        let (g, _, table) = build(DANGLING_ELSE);
        assert_eq!(table.conflicts.len(), 1);

        let conflict = &table.conflicts[0];
        assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
        assert_eq!(conflict.lookahead, t(&g, "else"));
        assert_eq!(conflict.reduces.len(), 1);
        let shift = conflict.shift.unwrap();
        assert_eq!(conflict.resolved, Action::Shift(shift));
        assert_eq!(
            table.action(conflict.state, conflict.lookahead),
            Some(Action::Shift(shift))
        );
        assert_eq!(
            conflict.actions(),
            [Action::Shift(shift), Action::Reduce(conflict.reduces[0])]
        );
        assert_eq!(
            conflict.display(&g).to_string(),
            format!(
                "shift/reduce conflict in state {:?} on else: shift({:?}), reduce(S -> if E then S) (chose shift({:?}))",
                conflict.state, shift, shift
            )
        );
    }

    #[test]
    fn conflicts_are_deterministic() {
        let (g, lr0, table) = build(DANGLING_ELSE);
        let first = FirstSets::new(g.original());
        let follow = FollowSets::new(g.original(), &first);
        for _ in 0..8 {
            let again = generate(&g, &lr0, &follow);
            assert_eq!(again.conflicts, table.conflicts);
            for (id, row) in &table.states {
                assert_eq!(&again.states[id], row);
            }
        }
    }

    #[test]
    fn reduce_reduce_prefers_earliest_production() {
        let (g, _, table) = build("S -> A | B\nA -> x\nB -> x");
        assert_eq!(table.conflicts.len(), 1);

        let conflict = &table.conflicts[0];
        assert_eq!(conflict.kind(), ConflictKind::ReduceReduce);
        assert_eq!(conflict.lookahead, TerminalID::EOI);

        let (reduce_a, _) = g.original().productions_of(n(&g, "A")).next().unwrap();
        let (reduce_b, _) = g.original().productions_of(n(&g, "B")).next().unwrap();
        assert_eq!(conflict.reduces, [reduce_a, reduce_b]);
        assert_eq!(conflict.resolved, Action::Reduce(reduce_a));
    }

    #[test]
    fn accept_reduce_conflict() {
        let (_, _, table) = build("S -> S | a");
        let conflict = table
            .conflicts
            .iter()
            .find(|c| c.kind() == ConflictKind::AcceptReduce)
            .unwrap();
        assert_eq!(conflict.lookahead, TerminalID::EOI);
        assert_eq!(conflict.resolved, Action::Accept);
    }
}
