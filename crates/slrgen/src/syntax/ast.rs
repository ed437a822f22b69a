/// A line of grammar text: one left-hand side and its alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub left: String,
    /// Each alternative is a sequence of symbols; an empty one is an epsilon production.
    pub alternatives: Vec<Vec<String>>,
}
