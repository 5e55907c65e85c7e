/// Outcome of a rewrite: whether any rule fired while producing the value.
#[derive(Debug, PartialEq, Clone)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn get_plan(self) -> T {
        match self {
            Transformed::Yes(plan) | Transformed::No(plan) => plan,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }

    /// Combine with another outcome: `Yes` if either side changed.
    pub(crate) fn or_yes(self, changed: bool) -> Self {
        match self {
            Transformed::No(plan) if changed => Transformed::Yes(plan),
            other => other,
        }
    }
}
