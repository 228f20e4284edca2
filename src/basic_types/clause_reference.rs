#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClauseReference {
    pub id: u32,
}

impl std::fmt::Display for ClauseReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.id)
    }
}
