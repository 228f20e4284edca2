use crate::basic_types::Clause;
use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::marrow_assert_advanced;
use crate::marrow_assert_moderate;
use crate::marrow_assert_ne_moderate;
use crate::marrow_assert_ne_simple;
use crate::marrow_assert_simple;

/// Arena for clauses. Clause ids start at one so that id zero can serve as the null reason
/// code, and the top of the id space is ceded to pseudo-Boolean constraints: each registered
/// pseudo-Boolean constraint lowers the ceiling by one, and reason codes above the ceiling
/// identify pseudo-Boolean constraints rather than clauses.
pub struct ClauseAllocator {
    allocated_clauses: Vec<Clause>,
    max_clause_id: u32,
    deleted_clause_ids: Vec<ClauseReference>,
}

impl ClauseAllocator {
    pub fn new() -> ClauseAllocator {
        ClauseAllocator {
            allocated_clauses: vec![],
            max_clause_id: u32::MAX - 1,
            deleted_clause_ids: vec![],
        }
    }

    pub fn create_clause(&mut self, literals: Vec<Literal>, is_learned: bool) -> ClauseReference {
        marrow_assert_ne_simple!(literals.len(), 0);

        if self.deleted_clause_ids.is_empty() {
            //create a new clause reference, unseen before
            //  id zero is kept as the null value, never to be allocated
            let clause_reference = ClauseReference {
                id: self.allocated_clauses.len() as u32 + 1,
            };

            self.allocated_clauses
                .push(Clause::new(literals, is_learned));

            marrow_assert_simple!(
                clause_reference.id <= self.max_clause_id,
                "Clause allocation reached its limit, most likely caused by an error?"
            );
            clause_reference
        } else {
            //reuse a clause reference from the deleted clause pool
            let clause_reference = self.deleted_clause_ids.pop().expect("Checked nonempty.");
            self.allocated_clauses[clause_reference.id as usize - 1] =
                Clause::new(literals, is_learned);

            clause_reference
        }
    }

    pub fn get_mutable_clause(&mut self, clause_reference: ClauseReference) -> &mut Clause {
        &mut self.allocated_clauses[clause_reference.id as usize - 1]
    }

    pub fn get_clause(&self, clause_reference: ClauseReference) -> &Clause {
        marrow_assert_ne_moderate!(clause_reference.id, 0);
        &self.allocated_clauses[clause_reference.id as usize - 1]
    }

    pub fn delete_clause(&mut self, clause_reference: ClauseReference) {
        //'deleting' a clause labels its clause reference as available,
        //  the next created clause can freely take the id of a previously deleted clause
        marrow_assert_moderate!(
            !self.get_clause(clause_reference).is_deleted(),
            "Cannot delete an already deleted clause."
        );
        marrow_assert_advanced!(
            !self.deleted_clause_ids.contains(&clause_reference),
            "The id of the deleted clause is already present in the deleted pool, meaning the clause is deleted twice, unexpected."
        );

        self.get_mutable_clause(clause_reference).mark_deleted();
        self.deleted_clause_ids.push(clause_reference);
    }

    pub fn is_reason_code_linked_to_a_clause(&self, reason_code: u32) -> bool {
        reason_code <= self.max_clause_id
    }

    pub fn reduce_id_limit_by_one(&mut self) {
        marrow_assert_simple!(
            self.max_clause_id > 0
                && self.allocated_clauses.len() < (self.max_clause_id - 1) as usize,
            "Cannot reduce the limit beyond what is already allocated - perhaps an error?"
        );

        self.max_clause_id -= 1;
    }
}

impl std::ops::Index<ClauseReference> for ClauseAllocator {
    type Output = Clause;
    fn index(&self, clause_reference: ClauseReference) -> &Clause {
        self.get_clause(clause_reference)
    }
}

impl std::ops::IndexMut<ClauseReference> for ClauseAllocator {
    fn index_mut(&mut self, clause_reference: ClauseReference) -> &mut Clause {
        self.get_mutable_clause(clause_reference)
    }
}

impl std::fmt::Display for ClauseAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clauses_string = &self
            .allocated_clauses
            .iter()
            .fold(String::new(), |acc, clause| acc + &clause.to_string() + "\n");

        write!(
            f,
            "Num clauses: {}\n{}",
            self.allocated_clauses.len(),
            clauses_string
        )
    }
}
