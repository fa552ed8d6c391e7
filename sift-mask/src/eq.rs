use crate::Mask;

impl PartialEq for Mask {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() || self.true_count() != other.true_count() {
            return false;
        }
        match (self, other) {
            (Mask::Values(lhs), Mask::Values(rhs)) => lhs.buffer == rhs.buffer,
            // A mixed mask never has the count of a uniform one.
            _ => true,
        }
    }
}

impl Eq for Mask {}
