use crate::virtual_machine::errors::VMError;

/// Counts executed instructions against an optional limit.
///
/// Without a limit the counter only records how many steps ran.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct StepBudget {
    limit: Option<u64>,
    used: u64,
}

impl StepBudget {
    pub(super) fn new(limit: Option<u64>) -> Self {
        Self { limit, used: 0 }
    }

    /// Accounts for one instruction.
    ///
    /// Returns [`VMError::StepLimitExceeded`] once the limit is used up.
    #[inline(always)]
    pub(super) fn charge(&mut self) -> Result<(), VMError> {
        if let Some(limit) = self.limit
            && self.used >= limit
        {
            return Err(VMError::StepLimitExceeded { limit });
        }
        self.used = self.used.saturating_add(1);
        Ok(())
    }

    pub(super) fn used(&self) -> u64 {
        self.used
    }

    pub(super) fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_budget_only_counts() {
        let mut budget = StepBudget::new(None);
        for _ in 0..1000 {
            budget.charge().unwrap();
        }
        assert_eq!(budget.used(), 1000);
    }

    #[test]
    fn limited_budget_stops_at_limit() {
        let mut budget = StepBudget::new(Some(2));
        budget.charge().unwrap();
        budget.charge().unwrap();
        assert_eq!(
            budget.charge(),
            Err(VMError::StepLimitExceeded { limit: 2 })
        );
        assert_eq!(budget.used(), 2);
    }
}
