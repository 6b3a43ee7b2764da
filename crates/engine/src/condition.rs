use std::collections::{BTreeSet, HashMap};

use looks_core::{LookId, ResolvedLook};

/// Visibility rule keyed on the active look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookCondition {
    pub looks: BTreeSet<LookId>,
    pub negate: bool,
}

impl LookCondition {
    pub fn new(looks: impl IntoIterator<Item = LookId>) -> Self {
        Self {
            looks: looks.into_iter().collect(),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// An empty, non-negated condition always passes.
    pub fn evaluate(&self, active: Option<&ResolvedLook>) -> bool {
        if self.looks.is_empty() && !self.negate {
            return true;
        }
        let matched = active.is_some_and(|look| self.looks.contains(&look.look_id));
        matched != self.negate
    }

    /// Human-readable description. `names` maps ids to look names; ids
    /// without a name are left out.
    pub fn summary(&self, names: &HashMap<LookId, String>) -> String {
        let listed: Vec<&str> = self
            .looks
            .iter()
            .filter_map(|id| names.get(id).map(String::as_str))
            .collect();
        if listed.is_empty() {
            let applies = if self.negate { "no" } else { "all" };
            return format!("Applies for: {applies} looks");
        }
        let applies = if self.negate { "Not applies" } else { "Applies" };
        format!("{applies} for: {}", listed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use looks_core::LookConfig;

    fn active(id: i64) -> ResolvedLook {
        ResolvedLook {
            look_id: LookId::new(id),
            look_name: format!("look{id}"),
            config: LookConfig::new(),
        }
    }

    #[test]
    fn empty_condition_passes() {
        let condition = LookCondition::default();
        assert!(condition.evaluate(None));
        assert!(condition.evaluate(Some(&active(3))));
    }

    #[test]
    fn membership_and_negation() {
        let condition = LookCondition::new([LookId::new(1), LookId::new(2)]);
        assert!(condition.evaluate(Some(&active(2))));
        assert!(!condition.evaluate(Some(&active(3))));
        assert!(!condition.evaluate(None));

        let negated = condition.negated();
        assert!(!negated.evaluate(Some(&active(2))));
        assert!(negated.evaluate(Some(&active(3))));
        assert!(negated.evaluate(None));
    }

    #[test]
    fn summaries() {
        let names = HashMap::from([(LookId::new(1), "Summer".to_string())]);
        assert_eq!(LookCondition::default().summary(&names), "Applies for: all looks");
        assert_eq!(
            LookCondition::new([LookId::new(1), LookId::new(7)]).summary(&names),
            "Applies for: Summer"
        );
        assert_eq!(
            LookCondition::new([LookId::new(7)]).negated().summary(&names),
            "Applies for: no looks"
        );
        assert_eq!(
            LookCondition::new([LookId::new(1)]).negated().summary(&names),
            "Not applies for: Summer"
        );
    }
}
