//! Client-side filtering of loaded record lists
//!
//! Filters are pure predicates over [`Record`]s. A screen owns a [`FilterSet`]
//! of named controls (search box, status dropdown, ...) and re-runs [`apply`]
//! whenever one of them or the source list changes.

use crate::models::Record;

/// Sentinel meaning "no constraint" for exact-match dropdowns
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Case-insensitive substring match on the field or any alias
    Contains,
    /// Exact match on the string form of the field or any alias
    Equals,
}

impl Predicate {
    pub fn as_str(&self) -> &str {
        match self {
            Predicate::Contains => "contains",
            Predicate::Equals => "equals",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub field: String,
    pub aliases: Vec<String>,
    pub predicate: Predicate,
    pub value: String,
}

impl FilterSpec {
    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, Predicate::Contains, value)
    }

    pub fn equals(field: &str, value: &str) -> Self {
        Self::new(field, Predicate::Equals, value)
    }

    fn new(field: &str, predicate: Predicate, value: &str) -> Self {
        Self {
            field: field.to_string(),
            aliases: Vec::new(),
            predicate,
            value: value.to_string(),
        }
    }

    /// Also match against another field, e.g. "clinic" or "beneficiary"
    pub fn or_field(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// An inert filter matches every record
    pub fn is_inert(&self) -> bool {
        match self.predicate {
            Predicate::Contains => self.value.is_empty(),
            Predicate::Equals => self.value.is_empty() || self.value == ALL,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.field.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.is_inert() {
            return true;
        }

        match self.predicate {
            Predicate::Contains => {
                let needle = self.value.to_lowercase();
                self.fields()
                    .any(|field| record.text(field).to_lowercase().contains(&needle))
            }
            Predicate::Equals => self.fields().any(|field| record.text(field) == self.value),
        }
    }
}

/// Records of `source` matching every filter, in source order
pub fn apply(source: &[Record], filters: &[FilterSpec]) -> Vec<Record> {
    let active: Vec<&FilterSpec> = filters.iter().filter(|f| !f.is_inert()).collect();
    if active.is_empty() {
        return source.to_vec();
    }

    source
        .iter()
        .filter(|record| active.iter().all(|filter| filter.matches(record)))
        .cloned()
        .collect()
}

/// One user-facing filter control of a screen
#[derive(Debug, Clone, PartialEq)]
pub struct FilterControl {
    pub key: &'static str,
    pub label: &'static str,
    pub spec: FilterSpec,
    /// Choices offered for exact-match controls; empty for free text
    pub options: Vec<String>,
}

impl FilterControl {
    pub fn new(key: &'static str, label: &'static str, spec: FilterSpec) -> Self {
        Self {
            key,
            label,
            spec,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn is_free_text(&self) -> bool {
        self.spec.predicate == Predicate::Contains
    }

    /// Step through `all` plus the options, wrapping around
    pub fn cycle_option(&mut self, forward: bool) {
        if self.options.is_empty() {
            return;
        }

        let position = self.options.iter().position(|o| *o == self.spec.value);
        let count = self.options.len() + 1; // slot 0 is "all"
        let current = position.map(|p| p + 1).unwrap_or(0);
        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };

        self.spec.value = if next == 0 {
            ALL.to_string()
        } else {
            self.options[next - 1].clone()
        };
    }

    fn reset(&mut self) {
        self.spec.value = match self.spec.predicate {
            Predicate::Contains => String::new(),
            Predicate::Equals => ALL.to_string(),
        };
    }
}

/// The ordered filter controls of one screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    controls: Vec<FilterControl>,
}

impl FilterSet {
    pub fn new(controls: Vec<FilterControl>) -> Self {
        let mut set = Self { controls };
        set.clear();
        set
    }

    /// Set the value of a control; returns false for an unknown key
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match self.control_mut(key) {
            Some(control) => {
                control.spec.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.control(key).map(|c| c.spec.value.as_str())
    }

    pub fn set_options(&mut self, key: &str, options: Vec<String>) {
        if let Some(control) = self.control_mut(key) {
            control.options = options;
        }
    }

    /// Reset every control to its inert value
    pub fn clear(&mut self) {
        for control in &mut self.controls {
            control.reset();
        }
    }

    pub fn control(&self, key: &str) -> Option<&FilterControl> {
        self.controls.iter().find(|c| c.key == key)
    }

    pub fn control_mut(&mut self, key: &str) -> Option<&mut FilterControl> {
        self.controls.iter_mut().find(|c| c.key == key)
    }

    pub fn controls(&self) -> &[FilterControl] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut [FilterControl] {
        &mut self.controls
    }

    pub fn specs(&self) -> Vec<FilterSpec> {
        self.controls.iter().map(|c| c.spec.clone()).collect()
    }

    pub fn is_any_active(&self) -> bool {
        self.controls.iter().any(|c| !c.spec.is_inert())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contracts() -> Vec<Record> {
        ["جديد", "موافق عليه", "تم التعاقد", "مرفوض"]
            .iter()
            .enumerate()
            .map(|(i, status)| {
                Record::new()
                    .with("id", format!("CONT-00{}", i + 1))
                    .with("status", *status)
                    .with("supplier", if i % 2 == 0 { "Alpha Medical" } else { "Beta Supply" })
            })
            .collect()
    }

    #[test]
    fn test_equals_status_selects_single_contract() {
        let source = contracts();
        let visible = apply(&source, &[FilterSpec::equals("status", "موافق عليه")]);

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text("status"), "موافق عليه");
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let source = vec![
            Record::new().with("name", "A").with("code", "X1"),
            Record::new().with("name", "B").with("code", "X2"),
        ];
        let filter = FilterSpec::contains("name", "x1").or_field("code");

        let visible = apply(&source, &[filter]);
        assert_eq!(visible, vec![source[0].clone()]);
    }

    #[test]
    fn test_filters_intersect() {
        let source = vec![
            Record::new().with("a", "yes").with("b", "no"),
            Record::new().with("a", "yes").with("b", "yes"),
            Record::new().with("a", "yes").with("b", "no"),
            Record::new().with("a", "no").with("b", "yes"),
        ];
        let first = FilterSpec::equals("a", "yes");
        let second = FilterSpec::equals("b", "yes");

        assert_eq!(apply(&source, &[first.clone()]).len(), 3);
        assert_eq!(apply(&source, &[second.clone()]).len(), 2);

        let visible = apply(&source, &[first, second]);
        assert_eq!(visible, vec![source[1].clone()]);
    }

    #[test]
    fn test_inert_filters_return_source_unchanged() {
        let source = contracts();
        let filters = vec![
            FilterSpec::contains("supplier", ""),
            FilterSpec::equals("status", ALL),
            FilterSpec::equals("status", ""),
        ];

        assert!(filters.iter().all(FilterSpec::is_inert));
        assert_eq!(apply(&source, &filters), source);
    }

    #[test]
    fn test_alias_field_matches_either() {
        let source = vec![
            Record::new().with("clinic", "North Clinic"),
            Record::new().with("beneficiary", "North Wing"),
            Record::new().with("beneficiary", "South Wing"),
        ];
        let filter = FilterSpec::contains("clinic", "north").or_field("beneficiary");

        assert_eq!(apply(&source, &[filter]).len(), 2);
    }

    #[test]
    fn test_equals_matches_number_string_form() {
        let source = vec![
            Record::new().with("quantity", 3i64),
            Record::new().with("quantity", 4i64),
        ];
        let visible = apply(&source, &[FilterSpec::equals("quantity", "3")]);
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_apply_preserves_order_and_is_subset() {
        let source = contracts();
        let visible = apply(&source, &[FilterSpec::contains("supplier", "alpha")]);

        let ids: Vec<String> = visible.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["CONT-001", "CONT-003"]);
        assert!(visible.iter().all(|r| source.contains(r)));
    }

    #[test]
    fn test_apply_is_idempotent_and_composes() {
        let source = contracts();
        let f1 = vec![FilterSpec::contains("supplier", "a")];
        let f2 = vec![FilterSpec::equals("status", "تم التعاقد")];

        let once = apply(&source, &f1);
        assert_eq!(apply(&once, &f1), once);

        let combined: Vec<FilterSpec> = f1.iter().chain(f2.iter()).cloned().collect();
        assert_eq!(apply(&source, &combined), apply(&apply(&source, &f1), &f2));
    }

    #[test]
    fn test_filter_set_clear_resets_to_inert() {
        let mut set = FilterSet::new(vec![
            FilterControl::new("search", "Search", FilterSpec::contains("name", "")),
            FilterControl::new("status", "Status", FilterSpec::equals("status", "")),
        ]);
        assert_eq!(set.value("status"), Some(ALL));

        assert!(set.set("search", "abc"));
        assert!(set.set("status", "مرفوض"));
        assert!(!set.set("unknown", "x"));
        assert!(set.is_any_active());

        set.clear();
        assert!(!set.is_any_active());
        assert_eq!(set.value("search"), Some(""));
    }

    #[test]
    fn test_cycle_option_wraps_through_all() {
        let mut control = FilterControl::new("status", "Status", FilterSpec::equals("status", ALL))
            .with_options(vec!["A".to_string(), "B".to_string()]);

        control.cycle_option(true);
        assert_eq!(control.spec.value, "A");
        control.cycle_option(true);
        assert_eq!(control.spec.value, "B");
        control.cycle_option(true);
        assert_eq!(control.spec.value, ALL);
        control.cycle_option(false);
        assert_eq!(control.spec.value, "B");
    }
}
