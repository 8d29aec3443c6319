// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable registry of named operations.
//!
//! A [`DispatchTable`] maps operation names to their [`OperationSpec`] and
//! handler. It is assembled once through [`DispatchTableBuilder`] and only
//! read afterwards. Visibility filtering by requester access is a pure
//! function of the table and an [`AccessContext`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use herald_core::{HeraldError, OperationDescriptor, OperationHandler, PermissionLevel};
use serde_json::{Map, Value};

use crate::schema::{ParamSpec, json_schema, validate_arguments};

/// Declaration of one dispatchable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    /// Shown to the classifier.
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Requires explicit confirmation before the handler runs.
    pub critical: bool,
    /// Visible to privileged requesters only.
    pub restricted: bool,
    /// Visible while the requester's onboarding is incomplete.
    pub onboarding: bool,
    /// Confirmation prompt with `{param}` placeholders.
    pub confirmation_template: Option<String>,
}

impl OperationSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
            critical: false,
            restricted: false,
            onboarding: false,
            confirmation_template: None,
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn onboarding(mut self) -> Self {
        self.onboarding = true;
        self
    }

    pub fn confirm_with(mut self, template: &str) -> Self {
        self.confirmation_template = Some(template.to_string());
        self
    }

    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json_schema(&self.params),
        }
    }

    /// Build the confirmation prompt for `arguments`.
    ///
    /// Each `{param}` is replaced by the argument value: strings verbatim,
    /// other values as JSON. Placeholders without an argument are left as is.
    /// Without a template the prompt names the operation and its arguments.
    pub fn render_confirmation(&self, arguments: &Value) -> String {
        let Some(template) = &self.confirmation_template else {
            let args = match arguments {
                Value::Object(map) if !map.is_empty() => format!(" with {arguments}"),
                _ => String::new(),
            };
            return format!("You asked to run `{}`{args}. Proceed?", self.name);
        };

        let mut prompt = template.clone();
        if let Value::Object(map) = arguments {
            for (key, value) in map {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                prompt = prompt.replace(&format!("{{{key}}}"), &rendered);
            }
        }
        prompt
    }

    /// Whether a requester with `access` may see this operation.
    pub fn visible_to(&self, access: &AccessContext) -> bool {
        if !access.onboarding_complete && !self.onboarding {
            return false;
        }
        !self.restricted || access.permission.is_privileged()
    }
}

/// Requester attributes that decide operation visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
    pub permission: PermissionLevel,
    pub onboarding_complete: bool,
}

impl AccessContext {
    pub fn new(permission: PermissionLevel, onboarding_complete: bool) -> Self {
        Self {
            permission,
            onboarding_complete,
        }
    }
}

/// An operation paired with its handler.
#[derive(Clone)]
pub struct DispatchEntry {
    pub spec: OperationSpec,
    pub handler: Arc<dyn OperationHandler>,
}

impl std::fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Collects operations and produces a [`DispatchTable`].
#[derive(Default)]
pub struct DispatchTableBuilder {
    entries: Vec<DispatchEntry>,
    force_critical: HashSet<String>,
}

impl DispatchTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, spec: OperationSpec, handler: Arc<dyn OperationHandler>) -> Self {
        self.entries.push(DispatchEntry { spec, handler });
        self
    }

    /// Mark `name` critical regardless of its declaration.
    pub fn force_critical(mut self, name: &str) -> Self {
        self.force_critical.insert(name.to_string());
        self
    }

    /// Fails on duplicate names and on critical overrides naming an
    /// operation that was never registered.
    pub fn build(self) -> Result<DispatchTable, HeraldError> {
        let mut entries = HashMap::with_capacity(self.entries.len());
        for mut entry in self.entries {
            if self.force_critical.contains(&entry.spec.name) {
                entry.spec.critical = true;
            }
            let name = entry.spec.name.clone();
            if entries.insert(name.clone(), entry).is_some() {
                return Err(HeraldError::Config(format!(
                    "operation `{name}` is registered more than once"
                )));
            }
        }

        if let Some(unknown) = self
            .force_critical
            .iter()
            .find(|name| !entries.contains_key(*name))
        {
            return Err(HeraldError::Config(format!(
                "cannot mark unknown operation `{unknown}` as critical"
            )));
        }

        Ok(DispatchTable { entries })
    }
}

/// Read-only operation registry.
#[derive(Debug)]
pub struct DispatchTable {
    entries: HashMap<String, DispatchEntry>,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::new()
    }

    pub fn lookup(&self, name: &str) -> Option<&DispatchEntry> {
        self.entries.get(name)
    }

    /// Unknown operations are not critical.
    pub fn is_critical(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.spec.critical)
    }

    /// Operations visible to `access`, sorted by name.
    pub fn available_for(&self, access: &AccessContext) -> Vec<&OperationSpec> {
        let mut specs: Vec<&OperationSpec> = self
            .entries
            .values()
            .map(|e| &e.spec)
            .filter(|spec| spec.visible_to(access))
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Classifier descriptors for the operations visible to `access`.
    pub fn descriptors_for(&self, access: &AccessContext) -> Vec<OperationDescriptor> {
        self.available_for(access)
            .into_iter()
            .map(OperationSpec::descriptor)
            .collect()
    }

    /// Validate `arguments` against the schema of `name`.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<Map<String, Value>, HeraldError> {
        let entry = self
            .lookup(name)
            .ok_or_else(|| HeraldError::UnknownOperation(name.to_string()))?;
        validate_arguments(name, &entry.spec.params, arguments)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use herald_test_utils::RecordingHandler;
    use serde_json::json;

    use super::*;
    use crate::schema::ParamKind;

    fn handler(name: &str) -> Arc<dyn OperationHandler> {
        Arc::new(RecordingHandler::ok(name, "done"))
    }

    fn table() -> DispatchTable {
        DispatchTable::builder()
            .register(
                OperationSpec::new("list_events", "List upcoming events"),
                handler("list_events"),
            )
            .register(
                OperationSpec::new("delete_cell", "Delete a cell")
                    .param(ParamSpec::required(
                        "cell_id",
                        ParamKind::Integer,
                        "Cell identifier",
                    ))
                    .critical()
                    .confirm_with("Delete cell {cell_id}?"),
                handler("delete_cell"),
            )
            .register(
                OperationSpec::new("audit_export", "Export the audit log").restricted(),
                handler("audit_export"),
            )
            .register(
                OperationSpec::new("complete_profile", "Finish onboarding")
                    .onboarding()
                    .param(ParamSpec::required("name", ParamKind::String, "Full name")),
                handler("complete_profile"),
            )
            .build()
            .expect("table builds")
    }

    fn names(specs: Vec<&OperationSpec>) -> Vec<&str> {
        specs.into_iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn lookup_and_criticality() {
        let t = table();
        assert!(t.lookup("delete_cell").is_some());
        assert!(t.lookup("nope").is_none());
        assert!(t.is_critical("delete_cell"));
        assert!(!t.is_critical("list_events"));
        assert!(!t.is_critical("nope"));
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn member_does_not_see_restricted_operations() {
        let t = table();
        let access = AccessContext::new(PermissionLevel::Member, true);
        assert_eq!(
            names(t.available_for(&access)),
            vec!["complete_profile", "delete_cell", "list_events"]
        );
        let leader = AccessContext::new(PermissionLevel::Leader, true);
        assert!(!names(t.available_for(&leader)).contains(&"audit_export"));
    }

    #[test]
    fn admin_sees_everything() {
        let t = table();
        let access = AccessContext::new(PermissionLevel::Admin, true);
        assert_eq!(t.available_for(&access).len(), 4);
    }

    #[test]
    fn onboarding_requesters_see_only_onboarding_operations() {
        let t = table();
        let access = AccessContext::new(PermissionLevel::Admin, false);
        assert_eq!(names(t.available_for(&access)), vec!["complete_profile"]);
    }

    #[test]
    fn descriptors_carry_schemas() {
        let t = table();
        let access = AccessContext::new(PermissionLevel::Member, true);
        let descriptors = t.descriptors_for(&access);
        let delete = descriptors
            .iter()
            .find(|d| d.name == "delete_cell")
            .expect("delete_cell descriptor");
        assert_eq!(delete.parameters["required"], json!(["cell_id"]));
    }

    #[test]
    fn validate_unknown_operation() {
        let err = table().validate("nope", &json!({})).unwrap_err();
        assert!(matches!(err, HeraldError::UnknownOperation(name) if name == "nope"));
    }

    #[test]
    fn validate_reports_missing_fields() {
        let err = table().validate("delete_cell", &json!({})).unwrap_err();
        assert!(matches!(err, HeraldError::Validation { missing, .. } if missing == ["cell_id"]));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = DispatchTable::builder()
            .register(OperationSpec::new("a", "first"), handler("a"))
            .register(OperationSpec::new("a", "second"), handler("a"))
            .build();
        assert!(matches!(result, Err(HeraldError::Config(msg)) if msg.contains("`a`")));
    }

    #[test]
    fn force_critical_overrides_declaration() {
        let t = DispatchTable::builder()
            .register(OperationSpec::new("send", "Send"), handler("send"))
            .force_critical("send")
            .build()
            .expect("table builds");
        assert!(t.is_critical("send"));
    }

    #[test]
    fn force_critical_on_unknown_name_fails() {
        let result = DispatchTable::builder()
            .register(OperationSpec::new("send", "Send"), handler("send"))
            .force_critical("sned")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn confirmation_prompt_substitutes_arguments() {
        let t = table();
        let spec = &t.lookup("delete_cell").expect("entry").spec;
        assert_eq!(
            spec.render_confirmation(&json!({"cell_id": 7})),
            "Delete cell 7?"
        );
        assert_eq!(spec.render_confirmation(&json!({})), "Delete cell {cell_id}?");
    }

    #[test]
    fn confirmation_prompt_without_template() {
        let spec = OperationSpec::new("archive_group", "Archive");
        assert_eq!(
            spec.render_confirmation(&json!({"group": "Jovens"})),
            "You asked to run `archive_group` with {\"group\":\"Jovens\"}. Proceed?"
        );
        assert_eq!(
            spec.render_confirmation(&Value::Null),
            "You asked to run `archive_group`. Proceed?"
        );
    }
}
