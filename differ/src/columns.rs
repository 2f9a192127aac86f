//! Column-level comparison
//!
//! Structural equality over (name, type, nullable, default, primary,
//! unique, FK-triple). The auto-increment flag is excluded: introspection
//! and parsing canonicalize it from different spellings, and a mismatch
//! there alone never warrants DDL.

use model::{Column, ModifiedColumn};

/// Compare a current and a desired column. Returns `None` when they are
/// structurally equal, otherwise the modification record with a
/// human-readable change list.
#[must_use]
pub fn compare_columns(current: &Column, desired: &Column) -> Option<ModifiedColumn> {
    let mut changes = Vec::new();

    if current.tpe != desired.tpe {
        changes.push(format!(
            "type changed from {} to {}",
            current.tpe, desired.tpe
        ));
    }
    if current.nullable != desired.nullable {
        if desired.nullable {
            changes.push("made nullable".to_string());
        } else {
            changes.push("made not nullable".to_string());
        }
    }
    if current.default != desired.default {
        changes.push(format!(
            "default changed from {} to {}",
            display_default(&current.default),
            display_default(&desired.default)
        ));
    }
    if current.is_primary != desired.is_primary {
        if desired.is_primary {
            changes.push("made primary key".to_string());
        } else {
            changes.push("no longer primary key".to_string());
        }
    }
    if current.is_unique != desired.is_unique {
        if desired.is_unique {
            changes.push("made unique".to_string());
        } else {
            changes.push("no longer unique".to_string());
        }
    }

    let current_fk = (
        current.foreign_key_table.as_str(),
        current.foreign_key_column.as_str(),
    );
    let desired_fk = (
        desired.foreign_key_table.as_str(),
        desired.foreign_key_column.as_str(),
    );
    if current_fk != desired_fk {
        if desired.has_foreign_key() {
            changes.push(format!(
                "added foreign key reference to {}({})",
                desired.foreign_key_table, desired.foreign_key_column
            ));
        } else {
            changes.push(format!(
                "removed foreign key reference to {}({})",
                current.foreign_key_table, current.foreign_key_column
            ));
        }
    } else if current.on_delete_action != desired.on_delete_action {
        changes.push(format!(
            "foreign key action changed from {} to {}",
            display_action(current.on_delete_action.as_str()),
            display_action(desired.on_delete_action.as_str())
        ));
    }

    if changes.is_empty() {
        return None;
    }
    Some(ModifiedColumn {
        name: desired.name.clone(),
        old_type: current.tpe.clone(),
        new_type: desired.tpe.clone(),
        changes,
    })
}

fn display_default(default: &str) -> &str {
    if default.is_empty() {
        "(none)"
    } else {
        default
    }
}

fn display_action(action: &str) -> &str {
    if action.is_empty() {
        "(none)"
    } else {
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::OnDeleteAction;

    #[test]
    fn equal_columns_produce_no_modification() {
        let col = Column::new("email", "VARCHAR(255)");
        assert!(compare_columns(&col, &col.clone()).is_none());
    }

    #[test]
    fn auto_increment_alone_is_not_a_change() {
        let current = Column::new("id", "INTEGER");
        let mut desired = current.clone();
        desired.is_auto_increment = true;
        assert!(compare_columns(&current, &desired).is_none());
    }

    #[test]
    fn type_and_nullability_changes_are_described() {
        let current = Column::new("age", "INTEGER");
        let mut desired = Column::new("age", "BIGINT");
        desired.nullable = false;

        let modified = compare_columns(&current, &desired).unwrap();
        assert_eq!(modified.old_type, "INTEGER");
        assert_eq!(modified.new_type, "BIGINT");
        assert_eq!(
            modified.changes,
            vec!["type changed from INTEGER to BIGINT", "made not nullable"]
        );
    }

    #[test]
    fn default_change_is_described() {
        let mut current = Column::new("status", "TEXT");
        current.default = "'new'".to_string();
        let mut desired = current.clone();
        desired.default = "'open'".to_string();

        let modified = compare_columns(&current, &desired).unwrap();
        assert_eq!(modified.changes, vec!["default changed from 'new' to 'open'"]);
    }

    #[test]
    fn added_foreign_key_is_described() {
        let current = Column::new("user_id", "INTEGER");
        let mut desired = current.clone();
        desired.foreign_key_table = "users".to_string();
        desired.foreign_key_column = "id".to_string();

        let modified = compare_columns(&current, &desired).unwrap();
        assert_eq!(
            modified.changes,
            vec!["added foreign key reference to users(id)"]
        );
    }

    #[test]
    fn action_change_on_same_reference_is_described() {
        let mut current = Column::new("user_id", "INTEGER");
        current.foreign_key_table = "users".to_string();
        current.foreign_key_column = "id".to_string();
        current.on_delete_action = OnDeleteAction::Cascade;
        let mut desired = current.clone();
        desired.on_delete_action = OnDeleteAction::SetNull;

        let modified = compare_columns(&current, &desired).unwrap();
        assert_eq!(
            modified.changes,
            vec!["foreign key action changed from CASCADE to SET NULL"]
        );
    }
}
