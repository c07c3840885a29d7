//! Prompt identifiers and wording

pub const ID_COPY_TO_EMPTY: &str = "backend-migrate-copy-to-empty";
pub const ID_COPY_TO_EMPTY_MANAGED: &str = "backend-migrate-copy-to-empty-managed";
pub const ID_COPY_MANAGED_TO_EMPTY: &str = "backend-migrate-copy-managed-to-empty";
pub const ID_TO_BACKEND: &str = "backend-migrate-to-backend";
pub const ID_TO_MANAGED: &str = "backend-migrate-to-managed";
pub const ID_MULTI_TO_SINGLE: &str = "backend-migrate-multistate-to-single";
pub const ID_MULTI_TO_MULTI: &str = "backend-migrate-multistate-to-multistate";
pub const ID_NEW_STATE_NAME: &str = "new-state-name";
pub const ID_PREFIX_TO_UNIQUE: &str = "backend-migrate-prefix-to-unique";
pub const ID_MULTI_TO_UNIQUE: &str = "backend-migrate-multistate-to-unique";
pub const ID_MULTI_TO_UNIQUE_PATTERN: &str = "backend-migrate-multistate-to-unique-pattern";
pub const ID_SELECT_WORKSPACE: &str = "select-workspace";

pub const MIGRATION_COMPLETE: &str = "Migration complete! Your workspaces are as follows:";

pub fn copy_to_empty(source_type: &str, destination_type: &str) -> String {
    format!(
        "Pre-existing state was found in the previous {source_type:?} backend, and no state was found \
         in the newly configured {destination_type:?} backend. Do you want to copy this state to the new \
         {destination_type:?} backend? Enter \"yes\" to copy and \"no\" to start with an empty state."
    )
}

pub fn copy_to_empty_managed(source_type: &str) -> String {
    format!(
        "Pre-existing state was found in the previous {source_type:?} backend, and no state was found \
         in the managed destination. Do you want to copy this state to the managed destination? \
         Enter \"yes\" to copy and \"no\" to start with an empty state."
    )
}

pub fn copy_managed_to_empty(destination_type: &str) -> String {
    format!(
        "Pre-existing state was found in the managed source, and no state was found in the newly \
         configured {destination_type:?} backend. Do you want to copy this state to the new \
         {destination_type:?} backend? Enter \"yes\" to copy and \"no\" to start with an empty state."
    )
}

pub fn overwrite(source_type: &str, destination_type: &str, source_path: &str, destination_path: &str) -> String {
    format!(
        "Pre-existing state was found while migrating the previous {source_type:?} backend to the newly \
         configured {destination_type:?} backend. A non-empty state already exists in the new backend. \
         Both states have been saved to temporary files that are removed after this question is answered.\n\n\
         Previous (type {source_type:?}): {source_path}\n\
         New      (type {destination_type:?}): {destination_path}\n\n\
         Do you want to overwrite the state in the new backend with the previous state? Enter \"yes\" \
         to copy and \"no\" to keep the existing state in the {destination_type:?} backend."
    )
}

pub fn overwrite_managed(source_type: &str, source_path: &str, destination_path: &str) -> String {
    format!(
        "Pre-existing state was found while migrating the previous {source_type:?} backend to the managed \
         destination, which already holds a non-empty state. Both states have been saved to temporary \
         files that are removed after this question is answered.\n\n\
         Previous (type {source_type:?}): {source_path}\n\
         New      (managed): {destination_path}\n\n\
         Do you want to overwrite the managed state with the previous state? Enter \"yes\" to copy and \
         \"no\" to keep the existing managed state."
    )
}

pub fn copy_query(destination_type: &str) -> String {
    format!("Do you want to copy existing state to the new {destination_type:?} backend?")
}

pub fn multi_to_single(source_type: &str, destination_type: &str, workspace: &str) -> String {
    format!(
        "The existing {source_type:?} backend supports workspaces and you are using more than one. The \
         newly configured {destination_type:?} backend doesn't support workspaces. If you continue, your \
         current workspace {workspace:?} is copied to the default workspace in the new backend. Workspaces \
         in the source backend are not modified. To switch workspaces, back them up, or cancel \
         altogether, answer \"no\" and the migration is aborted."
    )
}

pub fn multi_to_managed_single(source_type: &str, workspace: &str) -> String {
    format!(
        "The previous {source_type:?} backend has multiple workspaces, but the managed destination is \
         configured for a single workspace ({workspace:?}). Continuing migrates only your current \
         workspace. To migrate every workspace, cancel and configure the destination for unique \
         workspace names instead.\n\nEnter \"yes\" to proceed or \"no\" to cancel."
    )
}

pub fn managed_multi_to_single(destination_type: &str, workspace: &str) -> String {
    format!(
        "The managed source holds multiple workspaces, but the newly configured {destination_type:?} \
         backend doesn't support workspaces. Continuing copies only the currently selected workspace \
         ({workspace:?}) to the default workspace of the new backend. Workspaces in the managed source \
         are not modified.\n\nEnter \"yes\" to proceed or \"no\" to cancel."
    )
}

pub fn multi_to_single_query() -> String {
    "Do you want to copy only your current workspace?".to_string()
}

pub fn multi_to_multi(source_type: &str, destination_type: &str) -> String {
    format!(
        "Both the existing {source_type:?} backend and the newly configured {destination_type:?} backend \
         support workspaces. Every workspace is copied under the same name. THIS WILL OVERWRITE any \
         conflicting states in the destination.\n\n\
         To migrate only selected workspaces, pull and push those states manually.\n\n\
         Answer \"yes\" to migrate all states, or \"no\" to abort."
    )
}

pub fn managed_multi_to_multi(destination_type: &str) -> String {
    format!(
        "Both the managed source and the newly configured {destination_type:?} backend support \
         workspaces. Every workspace is copied under the same name. THIS WILL OVERWRITE any conflicting \
         states in the destination.\n\n\
         To migrate only selected workspaces, pull and push those states manually.\n\n\
         Answer \"yes\" to migrate all states, or \"no\" to abort."
    )
}

pub fn multi_to_multi_query(destination_type: &str) -> String {
    format!("Do you want to migrate all workspaces to {destination_type:?}?")
}

pub fn new_workspace_name_query(destination_type: &str, managed: bool) -> String {
    if managed {
        "The managed destination requires every workspace to have an explicit name.".to_string()
    } else {
        format!("The {destination_type:?} backend configuration only allows named workspaces!")
    }
}

pub fn new_workspace_name() -> String {
    "Please provide a new workspace name (e.g. dev, test) that will be used to migrate the existing \
     default workspace."
        .to_string()
}

pub fn prefix_to_unique() -> String {
    "The source backend already names its workspaces with a pattern. Workspaces are migrated using \
     that same pattern, so their names in the destination match the fully qualified names the source \
     was already using.\n\nEnter \"yes\" to proceed or \"no\" to cancel."
        .to_string()
}

pub fn rename_choice(source_type: &str) -> String {
    format!(
        "Workspace names in the destination must be unique beyond this configuration. A typical \
         strategy is <COMPONENT>-<ENVIRONMENT>-<REGION> (e.g. networking-prod-us-east).\n\n\
         When migrating existing workspaces from the {source_type:?} backend, would you like to rename \
         them? Enter 1 or 2.\n\n\
         1. Yes, rename all workspaces according to a pattern I will provide.\n\
         2. No, migrate them as currently named."
    )
}

pub fn rename_choice_query() -> String {
    "Would you like to rename your workspaces?".to_string()
}

pub fn rename_pattern() -> String {
    "Enter a pattern with an asterisk (*) to rename all workspaces based on their previous names. The \
     asterisk stands for the current workspace name.\n\n\
     For example, with a workspace named 'prod', the pattern 'app-*' yields 'app-prod'; 'app-*-region1' \
     yields 'app-prod-region1'."
        .to_string()
}

pub fn rename_pattern_query() -> String {
    "How would you like to rename your workspaces?".to_string()
}

pub fn select_workspace(listing: &str) -> String {
    format!(
        "The previously selected workspace does not exist in the destination. This is expected when it \
         held no state. Please enter a number to select a workspace:\n\n{listing}"
    )
}

/// Workspace listing with the selected one marked by `*`
pub fn workspace_listing(workspaces: &[String], selected: &str) -> String {
    let mut out = String::new();
    for name in workspaces {
        out.push_str(if name == selected { "* " } else { "  " });
        out.push_str(name);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_marks_selected() {
        let listing = workspace_listing(&["a".to_string(), "b".to_string()], "b");
        assert_eq!(listing, "  a\n* b\n");
    }

    #[test]
    fn test_overwrite_mentions_both_paths() {
        let text = overwrite("local", "sqlite", "/tmp/x/1-local.json", "/tmp/x/2-sqlite.json");
        assert!(text.contains("/tmp/x/1-local.json"));
        assert!(text.contains("/tmp/x/2-sqlite.json"));
    }
}
