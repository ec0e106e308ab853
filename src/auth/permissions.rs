//! Resource/action permissions held by organization roles.
//!
//! A role stores a list of [`Permission`] values as JSON. Authorization is an
//! OR over that list: a single matching permission grants the action. Some
//! permissions carry [`Condition`]s that can only be decided with facts about
//! the concrete record being touched, supplied through [`PermissionContext`].

use serde::{Deserialize, Serialize};

use super::types::ProjectRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    #[serde(rename = "*")]
    Any,
    Organization,
    Project,
    Task,
    User,
    Role,
    File,
    Comment,
    Meeting,
    Risk,
    Issue,
    Board,
    Report,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Any => "*",
            Resource::Organization => "organization",
            Resource::Project => "project",
            Resource::Task => "task",
            Resource::User => "user",
            Resource::Role => "role",
            Resource::File => "file",
            Resource::Comment => "comment",
            Resource::Meeting => "meeting",
            Resource::Risk => "risk",
            Resource::Issue => "issue",
            Resource::Board => "board",
            Resource::Report => "report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(rename = "*")]
    Any,
    Create,
    Read,
    Update,
    Delete,
    Manage,
    Invite,
    Assign,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Any => "*",
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
            Action::Invite => "invite",
            Action::Assign => "assign",
        }
    }
}

/// Record-level restriction on a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Condition {
    /// The caller is assigned to the task being acted on.
    AssignedToSelf,
    /// The caller's role in the enclosing project is one of the listed roles.
    InProjectRole(Vec<ProjectRole>),
}

impl Condition {
    fn is_satisfied(&self, ctx: &PermissionContext) -> bool {
        match self {
            Condition::AssignedToSelf => ctx.assigned_to_self == Some(true),
            Condition::InProjectRole(roles) => ctx
                .project_role
                .is_some_and(|role| roles.contains(&role)),
        }
    }
}

/// Facts about the target record. A fact left as `None` satisfies no
/// condition that depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionContext {
    pub assigned_to_self: Option<bool>,
    pub project_role: Option<ProjectRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Permission {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self {
            resource,
            action,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    fn covers(&self, resource: Resource, action: Action) -> bool {
        (self.resource == resource || self.resource == Resource::Any)
            && (self.action == action || self.action == Action::Any)
    }

    fn conditions_hold(&self, ctx: Option<&PermissionContext>) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match ctx {
            Some(ctx) => self.conditions.iter().all(|c| c.is_satisfied(ctx)),
            None => false,
        }
    }

    /// `resource:action`, or `None` for conditional permissions.
    pub fn to_permission_string(&self) -> Option<String> {
        self.conditions
            .is_empty()
            .then(|| format!("{}:{}", self.resource.as_str(), self.action.as_str()))
    }
}

pub fn has_permission(
    held: &[Permission],
    resource: Resource,
    action: Action,
    ctx: Option<&PermissionContext>,
) -> bool {
    held.iter()
        .any(|permission| permission.covers(resource, action) && permission.conditions_hold(ctx))
}

/// Flattens unconditional permissions into the strings carried by access
/// tokens.
pub fn permission_strings(held: &[Permission]) -> Vec<String> {
    let mut out: Vec<String> = held
        .iter()
        .filter_map(Permission::to_permission_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

pub const UNIVERSAL_PERMISSION: &str = "*:*";

/// Whether a set of permission strings grants `required`. Besides the exact
/// string, `*` and `*:*` grant everything, `resource:*` grants every action
/// on that resource, and `*:action` grants that action on every resource.
pub fn permission_string_granted(held: &[String], required: &str) -> bool {
    let (resource, action) = required.split_once(':').unwrap_or((required, ""));

    held.iter().any(|p| {
        if p == required || p == UNIVERSAL_PERMISSION || p == "*" {
            return true;
        }
        match p.split_once(':') {
            Some((r, "*")) => r == resource,
            Some(("*", a)) => a == action,
            _ => false,
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRole {
    OrganizationAdmin,
    ProjectManager,
    TeamMember,
    Viewer,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::OrganizationAdmin => "organization_admin",
            SystemRole::ProjectManager => "project_manager",
            SystemRole::TeamMember => "team_member",
            SystemRole::Viewer => "viewer",
        }
    }

    pub fn permissions(&self) -> Vec<Permission> {
        use Action as A;
        use Resource as R;

        let p = Permission::new;
        match self {
            SystemRole::OrganizationAdmin => vec![p(R::Any, A::Any)],
            SystemRole::ProjectManager => vec![
                p(R::Project, A::Any),
                p(R::Task, A::Any),
                p(R::User, A::Read),
                p(R::User, A::Invite),
                p(R::File, A::Any),
                p(R::Comment, A::Any),
                p(R::Meeting, A::Any),
                p(R::Risk, A::Any),
                p(R::Issue, A::Any),
                p(R::Board, A::Any),
                p(R::Report, A::Read),
            ],
            SystemRole::TeamMember => vec![
                p(R::Project, A::Read),
                p(R::Task, A::Any).with_condition(Condition::AssignedToSelf),
                p(R::Task, A::Read),
                p(R::User, A::Read),
                p(R::File, A::Read),
                p(R::File, A::Create),
                p(R::Comment, A::Any),
                p(R::Meeting, A::Read),
                p(R::Risk, A::Read),
                p(R::Issue, A::Read),
                p(R::Issue, A::Create),
                p(R::Board, A::Read),
            ],
            SystemRole::Viewer => vec![
                p(R::Project, A::Read),
                p(R::Task, A::Read),
                p(R::User, A::Read),
                p(R::File, A::Read),
                p(R::Comment, A::Read),
                p(R::Meeting, A::Read),
                p(R::Risk, A::Read),
                p(R::Issue, A::Read),
                p(R::Board, A::Read),
                p(R::Report, A::Read),
            ],
        }
    }
}

impl TryFrom<&str> for SystemRole {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "organization_admin" => Ok(SystemRole::OrganizationAdmin),
            "project_manager" => Ok(SystemRole::ProjectManager),
            "team_member" => Ok(SystemRole::TeamMember),
            "viewer" => Ok(SystemRole::Viewer),
            _ => Err(()),
        }
    }
}

/// Bundle for a predefined role name; unknown names get nothing.
pub fn system_role_permissions(name: &str) -> Vec<Permission> {
    SystemRole::try_from(name)
        .map(|role| role.permissions())
        .unwrap_or_default()
}
