use sea_orm::DatabaseConnection;

use super::{
    BoardColumnDao, BoardDao, CommentDao, DaoBase, MembershipDao, OrganizationDao, ProjectDao,
    ProjectMemberDao, RefreshTokenDao, RoleDao, TaskAssignmentDao, TaskDao, UserDao,
    UserPasswordDao,
};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn user(&self) -> UserDao {
        DaoBase::new(&self.db)
    }

    pub fn user_password(&self) -> UserPasswordDao {
        DaoBase::new(&self.db)
    }

    pub fn organization(&self) -> OrganizationDao {
        DaoBase::new(&self.db)
    }

    pub fn role(&self) -> RoleDao {
        DaoBase::new(&self.db)
    }

    pub fn membership(&self) -> MembershipDao {
        DaoBase::new(&self.db)
    }

    pub fn refresh_token(&self) -> RefreshTokenDao {
        DaoBase::new(&self.db)
    }

    pub fn project(&self) -> ProjectDao {
        DaoBase::new(&self.db)
    }

    pub fn project_member(&self) -> ProjectMemberDao {
        DaoBase::new(&self.db)
    }

    pub fn board(&self) -> BoardDao {
        DaoBase::new(&self.db)
    }

    pub fn board_column(&self) -> BoardColumnDao {
        DaoBase::new(&self.db)
    }

    pub fn task(&self) -> TaskDao {
        DaoBase::new(&self.db)
    }

    pub fn task_assignment(&self) -> TaskAssignmentDao {
        DaoBase::new(&self.db)
    }

    pub fn comment(&self) -> CommentDao {
        DaoBase::new(&self.db)
    }
}
