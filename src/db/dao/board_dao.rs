use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, Order, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::db::entities::{
    board, board_column,
    prelude::{Board, BoardColumn},
};

/// Columns every new Kanban board starts with, left to right.
pub const DEFAULT_COLUMNS: [(&str, &str); 4] = [
    ("To Do", "#6B7280"),
    ("In Progress", "#3B82F6"),
    ("Review", "#F59E0B"),
    ("Done", "#10B981"),
];

#[derive(Clone)]
pub struct BoardDao {
    db: DatabaseConnection,
}

impl DaoBase for BoardDao {
    type Entity = Board;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[derive(Clone)]
pub struct BoardColumnDao {
    db: DatabaseConnection,
}

impl DaoBase for BoardColumnDao {
    type Entity = BoardColumn;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl BoardDao {
    /// Inserts a Kanban board with the default columns.
    pub async fn create_default_with<C>(
        conn: &C,
        project_id: Uuid,
    ) -> DaoResult<(board::Model, Vec<board_column::Model>)>
    where
        C: ConnectionTrait + Sync,
    {
        let board = Self::create_with(
            conn,
            board::ActiveModel {
                project_id: Set(project_id),
                name: Set("Main Board".to_string()),
                kind: Set(board::KIND_KANBAN.to_string()),
                position: Set(0),
                ..Default::default()
            },
        )
        .await?;

        let mut columns = Vec::with_capacity(DEFAULT_COLUMNS.len());
        for (position, (name, color)) in DEFAULT_COLUMNS.iter().enumerate() {
            let column = BoardColumnDao::create_with(
                conn,
                board_column::ActiveModel {
                    board_id: Set(board.id),
                    name: Set(name.to_string()),
                    color: Set(Some(color.to_string())),
                    position: Set(position as i32),
                    ..Default::default()
                },
            )
            .await?;
            columns.push(column);
        }

        Ok((board, columns))
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> DaoResult<Vec<board::Model>> {
        self.find_all(move |query| {
            query
                .filter(board::Column::ProjectId.eq(project_id))
                .order_by(board::Column::Position, Order::Asc)
        })
        .await
    }
}

impl BoardColumnDao {
    pub async fn list_for_boards(&self, board_ids: Vec<Uuid>) -> DaoResult<Vec<board_column::Model>> {
        if board_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(move |query| {
            query
                .filter(board_column::Column::BoardId.is_in(board_ids))
                .order_by(board_column::Column::Position, Order::Asc)
        })
        .await
    }
}
