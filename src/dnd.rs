//! Drag-and-drop seam between the board view and [`BoardSyncEngine`].
//!
//! A [`DragSource`] yields what is being carried; a [`DropTarget`] decides
//! whether it takes it and turns the drop into a move.

use std::sync::Arc;

use async_trait::async_trait;

use crate::board::filter::{column_tickets, AssigneeFilter};
use crate::board::{BoardSyncEngine, BoardView, MoveOutcome};
use crate::error::Result;
use crate::model::board::{Column, Ticket};

/// A ticket lifted out of the column it was shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub ticket: Ticket,
    pub column: Column,
}

pub trait DragSource {
    fn drag_payload(&self) -> Option<DragPayload>;
}

#[async_trait]
pub trait DropTarget: Send + Sync {
    fn accepts(&self, payload: &DragPayload) -> bool;
    async fn drop_payload(&self, payload: DragPayload) -> Result<MoveOutcome>;
}

/// The selected card in the board view, as filtered on screen.
pub struct TicketCursor<'a> {
    pub view: &'a BoardView,
    pub filter: &'a AssigneeFilter,
    pub column: usize,
    pub row: usize,
}

impl DragSource for TicketCursor<'_> {
    fn drag_payload(&self) -> Option<DragPayload> {
        let column = self.view.columns.get(self.column)?;
        let ticket = column_tickets(&self.view.tickets, column, self.filter)
            .get(self.row)
            .map(|t| (*t).clone())?;
        Some(DragPayload {
            ticket,
            column: column.clone(),
        })
    }
}

pub struct ColumnTarget {
    engine: Arc<BoardSyncEngine>,
    column: Column,
}

impl ColumnTarget {
    pub fn new(engine: Arc<BoardSyncEngine>, column: Column) -> Self {
        Self { engine, column }
    }
}

#[async_trait]
impl DropTarget for ColumnTarget {
    /// Disabled while the carried ticket still has a move in flight.
    fn accepts(&self, payload: &DragPayload) -> bool {
        payload.column != self.column && !self.engine.is_move_pending(&payload.ticket.key)
    }

    async fn drop_payload(&self, payload: DragPayload) -> Result<MoveOutcome> {
        if payload.column == self.column {
            return Ok(MoveOutcome::AlreadyInPlace);
        }
        self.engine.move_ticket(&payload.ticket, &self.column).await
    }
}
