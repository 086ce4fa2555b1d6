//! The process table: one row per (host, process), one column per attribute.

use ratatui::{
    layout::{Constraint, Flex, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use serde_json::{json, Map, Value};

use super::common::format_value;
use super::{View, ViewContext};
use crate::data::labels::{short_host, short_process};
use crate::data::{Labels, SeriesKey, Severity, SeverityRule, Store};

const HOST_WIDTH: u16 = 12;
const PROCESS_WIDTH: u16 = 14;
const CELL_WIDTH: u16 = 9;
const SPACING: u16 = 1;

/// One attribute cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardCell {
    pub attr: String,
    /// Latest value, `None` while the series has no points.
    pub value: Option<f64>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub host: String,
    pub process: String,
    /// One cell per table column, in column order.
    pub cells: Vec<DashboardCell>,
}

/// Snapshot of the store laid out for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardTable {
    /// Attribute names in first-seen order.
    pub columns: Vec<String>,
    /// Column headers, parallel to `columns`.
    pub headers: Vec<String>,
    pub rows: Vec<DashboardRow>,
    /// Points held by the store when the table was built.
    pub points: usize,
}

impl DashboardTable {
    /// Series behind the cell at (`row`, `col`).
    pub fn key_at(&self, row: usize, col: usize) -> Option<SeriesKey> {
        let row = self.rows.get(row)?;
        let attr = self.columns.get(col)?;
        Some(SeriesKey::new(&row.host, &row.process, attr))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// JSON export: columns, rows keyed by attribute, and the point count.
    pub fn to_json(&self) -> Value {
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let cells: Map<String, Value> = row
                    .cells
                    .iter()
                    .map(|cell| {
                        (
                            cell.attr.clone(),
                            json!({ "value": cell.value, "severity": cell.severity }),
                        )
                    })
                    .collect();
                json!({ "host": row.host, "process": row.process, "cells": cells })
            })
            .collect();

        json!({
            "columns": self.columns,
            "rows": rows,
            "points": self.points,
        })
    }
}

/// Where a click on the table landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableHit {
    /// Host or process name of a row.
    Row(usize),
    /// An attribute cell.
    Cell(usize, usize),
}

/// Visible window of the table for a given area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableGeometry {
    inner: Rect,
    row_offset: usize,
    visible_rows: usize,
    col_offset: usize,
    visible_cols: usize,
}

/// Dashboard state: the last built table and the selected cell.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    table: DashboardTable,
    selected_row: usize,
    selected_col: usize,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full rebuild of the table from the store.
    ///
    /// Rows follow store order; every attribute ever seen becomes a column,
    /// blank where a process never reported it.
    pub fn build(store: &Store, rule: &dyn SeverityRule, labels: &Labels) -> DashboardTable {
        let columns = store.attribute_names().to_vec();
        let headers = columns
            .iter()
            .map(|attr| labels.column(attr).to_string())
            .collect();

        let mut rows = Vec::new();
        for host in store.hosts() {
            for process in host.processes() {
                let cells = columns
                    .iter()
                    .map(|attr| {
                        let value = process
                            .series(attr)
                            .and_then(|s| s.latest_value())
                            .filter(|v| !v.is_nan());
                        DashboardCell {
                            attr: attr.clone(),
                            value,
                            severity: rule.classify(attr, value),
                        }
                    })
                    .collect();
                rows.push(DashboardRow {
                    host: host.name().to_string(),
                    process: process.name().to_string(),
                    cells,
                });
            }
        }

        DashboardTable {
            columns,
            headers,
            rows,
            points: store.point_count(),
        }
    }

    /// Rebuild from the store and keep the selection in range.
    pub fn refresh(&mut self, store: &Store, rule: &dyn SeverityRule, labels: &Labels) {
        self.table = Self::build(store, rule, labels);
        self.clamp_selection();
    }

    pub fn table(&self) -> &DashboardTable {
        &self.table
    }

    /// Selected (row, column).
    pub fn selected(&self) -> (usize, usize) {
        (self.selected_row, self.selected_col)
    }

    pub fn selected_key(&self) -> Option<SeriesKey> {
        self.table.key_at(self.selected_row, self.selected_col)
    }

    pub fn select(&mut self, row: usize, col: usize) {
        self.selected_row = row;
        self.selected_col = col;
        self.clamp_selection();
    }

    /// Move the selection by whole rows and columns, stopping at the edges.
    pub fn move_selection(&mut self, rows: isize, cols: isize) {
        self.selected_row = self.selected_row.saturating_add_signed(rows);
        self.selected_col = self.selected_col.saturating_add_signed(cols);
        self.clamp_selection();
    }

    pub fn select_first_row(&mut self) {
        self.selected_row = 0;
    }

    pub fn select_last_row(&mut self) {
        self.selected_row = self.table.rows.len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        self.selected_row = self
            .selected_row
            .min(self.table.rows.len().saturating_sub(1));
        self.selected_col = self
            .selected_col
            .min(self.table.columns.len().saturating_sub(1));
    }

    fn geometry(&self, area: Rect) -> TableGeometry {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let visible_rows = inner.height.saturating_sub(1) as usize;
        let fixed = HOST_WIDTH + SPACING + PROCESS_WIDTH;
        let visible_cols = (inner.width.saturating_sub(fixed) / (SPACING + CELL_WIDTH)) as usize;

        TableGeometry {
            inner,
            row_offset: scroll_offset(self.selected_row, visible_rows),
            visible_rows,
            col_offset: scroll_offset(self.selected_col, visible_cols),
            visible_cols,
        }
    }

    /// Map a terminal position to the row or cell drawn there when the
    /// table is rendered into `area`.
    pub fn hit_test(&self, area: Rect, x: u16, y: u16) -> Option<TableHit> {
        let geo = self.geometry(area);
        let inner = geo.inner;
        if x < inner.x || x >= inner.right() || y <= inner.y || y >= inner.bottom() {
            return None;
        }

        let row = (y - inner.y - 1) as usize + geo.row_offset;
        if row >= self.table.rows.len() {
            return None;
        }

        let dx = x - inner.x;
        let fixed = HOST_WIDTH + SPACING + PROCESS_WIDTH;
        if dx < fixed {
            return Some(TableHit::Row(row));
        }

        let slot = dx - fixed;
        if slot % (SPACING + CELL_WIDTH) < SPACING {
            return None;
        }
        let visible = (slot / (SPACING + CELL_WIDTH)) as usize;
        let col = visible + geo.col_offset;
        if visible >= geo.visible_cols || col >= self.table.columns.len() {
            return None;
        }
        Some(TableHit::Cell(row, col))
    }
}

fn scroll_offset(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        0
    } else {
        selected.saturating_sub(visible - 1)
    }
}

impl View for DashboardView {
    fn render(&self, frame: &mut Frame, area: Rect, ctx: &ViewContext<'_>) {
        let theme = ctx.theme;
        let border = if ctx.focused { theme.highlight } else { theme.border };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(border));

        if self.table.is_empty() {
            let waiting = Paragraph::new(" Waiting for data...")
                .style(Style::default().add_modifier(Modifier::DIM))
                .block(block.title(" Processes "));
            frame.render_widget(waiting, area);
            return;
        }

        let geo = self.geometry(area);
        let cols = geo.col_offset
            ..(geo.col_offset + geo.visible_cols).min(self.table.columns.len());

        let mut header = vec![Cell::from("host"), Cell::from("process")];
        header.extend(self.table.headers[cols.clone()].iter().map(|h| Cell::from(h.as_str())));
        let header = Row::new(header).height(1).style(theme.header);

        let rows: Vec<Row> = self
            .table
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let mut cells = vec![
                    Cell::from(short_host(&row.host)),
                    Cell::from(short_process(&row.process)),
                ];
                cells.extend(row.cells[cols.clone()].iter().enumerate().map(|(i, cell)| {
                    let text = cell.value.map(format_value).unwrap_or_default();
                    let mut style = theme.severity_style(cell.severity);
                    if r == self.selected_row && cols.start + i == self.selected_col {
                        style = style.patch(theme.selected_cell);
                    }
                    Cell::from(text).style(style)
                }));
                Row::new(cells)
            })
            .collect();

        let mut widths = vec![
            Constraint::Length(HOST_WIDTH),
            Constraint::Length(PROCESS_WIDTH),
        ];
        widths.extend(std::iter::repeat(Constraint::Length(CELL_WIDTH)).take(cols.len()));

        let title = format!(
            " Processes ({}) [{}/{}] cols {}-{}/{} ",
            self.table.rows.len(),
            self.selected_row + 1,
            self.table.rows.len(),
            cols.start + 1,
            cols.end,
            self.table.columns.len(),
        );

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(SPACING)
            .flex(Flex::Start)
            .block(block.title(title))
            .row_highlight_style(theme.selected);

        let mut state = TableState::default()
            .with_offset(geo.row_offset)
            .with_selected(Some(self.selected_row));

        frame.render_stateful_widget(table, area, &mut state);
    }
}
