//! Turns raw sheet cells into users and category mappings.

use std::str::FromStr;

use engine::{
    CategoryMapping, EngineError, FlagColor, LedgerError, ResultEngine, ShareFraction, User,
    UserId,
};
use serde::Deserialize;
use serde_json::Value;

/// Body of `GET spreadsheets/{id}/values/{range}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

/// A tab whose first row is the header.
#[derive(Debug)]
pub(crate) struct Table {
    tab: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Table {
    pub(crate) fn new(tab: &str, range: ValueRange) -> ResultEngine<Self> {
        let mut lines = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect::<Vec<_>>());
        let Some(header) = lines.next() else {
            return Err(LedgerError::NotFound(format!("sheet tab \"{tab}\" is empty")).into());
        };
        Ok(Self {
            tab: tab.to_string(),
            header,
            rows: lines
                .filter(|row| row.iter().any(|cell| !cell.is_empty()))
                .collect(),
        })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|title| title.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str) -> ResultEngine<usize> {
        self.column(name).ok_or_else(|| {
            EngineError::RuleData(format!("sheet tab \"{}\" has no \"{name}\" column", self.tab))
        })
    }

    /// Rows paired with their 1-based sheet line (the header is line 1).
    fn rows(&self) -> impl Iterator<Item = (usize, Row<'_>)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, cells)| (index + 2, Row { cells }))
    }

    fn error(&self, line: usize, message: impl std::fmt::Display) -> EngineError {
        EngineError::RuleData(format!("sheet tab \"{}\" line {line}: {message}", self.tab))
    }
}

struct Row<'a> {
    cells: &'a [String],
}

impl Row<'_> {
    fn get(&self, column: Option<usize>) -> Option<&str> {
        column
            .and_then(|column| self.cells.get(column))
            .map(String::as_str)
            .filter(|cell| !cell.is_empty())
    }
}

pub(crate) fn truthy(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

fn parse_user_number(cell: &str) -> Option<UserId> {
    let cell = cell.trim();
    let number = cell.strip_suffix(".0").unwrap_or(cell).parse::<u32>().ok()?;
    (number >= 1).then_some(UserId(number))
}

pub(crate) fn parse_users(table: &Table) -> ResultEngine<Vec<User>> {
    let number = table.require("User Number")?;
    let name = table.require("Name")?;
    let share = table.require("Share Percentage")?;
    let budget_id = table.column("Budget ID");
    let budget_name = table.column("Budget Name");
    let excluded = table.column("Excluded Categories");
    let split_flag = table.column("Shared Flag");
    let share_flag = table.column("To Share Flag");
    let shared_account = table.column("Shared Account");

    let mut users = Vec::new();
    for (line, row) in table.rows() {
        let id = row
            .get(Some(number))
            .and_then(parse_user_number)
            .ok_or_else(|| table.error(line, "\"User Number\" must be a positive integer"))?;
        let user_name = row
            .get(Some(name))
            .ok_or_else(|| table.error(line, "missing \"Name\""))?;
        let fraction = row
            .get(Some(share))
            .ok_or_else(|| table.error(line, "missing \"Share Percentage\""))
            .and_then(|cell| ShareFraction::from_str(cell).map_err(|err| table.error(line, err)))?;

        let mut user = User::new(id, user_name, fraction);
        match (row.get(budget_id), row.get(budget_name)) {
            (Some(id), _) => user = user.budget_id(id),
            (None, Some(name)) => user = user.budget_name(name),
            (None, None) => user = user.budget_name(user_name),
        }
        if let Some(cell) = row.get(excluded) {
            for category in cell.split([',', ';']) {
                user = user.exclude(category);
            }
        }
        if let Some(cell) = row.get(split_flag) {
            let flag = cell.parse::<FlagColor>().map_err(|err| table.error(line, err))?;
            user = user.split_flag(flag);
        }
        if let Some(cell) = row.get(share_flag) {
            let flag = cell.parse::<FlagColor>().map_err(|err| table.error(line, err))?;
            user = user.share_flag(flag);
        }
        if let Some(cell) = row.get(shared_account) {
            user = user.shared_account(cell);
        }
        users.push(user);
    }
    Ok(users)
}

/// `User N` header -> `UserId(N)`.
fn user_column(title: &str) -> Option<UserId> {
    let rest = title.get(..5)?;
    if !rest.eq_ignore_ascii_case("user ") {
        return None;
    }
    parse_user_number(&title[5..])
}

pub(crate) fn parse_mappings(table: &Table) -> ResultEngine<Vec<CategoryMapping>> {
    let shared = table.require("Shared")?;
    let alias = table.column("Alias");
    let share = table.column("Share Percentage");
    let user_columns: Vec<(usize, UserId)> = table
        .header
        .iter()
        .enumerate()
        .filter_map(|(index, title)| user_column(title).map(|user| (index, user)))
        .collect();
    if user_columns.is_empty() {
        return Err(EngineError::RuleData(format!(
            "sheet tab \"{}\" has no \"User N\" columns",
            table.tab
        )));
    }

    let mut mappings = Vec::new();
    for (line, row) in table.rows() {
        let mut mapping = CategoryMapping::new(row.get(Some(shared)).is_some_and(truthy));
        if let Some(cell) = row.get(alias) {
            mapping = mapping.alias(cell);
        }
        for (column, user) in &user_columns {
            if let Some(cell) = row.get(Some(*column)) {
                mapping = mapping.category(*user, cell);
            }
        }
        if let Some(cell) = row.get(share) {
            let fraction = ShareFraction::from_str(cell).map_err(|err| table.error(line, err))?;
            mapping = mapping.share_override(fraction);
        }
        mappings.push(mapping);
    }
    Ok(mappings)
}
