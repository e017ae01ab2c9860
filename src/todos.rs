//! Todo list stored under the `todos` key. Items are addressed by their
//! zero-based position in the list.

use crate::models::TodoItem;
use crate::persistence::{DatabaseError, StoreExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TodoError {
    #[error("Todo text must not be empty")]
    EmptyText,
    #[error("No todo at position {position} (list has {len})")]
    IndexOutOfRange { position: usize, len: usize },
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub fn list<S: StoreExt + ?Sized>(store: &S) -> Result<Vec<TodoItem>, TodoError> {
    Ok(store.load_todos()?)
}

/// Appends a new, open todo. Surrounding whitespace is trimmed.
pub fn add<S: StoreExt + ?Sized>(store: &S, text: &str) -> Result<TodoItem, TodoError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TodoError::EmptyText);
    }

    let mut todos = store.load_todos()?;
    let item = TodoItem::new(text);
    todos.push(item.clone());
    store.save_todos(&todos)?;
    Ok(item)
}

/// Flips the completion flag and returns the updated item.
pub fn toggle<S: StoreExt + ?Sized>(store: &S, index: usize) -> Result<TodoItem, TodoError> {
    let mut todos = store.load_todos()?;
    let len = todos.len();
    let item = todos.get_mut(index).ok_or(TodoError::IndexOutOfRange {
        position: index + 1,
        len,
    })?;
    item.completed = !item.completed;
    let item = item.clone();
    store.save_todos(&todos)?;
    Ok(item)
}

pub fn remove<S: StoreExt + ?Sized>(store: &S, index: usize) -> Result<TodoItem, TodoError> {
    let mut todos = store.load_todos()?;
    if index >= todos.len() {
        return Err(TodoError::IndexOutOfRange {
            position: index + 1,
            len: todos.len(),
        });
    }
    let item = todos.remove(index);
    store.save_todos(&todos)?;
    Ok(item)
}

/// Formats a todo the way the list views show it, e.g. `2. [x] Call Bob`.
pub fn format_item(index: usize, item: &TodoItem) -> String {
    let mark = if item.completed { 'x' } else { ' ' };
    format!("{}. [{}] {}", index + 1, mark, item.text)
}
