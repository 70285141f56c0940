//! Undo/redo history for structural document edits
//!
//! Every structural change is a `Mutation`: an atomic value that can apply
//! itself to a document and revert exactly that effect. The engine keeps two
//! stacks. Performing a new mutation clears the redo stack; undo and redo
//! move a mutation between the stacks, reverting or re-applying it.

use crate::config::EditorConfig;
use crate::document::MapDocument;
use crate::edit::logger::VerbosityLevel;
use crate::Result;

/// An atomic, reversible structural edit
///
/// Mutations hold only durable ids and captured entity values, never
/// borrowed document state. `revert` must undo exactly what the last
/// `apply` did, including any integrity side effects.
pub trait Mutation {
    /// Apply (or re-apply) the edit
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()>;

    /// Undo the last `apply`
    fn revert(&mut self, doc: &mut MapDocument) -> Result<()>;

    /// Human-readable label for history listings
    fn describe(&self) -> String;
}

/// The two history stacks
///
/// Most recent entries sit at the end of each vector.
#[derive(Default)]
pub struct MutationEngine {
    undo: Vec<Box<dyn Mutation>>,
    redo: Vec<Box<dyn Mutation>>,
    limit: Option<usize>,
}

impl MutationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that drops its oldest undo entries beyond `limit`
    pub fn with_limit(limit: Option<usize>) -> Self {
        MutationEngine {
            limit,
            ..Self::default()
        }
    }

    /// Engine sized by the editor config's `history_limit`
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::with_limit(config.history_limit)
    }

    /// Apply a new mutation and record it
    ///
    /// A mutation whose `apply` fails is not recorded and the redo stack is
    /// left untouched.
    pub fn perform(&mut self, doc: &mut MapDocument, mut mutation: Box<dyn Mutation>) -> Result<()> {
        mutation.apply(doc)?;
        doc.logger.categorized(
            VerbosityLevel::Normal,
            "history",
            &format!("Do: {}", mutation.describe()),
        );
        self.undo.push(mutation);
        self.redo.clear();

        if let Some(limit) = self.limit {
            let excess = self.undo.len().saturating_sub(limit);
            if excess > 0 {
                self.undo.drain(..excess);
            }
        }
        Ok(())
    }

    /// Undo the most recent mutation; `Ok(false)` when there is nothing to undo
    pub fn undo_one(&mut self, doc: &mut MapDocument) -> Result<bool> {
        let Some(mut mutation) = self.undo.pop() else {
            return Ok(false);
        };
        mutation.revert(doc)?;
        doc.logger.categorized(
            VerbosityLevel::Normal,
            "history",
            &format!("Undo: {}", mutation.describe()),
        );
        self.redo.push(mutation);
        Ok(true)
    }

    /// Redo the most recently undone mutation; `Ok(false)` when there is none
    pub fn redo_one(&mut self, doc: &mut MapDocument) -> Result<bool> {
        let Some(mut mutation) = self.redo.pop() else {
            return Ok(false);
        };
        mutation.apply(doc)?;
        doc.logger.categorized(
            VerbosityLevel::Normal,
            "history",
            &format!("Redo: {}", mutation.describe()),
        );
        self.undo.push(mutation);
        Ok(true)
    }

    /// Undo up to `n` steps, most recent first; returns how many were undone
    ///
    /// Selecting the n-th row of the (most-recent-first) history list and
    /// calling this with `n` undoes that row last.
    pub fn undo_up_to(&mut self, doc: &mut MapDocument, n: usize) -> Result<usize> {
        let mut done = 0;
        while done < n && self.undo_one(doc)? {
            done += 1;
        }
        Ok(done)
    }

    /// Redo up to `n` steps; returns how many were redone
    pub fn redo_up_to(&mut self, doc: &mut MapDocument, n: usize) -> Result<usize> {
        let mut done = 0;
        while done < n && self.redo_one(doc)? {
            done += 1;
        }
        Ok(done)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// Undo stack labels, most recent first
    pub fn undo_history(&self) -> Vec<String> {
        self.undo.iter().rev().map(|m| m.describe()).collect()
    }

    /// Redo stack labels, next redo first
    pub fn redo_history(&self) -> Vec<String> {
        self.redo.iter().rev().map(|m| m.describe()).collect()
    }

    /// Forget all history (e.g. after loading a new document)
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("undo", &self.undo_history())
            .field("redo", &self.redo_history())
            .field("limit", &self.limit)
            .finish()
    }
}
