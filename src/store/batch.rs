//! Atomic write batches

use super::{DocPath, Document};

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite a document; with `merge`, fields not in `data` survive
    Set {
        path: DocPath,
        data: Document,
        merge: bool,
    },
    /// Remove a document (no-op when absent)
    Delete { path: DocPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Delete { path } => path,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteOp::Delete { .. })
    }
}

/// Ordered group of writes applied all-or-nothing by a [`super::DocumentStore`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the whole document
    pub fn set(&mut self, path: DocPath, data: Document) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            data,
            merge: false,
        });
        self
    }

    /// Upsert, keeping fields that `data` does not mention
    pub fn merge(&mut self, path: DocPath, data: Document) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            data,
            merge: true,
        });
        self
    }

    pub fn delete(&mut self, path: DocPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of delete operations
    pub fn delete_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_delete()).count()
    }
}
