//! # CRDT Mirror
//!
//! Replicates the block store into a Yjs document so remote peers can
//! converge on it. The document stays the source of truth for editing;
//! the mirror carries one yrs transaction per sync, so a committed
//! bracket reaches peers as a single update.

use crate::block::Block;
use crate::{Document, EditorError};
use yrs::updates::decoder::Decode;
use yrs::{Doc as YDoc, GetString, ReadTxn, Text, TextRef, Transact, Update};

pub struct CrdtMirror {
    doc: YDoc,
    text: TextRef,

    /// Document version last replicated
    synced_version: Option<u64>,
}

impl CrdtMirror {
    pub fn new() -> Self {
        let doc = YDoc::new();
        let text = doc.get_or_insert_text("blocks");
        Self {
            doc,
            text,
            synced_version: None,
        }
    }

    /// Replicate the document's current blocks as one edit
    pub fn sync(&mut self, document: &Document) -> Result<bool, EditorError> {
        if self.synced_version == Some(document.version) {
            return Ok(false);
        }

        let next = serde_json::to_string(&document.save())?;
        let current = self.contents();

        // Shrink the edit to the changed middle section
        let prefix = common_prefix(&current, &next);
        let suffix = common_suffix(&current[prefix..], &next[prefix..]);
        let removed = &current[prefix..current.len() - suffix];
        let inserted = &next[prefix..next.len() - suffix];

        {
            let mut txn = self.doc.transact_mut();
            if !removed.is_empty() {
                self.text.remove_range(&mut txn, prefix as u32, removed.len() as u32);
            }
            if !inserted.is_empty() {
                self.text.insert(&mut txn, prefix as u32, inserted);
            }
        }

        self.synced_version = Some(document.version);
        Ok(true)
    }

    pub fn contents(&self) -> String {
        let txn = self.doc.transact();
        self.text.get_string(&txn)
    }

    /// Blocks as currently replicated
    pub fn blocks(&self) -> Result<Vec<Block>, EditorError> {
        let contents = self.contents();
        if contents.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Encode the full mirror state
    pub fn encode_state(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&Default::default())
    }

    /// Apply an update from a peer
    pub fn apply_update(&mut self, update: &[u8]) -> Result<(), EditorError> {
        let update = Update::decode_v1(update).map_err(|e| EditorError::Crdt(e.to_string()))?;

        let mut txn = self.doc.transact_mut();
        txn.apply_update(update)
            .map_err(|e| EditorError::Crdt(e.to_string()))?;
        Ok(())
    }
}

impl Default for CrdtMirror {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte length of the shared prefix, on a char boundary
fn common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Byte length of the shared suffix, on a char boundary
fn common_suffix(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().rev().zip(b.chars().rev()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockId, Origin};

    fn document() -> Document {
        let mut doc = Document::new();
        doc.transact(Origin::Silent, |tx| {
            tx.insert_block(Block::paragraph(BlockId::new("a"), "Hello"), None)
        })
        .unwrap();
        doc
    }

    #[test]
    fn test_sync_replicates_blocks() {
        let doc = document();
        let mut mirror = CrdtMirror::new();

        assert!(mirror.sync(&doc).unwrap());
        assert!(!mirror.sync(&doc).unwrap());
        assert_eq!(mirror.blocks().unwrap(), doc.save());
    }

    #[test]
    fn test_update_reaches_peer() {
        let mut doc = document();
        let mut local = CrdtMirror::new();
        local.sync(&doc).unwrap();

        doc.transact(Origin::command("edit"), |tx| tx.set_text(&BlockId::new("a"), "Hello world"))
            .unwrap();
        local.sync(&doc).unwrap();

        let mut peer = CrdtMirror::new();
        peer.apply_update(&local.encode_state()).unwrap();
        assert_eq!(peer.blocks().unwrap()[0].text(), "Hello world");
    }

    #[test]
    fn test_common_affixes() {
        assert_eq!(common_prefix("abcd", "abxd"), 2);
        assert_eq!(common_suffix("abcd", "abxd"), 1);
        assert_eq!(common_prefix("ab", "abc"), 2);
    }
}
