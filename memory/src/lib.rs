// The sfmemo-memory crate keeps memo drafts on local disk as JSON files.
// It handles saving, reading, listing and recording the sync state of memos.
// It never talks to Salesforce; callers sequence it with the gateway.

pub mod errors;
mod memo;
mod store;

pub use errors::{MemoStoreError, MemoStoreResult};
pub use memo::{iso_timestamp, memo_file_name, MemoDocument, MemoMetadata, SyncStatus};
pub use store::{LoadedMemo, MemoReadOutcome, MemoStore};
