//! Secondary copy of preferences in a remote database

use crate::model::FilterSet;

/// Best-effort mirror of preference writes.
///
/// Failures are logged by the caller and never reach the code that
/// performed the local write.
pub trait PreferenceMirror: Send + Sync {
    fn upsert_fields(&self, report_id: &str, table_name: Option<&str>, columns: &[String]) -> anyhow::Result<()>;

    fn upsert_filters(&self, report_id: &str, filters: Option<&FilterSet>) -> anyhow::Result<()>;

    fn remove(&self, report_id: &str) -> anyhow::Result<()>;

    /// Name used in log output
    fn mirror_name(&self) -> &str;
}
