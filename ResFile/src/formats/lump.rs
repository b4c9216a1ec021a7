//! Single loose file treated as a one-entry archive

use super::{ArchiveFormat, Catalog, ProbeContext};
use crate::entry::Entry;
use crate::error::Result;
use crate::names::FallbackCodepage;
use crate::utils::extract_base_name;

#[derive(Debug, Clone, Copy, Default)]
pub struct Lump;

impl ArchiveFormat for Lump {
    fn name(&self) -> &'static str {
        "lump"
    }

    fn is_container(&self) -> bool {
        false
    }

    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
        let base = extract_base_name(ctx.file_name, true);
        let name = ctx.name(base.as_bytes(), FallbackCodepage::Placeholder);
        Ok(Some(Catalog::new(vec![Entry::new(name, 0, ctx.stream_len)])))
    }
}
